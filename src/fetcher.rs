//! Pricing API client: fetches the current stock list

use crate::config::ApiConfig;
use crate::error::FetchError;
use serde_json::Value;
use std::time::Duration;

/// Fixed query parameters sent with every stock request
const STOCK_QUERY: [(&str, &str); 2] = [("lang_id", "0"), ("price_drop", "0")];

/// Fetches the raw stock list from the pricing API
pub struct Fetcher {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl Fetcher {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("price_tracker/1.0")
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self, FetchError> {
        Self::new(&api.url, &api.api_key, Duration::from_secs(api.timeout_secs))
    }

    /// Issue one request and return the entries under the `stock` key.
    ///
    /// A response without a `stock` key yields an empty list. Entries are
    /// returned unparsed so one malformed item cannot fail the whole fetch.
    pub async fn fetch(&self) -> Result<Vec<Value>, FetchError> {
        log::info!("Fetching stock data from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .query(&STOCK_QUERY)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_stock_response(&body)
    }
}

/// Extract the `stock` list from a response body
pub fn parse_stock_response(body: &str) -> Result<Vec<Value>, FetchError> {
    let value: Value = serde_json::from_str(body)?;

    let mut obj = match value {
        Value::Object(obj) => obj,
        other => {
            return Err(FetchError::UnexpectedShape(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            )))
        }
    };

    match obj.remove("stock") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(FetchError::UnexpectedShape(format!(
            "expected 'stock' to be a list, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
