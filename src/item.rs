//! Stock item records as returned by the pricing API

use crate::error::UpdateError;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Placeholder identifier for records that carry no usable sku
pub const UNKNOWN_SKU: &str = "unknown";

/// One observed stock item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub sku: String,
    pub model: Option<String>,
    pub color: Option<String>,
    pub price: Decimal,
    pub in_stock: u32,
    /// Alternate product code
    pub ean: Option<String>,
    pub category: Option<String>,
}

impl ItemRecord {
    /// Build an item from one raw entry of the API's `stock` list.
    ///
    /// Prices are parsed from their textual form, so `19.99` stays exactly
    /// `19.99` and never passes through `f64`.
    pub fn from_json(value: &Value) -> Result<Self, UpdateError> {
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => return Err(invalid(UNKNOWN_SKU, "record is not an object")),
        };

        let sku = match text_field(obj, "sku") {
            Ok(Some(sku)) if !sku.trim().is_empty() => sku,
            Ok(_) => return Err(invalid(UNKNOWN_SKU, "missing sku")),
            Err(reason) => return Err(invalid(UNKNOWN_SKU, &reason)),
        };

        let price = parse_price(obj.get("price")).map_err(|reason| invalid(&sku, &reason))?;
        let in_stock = parse_stock(obj.get("in_stock")).map_err(|reason| invalid(&sku, &reason))?;

        let optional = |key: &str| text_field(obj, key).map_err(|reason| invalid(&sku, &reason));

        Ok(Self {
            model: optional("model")?,
            color: optional("color")?,
            ean: optional("ean")?,
            category: optional("cat_name")?,
            price,
            in_stock,
            sku,
        })
    }
}

fn invalid(sku: &str, reason: &str) -> UpdateError {
    UpdateError::InvalidItem {
        sku: sku.to_string(),
        reason: reason.to_string(),
    }
}

/// Strings are taken as-is, numbers rendered as text, null/absent is None
fn text_field(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(format!("field '{}' has unexpected type: {}", key, other)),
    }
}

fn parse_price(value: Option<&Value>) -> Result<Decimal, String> {
    let text = match value {
        None | Some(Value::Null) => return Err("missing price".to_string()),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => return Err(format!("price has unexpected type: {}", other)),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| format!("invalid price '{}': {}", text, e))
}

fn parse_stock(value: Option<&Value>) -> Result<u32, String> {
    let parsed = match value {
        None | Some(Value::Null) => return Err("missing in_stock".to_string()),
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        Some(_) => None,
    };

    parsed.ok_or_else(|| {
        format!(
            "in_stock must be a non-negative integer, got {}",
            value.map(Value::to_string).unwrap_or_default()
        )
    })
}
