//! Error types for price_tracker

use thiserror::Error;

/// Failure to obtain the stock list from the pricing API
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Request(#[from] reqwest::Error),
    /// HTTP error status code
    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),
    /// Response body is not valid JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Response body is JSON but not shaped like a stock response
    #[error("Parse error: {0}")]
    UnexpectedShape(String),
}

impl FetchError {
    /// True for failures caused by a malformed response body rather than the transport
    pub fn is_parse_error(&self) -> bool {
        matches!(self, FetchError::Parse(_) | FetchError::UnexpectedShape(_))
    }
}

/// Failure to reconcile a single item. Never aborts the rest of a batch.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The raw record could not be turned into an item
    #[error("Invalid item record {sku}: {reason}")]
    InvalidItem { sku: String, reason: String },
    /// Database operation failed inside the item's transaction
    #[error("Error updating product {sku}: {source}")]
    Database {
        sku: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl UpdateError {
    /// Identifier of the item that failed
    pub fn sku(&self) -> &str {
        match self {
            UpdateError::InvalidItem { sku, .. } | UpdateError::Database { sku, .. } => sku,
        }
    }
}

/// Unified error type for price_tracker operations
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Failed to fetch stock data: {0}")]
    Fetch(#[from] FetchError),
    /// Database could not be opened at cycle start
    #[error("Database connection failed: {0}")]
    Connection(#[source] rusqlite::Error),
    /// Database operation failed outside of item reconciliation
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for price_tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
