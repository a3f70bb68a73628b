//! Database operations for the price tracker
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Prices are stored as exact decimal text and timestamps as UTC RFC 3339
//! strings, which sort chronologically.

use crate::error::{Result, TrackerError};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `products`: latest known state per sku
/// - `price_history`: append-only log of observed price changes
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            sku TEXT PRIMARY KEY NOT NULL,
            model TEXT,
            color TEXT,
            current_price TEXT NOT NULL,
            stock_level INTEGER NOT NULL CHECK (stock_level >= 0),
            ean TEXT,
            category TEXT,
            last_updated TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS price_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sku TEXT NOT NULL REFERENCES products(sku),
            price TEXT NOT NULL,
            stock_level INTEGER NOT NULL,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_price_history_sku ON price_history(sku);
        CREATE INDEX IF NOT EXISTS idx_price_history_timestamp ON price_history(timestamp);
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Connection handle scoped to one tracking cycle.
///
/// The underlying connection is closed when the handle is dropped.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open an existing database for reading and writing.
    ///
    /// Never creates the file: a missing database is a connection failure,
    /// the schema is created by `setup`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .and_then(|conn| {
            enable_foreign_keys(&conn)?;
            Ok(conn)
        })
        .map_err(TrackerError::Connection)?;

        log::info!("Database connection established: {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Create the database file (and parent directory) if needed, then the schema
    pub fn setup(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                log::info!("Created directory: {}", parent.display());
            }
        }

        if path.exists() {
            log::info!("Database {} already exists", path.display());
        } else {
            log::info!("Creating database {}", path.display());
        }

        let conn = Connection::open(path).map_err(TrackerError::Connection)?;
        enable_foreign_keys(&conn)?;
        init_schema(&conn)?;
        log::info!("Tables created successfully");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn product(&self, sku: &str) -> DbResult<Option<Product>> {
        get_product(&self.conn, sku)
    }

    pub fn price_history(
        &self,
        sku: &str,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<HistoryEntry>> {
        get_price_history(&self.conn, sku, since, until)
    }

    pub fn product_count(&self) -> DbResult<i64> {
        get_product_count(&self.conn)
    }

    pub fn history_count(&self) -> DbResult<i64> {
        get_price_history_count(&self.conn)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        log::debug!("Database connection closed: {}", self.path.display());
    }
}

fn enable_foreign_keys(conn: &Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

/// Current state of a tracked product
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub sku: String,
    pub model: Option<String>,
    pub color: Option<String>,
    pub current_price: Decimal,
    pub stock_level: u32,
    pub ean: Option<String>,
    pub category: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// One row of the price history log
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub sku: String,
    pub price: Decimal,
    pub stock_level: u32,
    pub timestamp: DateTime<Utc>,
}

/// Format a timestamp the way it is stored
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Read a decimal stored as text
pub(crate) fn decimal_column(row: &Row<'_>, idx: usize) -> DbResult<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a timestamp stored as RFC 3339 text
pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> DbResult<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn product_from_row(row: &Row<'_>) -> DbResult<Product> {
    Ok(Product {
        sku: row.get(0)?,
        model: row.get(1)?,
        color: row.get(2)?,
        current_price: decimal_column(row, 3)?,
        stock_level: row.get(4)?,
        ean: row.get(5)?,
        category: row.get(6)?,
        last_updated: timestamp_column(row, 7)?,
    })
}

/// Get product details by sku
pub fn get_product(conn: &Connection, sku: &str) -> DbResult<Option<Product>> {
    conn.query_row(
        "SELECT sku, model, color, current_price, stock_level, ean, category, last_updated
         FROM products
         WHERE sku = ?1",
        params![sku],
        product_from_row,
    )
    .optional()
}

/// Get price history for a product, ordered chronologically
///
/// `since` and `until` are inclusive bounds; `None` leaves that side open.
pub fn get_price_history(
    conn: &Connection,
    sku: &str,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> DbResult<Vec<HistoryEntry>> {
    let since = since.map(|ts| format_timestamp(&ts));
    let until = until.map(|ts| format_timestamp(&ts));

    let mut stmt = conn.prepare(
        "SELECT id, sku, price, stock_level, timestamp
         FROM price_history
         WHERE sku = ?1
           AND (?2 IS NULL OR timestamp >= ?2)
           AND (?3 IS NULL OR timestamp <= ?3)
         ORDER BY timestamp ASC, id ASC",
    )?;

    let results: DbResult<Vec<HistoryEntry>> = stmt
        .query_map(params![sku, since, until], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                sku: row.get(1)?,
                price: decimal_column(row, 2)?,
                stock_level: row.get(3)?,
                timestamp: timestamp_column(row, 4)?,
            })
        })?
        .collect();
    results
}

/// Get total count of products in database
pub fn get_product_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
}

/// Get total count of price history entries
pub fn get_price_history_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM price_history", [], |row| row.get(0))
}
