//! Upsert-and-diff of observed items against the stored product state
//!
//! Each item is reconciled in its own transaction: a new sku inserts a
//! product and its first history entry; a known sku always updates price,
//! stock and timestamp, and appends history only when the price changed.
//! Stock-only changes are not recorded in history.

use crate::database::{decimal_column, format_timestamp, timestamp_column, DbResult};
use crate::error::UpdateError;
use crate::item::ItemRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use rust_decimal::Decimal;

/// What reconciling one item did to the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// First observation: product and initial history entry created
    Inserted,
    /// Known product whose price changed: updated and history appended
    UpdatedWithHistory,
    /// Known product with unchanged price: updated, no history
    UpdatedNoHistory,
}

/// Reconcile one item, observed now
pub fn reconcile(conn: &mut Connection, item: &ItemRecord) -> Result<ReconcileOutcome, UpdateError> {
    reconcile_at(conn, item, Utc::now())
}

/// Reconcile one item observed at `observed_at`.
///
/// On any failure the transaction is rolled back and nothing about this
/// item changes.
pub fn reconcile_at(
    conn: &mut Connection,
    item: &ItemRecord,
    observed_at: DateTime<Utc>,
) -> Result<ReconcileOutcome, UpdateError> {
    let db_err = |source| UpdateError::Database {
        sku: item.sku.clone(),
        source,
    };

    // Dropping an uncommitted transaction rolls it back
    let tx = conn.transaction().map_err(db_err)?;
    let (outcome, previous_price) = reconcile_tx(&tx, item, observed_at).map_err(db_err)?;
    tx.commit().map_err(db_err)?;

    match (outcome, previous_price) {
        (ReconcileOutcome::Inserted, _) => log::info!("Added new product: {}", item.sku),
        (ReconcileOutcome::UpdatedWithHistory, Some(previous)) => log::info!(
            "Price change for {}: {} -> {}",
            item.sku,
            previous,
            item.price
        ),
        _ => log::debug!("Updated product {} (price unchanged)", item.sku),
    }

    Ok(outcome)
}

fn reconcile_tx(
    tx: &Transaction<'_>,
    item: &ItemRecord,
    observed_at: DateTime<Utc>,
) -> DbResult<(ReconcileOutcome, Option<Decimal>)> {
    let stored = tx
        .query_row(
            "SELECT current_price, last_updated FROM products WHERE sku = ?1",
            params![&item.sku],
            |row| Ok((decimal_column(row, 0)?, timestamp_column(row, 1)?)),
        )
        .optional()?;

    let (stored_price, last_updated) = match stored {
        None => {
            let at = format_timestamp(&observed_at);
            tx.execute(
                "INSERT INTO products
                 (sku, model, color, current_price, stock_level, ean, category, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &item.sku,
                    &item.model,
                    &item.color,
                    item.price.to_string(),
                    item.in_stock,
                    &item.ean,
                    &item.category,
                    &at,
                ],
            )?;
            insert_history(tx, item, &at)?;
            return Ok((ReconcileOutcome::Inserted, None));
        }
        Some(stored) => stored,
    };

    // Keep timestamps non-decreasing per sku even if the clock steps back
    let at = format_timestamp(&observed_at.max(last_updated));

    tx.execute(
        "UPDATE products
         SET current_price = ?1,
             stock_level = ?2,
             last_updated = ?3
         WHERE sku = ?4",
        params![item.price.to_string(), item.in_stock, &at, &item.sku],
    )?;

    // Decimal equality ignores scale: 10.50 == 10.5000
    if stored_price != item.price {
        insert_history(tx, item, &at)?;
        Ok((ReconcileOutcome::UpdatedWithHistory, Some(stored_price)))
    } else {
        Ok((ReconcileOutcome::UpdatedNoHistory, None))
    }
}

fn insert_history(tx: &Transaction<'_>, item: &ItemRecord, at: &str) -> DbResult<()> {
    tx.execute(
        "INSERT INTO price_history (sku, price, stock_level, timestamp)
         VALUES (?1, ?2, ?3, ?4)",
        params![&item.sku, item.price.to_string(), item.in_stock, at],
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
