//! Batch driver: one fetch-then-reconcile-all pass
//!
//! Item failures are collected into the report and never abort the batch.
//! Fetch and connection failures abort the whole cycle.

use crate::database::Database;
use crate::error::{Result, UpdateError};
use crate::fetcher::Fetcher;
use crate::item::ItemRecord;
use crate::reconciler::{reconcile, ReconcileOutcome};
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;

/// Outcome of reconciling one batch of items
#[derive(Debug, Default)]
pub struct BatchReport {
    pub inserted: usize,
    pub updated_with_history: usize,
    pub updated_no_history: usize,
    pub failures: Vec<UpdateError>,
}

impl BatchReport {
    /// Fold per-item results into counts and failures
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<ReconcileOutcome, UpdateError>>,
    {
        results
            .into_iter()
            .fold(Self::default(), |mut report, result| {
                match result {
                    Ok(ReconcileOutcome::Inserted) => report.inserted += 1,
                    Ok(ReconcileOutcome::UpdatedWithHistory) => report.updated_with_history += 1,
                    Ok(ReconcileOutcome::UpdatedNoHistory) => report.updated_no_history += 1,
                    Err(e) => report.failures.push(e),
                }
                report
            })
    }

    /// Number of items reconciled and committed
    pub fn succeeded(&self) -> usize {
        self.inserted + self.updated_with_history + self.updated_no_history
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failures.len()
    }
}

/// Convert and reconcile one raw record, each under its own transaction
fn reconcile_raw(
    conn: &mut Connection,
    raw: &Value,
) -> std::result::Result<ReconcileOutcome, UpdateError> {
    let item = ItemRecord::from_json(raw)?;
    reconcile(conn, &item)
}

/// Reconcile every raw record in order, logging each failure
pub fn process_batch(conn: &mut Connection, items: &[Value]) -> BatchReport {
    let results = items.iter().map(|raw| {
        let result = reconcile_raw(conn, raw);
        if let Err(e) = &result {
            log::error!("Failed to update product {}: {}", e.sku(), e);
        }
        result
    });

    let report = BatchReport::from_results(results);

    log::info!(
        "Processed {} products: {} new, {} price changes, {} unchanged, {} failed",
        report.total(),
        report.inserted,
        report.updated_with_history,
        report.updated_no_history,
        report.failures.len()
    );
    report
}

/// Run one tracking cycle.
///
/// Opens the database, fetches the stock list and reconciles every item.
/// The connection is released when this returns, on success or failure.
pub async fn run_cycle(db_path: &Path, fetcher: &Fetcher) -> Result<BatchReport> {
    let mut db = Database::open(db_path)?;

    let items = fetcher.fetch().await?;
    log::info!("Fetched {} products", items.len());

    let report = process_batch(db.conn_mut(), &items);
    log::info!("Price tracking completed successfully");
    Ok(report)
}
