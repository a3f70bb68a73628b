//! Price Tracker - stock & price history database
//!
//! Polls a pricing API on a fixed interval, keeps the latest state of every
//! product in SQLite and appends to a price history log whenever a price changes.

pub mod batch;
pub mod config;
pub mod database;
pub mod error;
pub mod fetcher;
pub mod item;
pub mod logging;
pub mod reconciler;
pub mod scheduler;

pub use batch::{process_batch, run_cycle, BatchReport};
pub use config::Config;
pub use database::{Database, HistoryEntry, Product};
pub use error::{FetchError, Result, TrackerError, UpdateError};
pub use fetcher::Fetcher;
pub use item::ItemRecord;
pub use reconciler::{reconcile, ReconcileOutcome};
pub use scheduler::{Scheduler, Sleeper, TokioSleeper};
