//! Tests for item reconciliation

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{reconcile, reconcile_at, ReconcileOutcome};
use crate::database::{get_price_history, get_price_history_count, get_product, init_schema};
use crate::error::UpdateError;
use crate::item::ItemRecord;

/// Create an in-memory database for testing
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    init_schema(&conn).unwrap();
    conn
}

fn item(sku: &str, price: Decimal, in_stock: u32) -> ItemRecord {
    ItemRecord {
        sku: sku.to_string(),
        model: Some("Phone X".to_string()),
        color: Some("Black".to_string()),
        price,
        in_stock,
        ean: Some("4006381333931".to_string()),
        category: Some("Phones".to_string()),
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn history_count(conn: &Connection, sku: &str) -> usize {
    get_price_history(conn, sku, None, None).unwrap().len()
}

// ── first observation ────────────────────────────────────────────────

#[test]
fn new_item_inserts_product_and_history() {
    let mut conn = test_db();

    let outcome = reconcile_at(&mut conn, &item("SKU1", dec!(19.99), 5), t0()).unwrap();
    assert_eq!(outcome, ReconcileOutcome::Inserted);

    let product = get_product(&conn, "SKU1").unwrap().unwrap();
    assert_eq!(product.current_price, dec!(19.99));
    assert_eq!(product.stock_level, 5);
    assert_eq!(product.model.as_deref(), Some("Phone X"));
    assert_eq!(product.color.as_deref(), Some("Black"));
    assert_eq!(product.ean.as_deref(), Some("4006381333931"));
    assert_eq!(product.category.as_deref(), Some("Phones"));
    assert_eq!(product.last_updated, t0());

    let history = get_price_history(&conn, "SKU1", None, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, dec!(19.99));
    assert_eq!(history[0].stock_level, 5);
    assert_eq!(history[0].timestamp, t0());
}

#[test]
fn reconcile_uses_current_time() {
    let mut conn = test_db();
    let before = Utc::now();

    reconcile(&mut conn, &item("SKU1", dec!(1.00), 1)).unwrap();

    let product = get_product(&conn, "SKU1").unwrap().unwrap();
    assert!(product.last_updated >= before - Duration::seconds(1));
}

// ── repeated observation ─────────────────────────────────────────────

#[test]
fn unchanged_price_updates_stock_without_history() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(19.99), 5), t0()).unwrap();

    let later = t0() + Duration::hours(1);
    let outcome = reconcile_at(&mut conn, &item("SKU1", dec!(19.99), 3), later).unwrap();
    assert_eq!(outcome, ReconcileOutcome::UpdatedNoHistory);

    let product = get_product(&conn, "SKU1").unwrap().unwrap();
    assert_eq!(product.stock_level, 3);
    assert_eq!(product.last_updated, later);
    assert_eq!(history_count(&conn, "SKU1"), 1);
}

#[test]
fn changed_price_appends_history_and_keeps_prior_rows() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(19.99), 5), t0()).unwrap();
    reconcile_at(&mut conn, &item("SKU1", dec!(19.99), 3), t0() + Duration::hours(1)).unwrap();

    let later = t0() + Duration::hours(2);
    let outcome = reconcile_at(&mut conn, &item("SKU1", dec!(17.99), 3), later).unwrap();
    assert_eq!(outcome, ReconcileOutcome::UpdatedWithHistory);

    let product = get_product(&conn, "SKU1").unwrap().unwrap();
    assert_eq!(product.current_price, dec!(17.99));
    assert_eq!(product.stock_level, 3);

    let history = get_price_history(&conn, "SKU1", None, None).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!((history[0].price, history[0].stock_level), (dec!(19.99), 5));
    assert_eq!(history[0].timestamp, t0());
    assert_eq!((history[1].price, history[1].stock_level), (dec!(17.99), 3));
    assert_eq!(history[1].timestamp, later);
}

#[test]
fn smallest_price_change_is_recorded() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(10.00), 1), t0()).unwrap();

    let outcome = reconcile_at(&mut conn, &item("SKU1", dec!(10.01), 1), t0()).unwrap();
    assert_eq!(outcome, ReconcileOutcome::UpdatedWithHistory);
    assert_eq!(history_count(&conn, "SKU1"), 2);
}

#[test]
fn stock_only_change_is_not_recorded_in_history() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(5.00), 10), t0()).unwrap();
    reconcile_at(&mut conn, &item("SKU1", dec!(5.00), 0), t0()).unwrap();

    assert_eq!(get_product(&conn, "SKU1").unwrap().unwrap().stock_level, 0);
    assert_eq!(history_count(&conn, "SKU1"), 1);
}

#[test]
fn descriptive_fields_keep_first_observed_values() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(5.00), 1), t0()).unwrap();

    let mut renamed = item("SKU1", dec!(5.00), 1);
    renamed.model = Some("Phone Y".to_string());
    renamed.color = None;
    reconcile_at(&mut conn, &renamed, t0()).unwrap();

    let product = get_product(&conn, "SKU1").unwrap().unwrap();
    assert_eq!(product.model.as_deref(), Some("Phone X"));
    assert_eq!(product.color.as_deref(), Some("Black"));
}

#[test]
fn reconciling_same_item_twice_is_idempotent() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(19.99), 5), t0()).unwrap();
    reconcile_at(&mut conn, &item("SKU1", dec!(17.99), 4), t0()).unwrap();

    let observed = item("SKU1", dec!(17.99), 4);
    reconcile_at(&mut conn, &observed, t0()).unwrap();
    let first = get_product(&conn, "SKU1").unwrap();
    let history_before = get_price_history_count(&conn).unwrap();

    let outcome = reconcile_at(&mut conn, &observed, t0()).unwrap();
    assert_eq!(outcome, ReconcileOutcome::UpdatedNoHistory);
    assert_eq!(get_product(&conn, "SKU1").unwrap(), first);
    assert_eq!(get_price_history_count(&conn).unwrap(), history_before);
}

// ── decimal exactness ────────────────────────────────────────────────

#[test]
fn equal_decimals_with_different_scale_are_unchanged() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(10.50), 1), t0()).unwrap();

    let outcome = reconcile_at(&mut conn, &item("SKU1", dec!(10.5000), 1), t0()).unwrap();
    assert_eq!(outcome, ReconcileOutcome::UpdatedNoHistory);
}

#[test]
fn close_decimals_are_distinct() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(10.001), 1), t0()).unwrap();

    let outcome = reconcile_at(&mut conn, &item("SKU1", dec!(10.002), 1), t0()).unwrap();
    assert_eq!(outcome, ReconcileOutcome::UpdatedWithHistory);

    let product = get_product(&conn, "SKU1").unwrap().unwrap();
    assert_eq!(product.current_price, dec!(10.002));
}

// ── timestamps ───────────────────────────────────────────────────────

#[test]
fn timestamps_never_move_backwards_per_sku() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(2.00), 1), t0()).unwrap();

    let earlier = t0() - Duration::minutes(5);
    reconcile_at(&mut conn, &item("SKU1", dec!(3.00), 1), earlier).unwrap();

    let product = get_product(&conn, "SKU1").unwrap().unwrap();
    assert_eq!(product.last_updated, t0());

    let history = get_price_history(&conn, "SKU1", None, None).unwrap();
    assert!(history[1].timestamp >= history[0].timestamp);
}

// ── failure and rollback ─────────────────────────────────────────────

#[test]
fn failed_history_insert_rolls_back_product() {
    let mut conn = test_db();
    conn.execute_batch(
        "CREATE TRIGGER reject_history BEFORE INSERT ON price_history
         WHEN NEW.sku = 'BAD'
         BEGIN SELECT RAISE(ABORT, 'history rejected'); END;",
    )
    .unwrap();

    let err = reconcile_at(&mut conn, &item("BAD", dec!(1.00), 1), t0()).unwrap_err();
    assert_eq!(err.sku(), "BAD");
    assert!(matches!(err, UpdateError::Database { .. }));

    assert!(get_product(&conn, "BAD").unwrap().is_none());
    assert_eq!(get_price_history_count(&conn).unwrap(), 0);
}

#[test]
fn failed_price_change_leaves_previous_state() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("BAD", dec!(1.00), 1), t0()).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_history BEFORE INSERT ON price_history
         BEGIN SELECT RAISE(ABORT, 'history rejected'); END;",
    )
    .unwrap();

    let later = t0() + Duration::hours(1);
    assert!(reconcile_at(&mut conn, &item("BAD", dec!(2.00), 9), later).is_err());

    let product = get_product(&conn, "BAD").unwrap().unwrap();
    assert_eq!(product.current_price, dec!(1.00));
    assert_eq!(product.stock_level, 1);
    assert_eq!(product.last_updated, t0());
}

#[test]
fn missing_tables_is_update_error() {
    let mut conn = Connection::open_in_memory().unwrap();

    let err = reconcile_at(&mut conn, &item("SKU1", dec!(1.00), 1), t0()).unwrap_err();
    assert_eq!(err.sku(), "SKU1");
    assert!(err.to_string().contains("SKU1"));
}

#[test]
fn stored_price_text_preserves_scale() {
    let mut conn = test_db();
    reconcile_at(&mut conn, &item("SKU1", dec!(10.50), 1), t0()).unwrap();

    let text: String = conn
        .query_row(
            "SELECT current_price FROM products WHERE sku = ?1",
            params!["SKU1"],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(text, "10.50");
}
