//! `0002_extract_existing_records`: copy stocktake rows the host kept before
//! stock history moved into its own table.
//!
//! Not idempotent: the entry table has no uniqueness on `(part, date)`, so
//! running the copy twice duplicates every row. The migrator commits the copy
//! and its ledger row in one transaction, which keeps it to a single run.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, Row};
use tracing::{info, warn};

use stockhistory_core::{DomainResult, Money, PartId};
use stockhistory_history::NewStockHistoryEntry;

use super::MigrationError;
use crate::store::postgres::{insert_entries, map_sqlx_error, money_from_columns};

pub const LEGACY_TABLE: &str = "part_partstocktake";

/// One row of the legacy stocktake table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyStocktake {
    pub part: PartId,
    pub item_count: i64,
    pub quantity: Decimal,
    pub date: NaiveDate,
    pub cost_min: Option<Money>,
    pub cost_max: Option<Money>,
}

impl LegacyStocktake {
    /// Rows with no items or no quantity carry no history worth keeping.
    pub fn is_eligible(&self) -> bool {
        self.item_count > 0 && self.quantity > Decimal::ZERO
    }

    pub fn into_entry(self) -> DomainResult<NewStockHistoryEntry> {
        Ok(NewStockHistoryEntry::new(self.part, self.item_count, self.quantity)?
            .with_date(self.date)
            .with_costs(self.cost_min, self.cost_max))
    }
}

/// Read eligible legacy rows. `Ok(None)` when the host never had the table.
///
/// Checks for the table up front: a failed `SELECT` would abort the caller's
/// transaction.
pub async fn read_legacy_records(conn: &mut PgConnection) -> Result<Option<Vec<LegacyStocktake>>, MigrationError> {
    let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
        .bind(LEGACY_TABLE)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("find_legacy_table", e))?;
    if !exists {
        info!(table = LEGACY_TABLE, "legacy table not found; nothing to extract");
        return Ok(None);
    }

    let rows = sqlx::query(
        r#"
        SELECT
            part_id::BIGINT AS part_id,
            item_count::BIGINT AS item_count,
            quantity,
            date,
            cost_min,
            cost_min_currency,
            cost_max,
            cost_max_currency
        FROM part_partstocktake
        WHERE item_count > 0 AND quantity > 0
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("read_legacy_records", e))?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let get_err = |e| MigrationError::from(map_sqlx_error("read_legacy_records", e));
        let part: i64 = row.try_get("part_id").map_err(get_err)?;
        records.push(LegacyStocktake {
            part: PartId::new(part),
            item_count: row.try_get("item_count").map_err(get_err)?,
            quantity: row.try_get("quantity").map_err(get_err)?,
            date: row.try_get("date").map_err(get_err)?,
            cost_min: money_from_columns(
                row.try_get("cost_min").map_err(get_err)?,
                row.try_get("cost_min_currency").map_err(get_err)?,
            )?,
            cost_max: money_from_columns(
                row.try_get("cost_max").map_err(get_err)?,
                row.try_get("cost_max_currency").map_err(get_err)?,
            )?,
        });
    }
    Ok(Some(records))
}

/// Entries to create for `records`, keeping their original dates.
pub fn legacy_entries(records: Vec<LegacyStocktake>) -> Vec<NewStockHistoryEntry> {
    let mut entries = Vec::with_capacity(records.len());
    for record in records.into_iter().filter(LegacyStocktake::is_eligible) {
        let part = record.part;
        match record.into_entry() {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(part = %part, error = %e, "skipping legacy stocktake row"),
        }
    }
    entries
}

/// Copy eligible legacy rows on `conn`. Returns the number of entries created.
pub async fn copy_legacy_records(
    conn: &mut PgConnection,
    records: Vec<LegacyStocktake>,
) -> Result<usize, MigrationError> {
    let entries = legacy_entries(records);
    if entries.is_empty() {
        return Ok(0);
    }

    info!(count = entries.len(), "creating stock history entries from legacy stocktake data");
    let created = insert_entries(conn, entries).await?.len();
    info!(count = created, "legacy stocktake data extracted");
    Ok(created)
}

/// Reverse of the back-fill: remove every entry.
pub async fn delete_all_entries(conn: &mut PgConnection) -> Result<u64, MigrationError> {
    let deleted = sqlx::query("DELETE FROM stock_history_stockhistoryentry")
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_all_entries", e))?
        .rows_affected();
    if deleted > 0 {
        info!(count = deleted, "deleted stock history entries");
    }
    Ok(deleted)
}
