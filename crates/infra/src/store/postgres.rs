//! Postgres-backed stores.
//!
//! Entries live in `stock_history_stockhistoryentry`, next to the host's own
//! tables, so `part_id` is a real foreign key into `part_part` and deleting a
//! part cascades at the database level.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (foreign key violation) | `23503` | `Constraint` |
//! | Database (check constraint violation) | `23514` | `Constraint` |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed / PoolTimedOut | N/A | `Unavailable` |
//! | Other | N/A | `Database` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use stockhistory_core::{Currency, EntryId, Money, PartId};
use stockhistory_history::{
    HistoryFilter, HistoryQuery, HistorySettings, NewStockHistoryEntry, Page, StockHistoryEntry,
};

use super::{HistoryStore, SettingsStore, StoreError};

const ENTRY_COLUMNS: &str = "id, part_id::BIGINT AS part_id, item_count::BIGINT AS item_count, \
     quantity, date, cost_min, cost_min_currency, cost_max, cost_max_currency";

/// Postgres-backed history store.
#[derive(Debug, Clone)]
pub struct PostgresHistoryStore {
    pool: Arc<PgPool>,
}

impl PostgresHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

/// Rows per INSERT statement. Eight binds per row keeps a batch well under
/// the 65535 bind parameters Postgres accepts.
const INSERT_BATCH: usize = 1_000;

fn insert_entries_query(entries: &[NewStockHistoryEntry]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "INSERT INTO stock_history_stockhistoryentry \
         (part_id, item_count, quantity, date, cost_min, cost_min_currency, cost_max, cost_max_currency) ",
    );
    qb.push_values(entries, |mut row, entry| {
        row.push_bind(entry.part().get())
            .push_unseparated("::INTEGER")
            .push_bind(entry.item_count())
            .push_unseparated("::INTEGER")
            .push_bind(entry.quantity())
            .push("COALESCE(")
            .push_bind_unseparated(entry.date())
            .push_unseparated("::DATE, CURRENT_DATE)")
            .push_bind(entry.cost_min().map(|m| m.amount))
            .push_bind(entry.cost_min().map(|m| m.currency.to_string()))
            .push_bind(entry.cost_max().map(|m| m.amount))
            .push_bind(entry.cost_max().map(|m| m.currency.to_string()));
    });
    qb.push(" RETURNING id, date");
    qb
}

/// Insert `entries` on an open connection, usually a transaction owned by the caller.
///
/// Postgres returns the rows of a multi-row `VALUES` insert in input order.
pub(crate) async fn insert_entries(
    conn: &mut PgConnection,
    entries: Vec<NewStockHistoryEntry>,
) -> Result<Vec<StockHistoryEntry>, StoreError> {
    let mut stored = Vec::with_capacity(entries.len());
    for batch in entries.chunks(INSERT_BATCH) {
        let rows = insert_entries_query(batch)
            .build()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("insert_entries", e))?;
        if rows.len() != batch.len() {
            return Err(StoreError::Corrupt(format!(
                "inserted {} entries but got {} rows back",
                batch.len(),
                rows.len()
            )));
        }

        for (entry, row) in batch.iter().zip(rows) {
            let pk: i64 = row.try_get("id").map_err(|e| map_sqlx_error("insert_entries", e))?;
            let date: NaiveDate = row.try_get("date").map_err(|e| map_sqlx_error("insert_entries", e))?;
            stored.push(entry.clone().into_entry(EntryId::new(pk), date));
        }
    }
    Ok(stored)
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &HistoryFilter) {
    qb.push(" WHERE TRUE");
    if let Some(part) = filter.part {
        qb.push(" AND part_id = ").push_bind(part.get());
    }
    if let Some(before) = filter.date_before {
        qb.push(" AND date < ").push_bind(before);
    }
    if let Some(after) = filter.date_after {
        qb.push(" AND date > ").push_bind(after);
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    #[instrument(skip(self, entries), fields(entry_count = entries.len()), err)]
    async fn insert_many(
        &self,
        entries: Vec<NewStockHistoryEntry>,
    ) -> Result<Vec<StockHistoryEntry>, StoreError> {
        if entries.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let stored = insert_entries(&mut *tx, entries).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(stored)
    }

    #[instrument(skip(self), err)]
    async fn list(&self, query: &HistoryQuery) -> Result<Page<StockHistoryEntry>, StoreError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM stock_history_stockhistoryentry");
        push_filter(&mut count_qb, &query.filter);
        let count: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_entries", e))?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ENTRY_COLUMNS} FROM stock_history_stockhistoryentry"
        ));
        push_filter(&mut qb, &query.filter);
        qb.push(" ORDER BY ").push(query.ordering.sql());
        if let Some(page) = query.page {
            qb.push(" LIMIT ").push_bind(i64::from(page.limit));
            qb.push(" OFFSET ").push_bind(i64::from(page.offset));
        }

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_entries", e))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let row = EntryRow::from_row(&row)
                .map_err(|e| StoreError::Corrupt(format!("failed to read entry row: {e}")))?;
            results.push(StockHistoryEntry::try_from(row)?);
        }

        Ok(Page {
            count: count.max(0) as u64,
            results,
        })
    }

    async fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        sqlx::query_scalar("SELECT MAX(date) FROM stock_history_stockhistoryentry")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("latest_date", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM stock_history_stockhistoryentry WHERE date < $1")
            .bind(cutoff)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_before", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(part = %part), err)]
    async fn delete_for_part(&self, part: PartId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM stock_history_stockhistoryentry WHERE part_id = $1")
            .bind(part.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_for_part", e))?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_history_stockhistoryentry")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;
        Ok(n.max(0) as u64)
    }
}

/// Postgres-backed settings store (`stock_history_settings`, one row per key).
#[derive(Debug, Clone)]
pub struct PostgresSettingsStore {
    pool: Arc<PgPool>,
}

impl PostgresSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl SettingsStore for PostgresSettingsStore {
    async fn load(&self) -> Result<HistorySettings, StoreError> {
        let rows = sqlx::query("SELECT key, value FROM stock_history_settings")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_settings", e))?;

        let mut pairs = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key").map_err(|e| map_sqlx_error("load_settings", e))?;
            let value: String = row.try_get("value").map_err(|e| map_sqlx_error("load_settings", e))?;
            pairs.push((key, value));
        }

        HistorySettings::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .map_err(|e| StoreError::Corrupt(format!("stored settings: {e}")))
    }

    #[instrument(skip(self, settings), err)]
    async fn save(&self, settings: &HistorySettings) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for (key, value) in settings.to_pairs() {
            sqlx::query(
                r#"
                INSERT INTO stock_history_settings (key, value, updated_at)
                VALUES ($1, $2, now())
                ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("save_setting", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

/// Money column pair (`amount`, `currency`) back into a domain value.
///
/// A null amount means "no value". An amount with a blank currency is corrupt.
pub(crate) fn money_from_columns(
    amount: Option<Decimal>,
    currency: Option<String>,
) -> Result<Option<Money>, StoreError> {
    let Some(amount) = amount else {
        return Ok(None);
    };
    let code = currency.unwrap_or_default();
    let currency = Currency::new(&code)
        .map_err(|e| StoreError::Corrupt(format!("currency '{code}' for amount {amount}: {e}")))?;
    Ok(Some(Money::new(amount, currency)))
}

pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                // Foreign key violation: the part does not exist (or was just deleted).
                Some("23503") => StoreError::Constraint { operation, message },
                // Check constraint violation (negative quantity).
                Some("23514") => StoreError::Constraint { operation, message },
                _ => StoreError::Database { operation, message },
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        other => StoreError::Database {
            operation,
            message: other.to_string(),
        },
    }
}

// SQLx row types

#[derive(Debug)]
struct EntryRow {
    id: i64,
    part_id: i64,
    item_count: i64,
    quantity: Decimal,
    date: NaiveDate,
    cost_min: Option<Decimal>,
    cost_min_currency: Option<String>,
    cost_max: Option<Decimal>,
    cost_max_currency: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for EntryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(EntryRow {
            id: row.try_get("id")?,
            part_id: row.try_get("part_id")?,
            item_count: row.try_get("item_count")?,
            quantity: row.try_get("quantity")?,
            date: row.try_get("date")?,
            cost_min: row.try_get("cost_min")?,
            cost_min_currency: row.try_get("cost_min_currency")?,
            cost_max: row.try_get("cost_max")?,
            cost_max_currency: row.try_get("cost_max_currency")?,
        })
    }
}

impl TryFrom<EntryRow> for StockHistoryEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(StockHistoryEntry {
            pk: EntryId::new(row.id),
            part: PartId::new(row.part_id),
            item_count: row.item_count,
            quantity: row.quantity,
            date: row.date,
            cost_min: money_from_columns(row.cost_min, row.cost_min_currency)?,
            cost_max: money_from_columns(row.cost_max, row.cost_max_currency)?,
        })
    }
}
