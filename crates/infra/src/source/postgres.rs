//! Stock source over the host's tables.
//!
//! Reads `part_part`, `part_partpricing`, `stock_stockitem`,
//! `stock_stocklocation` and the exchange rate tables. Nothing here writes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument, warn};

use stockhistory_core::{Currency, ExchangeRates, Money, PartId};
use stockhistory_history::{PartPricing, PartRecord, StockItemRecord, StockSnapshot};

use super::{SourceError, StockSource};

/// Status codes the host treats as available stock (OK, attention, damaged).
const AVAILABLE_STATUS_CODES: [i32; 3] = [10, 50, 55];

#[derive(Debug, Clone)]
pub struct PostgresStockSource {
    pool: Arc<PgPool>,
}

impl PostgresStockSource {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn read_parts(&self) -> Result<Vec<PartRecord>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT
                p.id::BIGINT AS id,
                p.active,
                p."virtual" AS is_virtual,
                pr.overall_min,
                pr.overall_min_currency,
                pr.overall_max,
                pr.overall_max_currency
            FROM part_part p
            LEFT JOIN part_partpricing pr ON pr.part_id = p.id
            ORDER BY p.id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("read_parts", e))?;

        let mut parts = Vec::with_capacity(rows.len());
        for row in rows {
            let get_err = |e| map_sqlx_error("read_parts", e);
            let id: i64 = row.try_get("id").map_err(get_err)?;
            let pricing = PartPricing {
                min: money(
                    row.try_get("overall_min").map_err(get_err)?,
                    row.try_get("overall_min_currency").map_err(get_err)?,
                )?,
                max: money(
                    row.try_get("overall_max").map_err(get_err)?,
                    row.try_get("overall_max_currency").map_err(get_err)?,
                )?,
            };
            parts.push(PartRecord {
                id: PartId::new(id),
                active: row.try_get("active").map_err(get_err)?,
                is_virtual: row.try_get("is_virtual").map_err(get_err)?,
                pricing,
            });
        }
        Ok(parts)
    }

    async fn read_items(&self) -> Result<Vec<StockItemRecord>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT
                si.part_id::BIGINT AS part_id,
                si.quantity,
                (si.belongs_to_id IS NULL
                    AND si.customer_id IS NULL
                    AND si.sales_order_id IS NULL
                    AND si.consumed_by_id IS NULL
                    AND si.is_building = FALSE
                    AND si.status = ANY($1)) AS in_stock,
                COALESCE(loc.external, FALSE) AS external_location,
                si.purchase_price,
                si.purchase_price_currency
            FROM stock_stockitem si
            LEFT JOIN stock_stocklocation loc ON loc.id = si.location_id
            "#,
        )
        .bind(&AVAILABLE_STATUS_CODES[..])
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("read_items", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let get_err = |e| map_sqlx_error("read_items", e);
            let part: i64 = row.try_get("part_id").map_err(get_err)?;
            items.push(StockItemRecord {
                part: PartId::new(part),
                quantity: row.try_get("quantity").map_err(get_err)?,
                in_stock: row.try_get("in_stock").map_err(get_err)?,
                external_location: row.try_get("external_location").map_err(get_err)?,
                purchase_price: money(
                    row.try_get("purchase_price").map_err(get_err)?,
                    row.try_get("purchase_price_currency").map_err(get_err)?,
                )?,
            });
        }
        Ok(items)
    }

    /// Exchange rates from the host's currency backend.
    ///
    /// A host without rate tables yields an empty rate set, which still
    /// converts prices already in the base currency.
    async fn read_rates(&self) -> Result<ExchangeRates, SourceError> {
        let result = sqlx::query(
            r#"
            SELECT b.base_currency, r.currency, r.value
            FROM exchange_rate r
            JOIN exchange_exchangebackend b ON b.name = r.backend_id
            ORDER BY b.name
            "#,
        )
        .fetch_all(&*self.pool)
        .await;

        let rows = match result {
            Ok(rows) => rows,
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("42P01") => {
                warn!("exchange rate tables not found; converting base currency only");
                return Ok(ExchangeRates::default());
            }
            Err(e) => return Err(map_sqlx_error("read_rates", e)),
        };

        let mut base: Option<Currency> = None;
        let mut rates = HashMap::new();
        for row in rows {
            let get_err = |e| map_sqlx_error("read_rates", e);
            let base_code: String = row.try_get("base_currency").map_err(get_err)?;
            let code: String = row.try_get("currency").map_err(get_err)?;
            let value: Decimal = row.try_get("value").map_err(get_err)?;

            if base.is_none() {
                base = Some(currency(&base_code)?);
            }
            rates.insert(currency(&code)?, value);
        }

        let mut out = match base {
            Some(base) => ExchangeRates::new(base),
            None => ExchangeRates::default(),
        };
        for (code, value) in rates {
            out.insert(code, value);
        }
        Ok(out)
    }
}

#[async_trait]
impl StockSource for PostgresStockSource {
    #[instrument(skip(self), err)]
    async fn read_snapshot(&self) -> Result<StockSnapshot, SourceError> {
        let parts = self.read_parts().await?;
        let items = self.read_items().await?;
        let rates = self.read_rates().await?;
        debug!(parts = parts.len(), items = items.len(), "read host stock");
        Ok(StockSnapshot { parts, items, rates })
    }
}

fn currency(code: &str) -> Result<Currency, SourceError> {
    Currency::new(code).map_err(|e| SourceError::Invalid(format!("currency '{code}': {e}")))
}

fn money(amount: Option<Decimal>, code: Option<String>) -> Result<Option<Money>, SourceError> {
    match amount {
        None => Ok(None),
        Some(amount) => {
            let code = code.unwrap_or_default();
            Ok(Some(Money::new(amount, currency(&code)?)))
        }
    }
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> SourceError {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            SourceError::Unavailable(format!("{err} in {operation}"))
        }
        sqlx::Error::Database(db_err) => SourceError::Database {
            operation,
            message: db_err.message().to_string(),
        },
        other => SourceError::Database {
            operation,
            message: other.to_string(),
        },
    }
}
