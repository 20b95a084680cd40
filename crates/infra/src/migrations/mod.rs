//! Schema migrations for the plugin's own tables.
//!
//! Applied migrations are recorded in `stock_history_migrations`; the runner
//! applies pending ones in order and can revert the most recent one. Each
//! migration and its ledger row commit in the same transaction.

pub mod backfill;
mod schema;

use std::sync::Arc;

use sqlx::{PgConnection, PgPool, Row};
use thiserror::Error;
use tracing::info;

use crate::store::StoreError;

pub use backfill::{LegacyStocktake, copy_legacy_records, delete_all_entries, read_legacy_records};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration {name} failed: {message}")]
    Failed { name: &'static str, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    Initial,
    ExtractExistingRecords,
}

impl Migration {
    /// Every migration, in application order.
    pub const ALL: [Migration; 2] = [Migration::Initial, Migration::ExtractExistingRecords];

    pub fn name(self) -> &'static str {
        match self {
            Migration::Initial => "0001_initial",
            Migration::ExtractExistingRecords => "0002_extract_existing_records",
        }
    }
}

/// Migrations from `ALL` that are not in `applied`, in order.
pub fn pending(applied: &[String]) -> Vec<Migration> {
    Migration::ALL
        .into_iter()
        .filter(|m| !applied.iter().any(|a| a == m.name()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct PostgresMigrator {
    pool: Arc<PgPool>,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    fn failed(name: &'static str) -> impl Fn(sqlx::Error) -> MigrationError {
        move |e| MigrationError::Failed {
            name,
            message: e.to_string(),
        }
    }

    /// Names of applied migrations, creating the ledger table if needed.
    pub async fn applied(&self) -> Result<Vec<String>, MigrationError> {
        sqlx::query(schema::LEDGER)
            .execute(&*self.pool)
            .await
            .map_err(Self::failed("ledger"))?;

        let rows = sqlx::query("SELECT name FROM stock_history_migrations ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(Self::failed("ledger"))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Self::failed("ledger")))
            .collect()
    }

    /// Apply every pending migration. Returns the names applied by this call.
    pub async fn run_pending(&self) -> Result<Vec<&'static str>, MigrationError> {
        let applied = self.applied().await?;
        let mut ran = Vec::new();

        for migration in pending(&applied) {
            let name = migration.name();
            let mut tx = self.pool.begin().await.map_err(Self::failed(name))?;
            apply(&mut *tx, migration).await?;
            sqlx::query("INSERT INTO stock_history_migrations (name) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(name)
                .execute(&mut *tx)
                .await
                .map_err(Self::failed(name))?;
            tx.commit().await.map_err(Self::failed(name))?;

            info!(migration = name, "applied migration");
            ran.push(name);
        }

        if ran.is_empty() {
            info!("stock history schema is up to date");
        }
        Ok(ran)
    }

    /// Revert the most recently applied migration, if any.
    pub async fn revert_last(&self) -> Result<Option<&'static str>, MigrationError> {
        let applied = self.applied().await?;
        let Some(last) = last_applied(&applied) else {
            return Ok(None);
        };

        let name = last.name();
        let mut tx = self.pool.begin().await.map_err(Self::failed(name))?;
        unapply(&mut *tx, last).await?;
        sqlx::query("DELETE FROM stock_history_migrations WHERE name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(Self::failed(name))?;
        tx.commit().await.map_err(Self::failed(name))?;

        info!(migration = name, "reverted migration");
        Ok(Some(name))
    }
}

/// Newest migration from `ALL` that appears in `applied`.
fn last_applied(applied: &[String]) -> Option<Migration> {
    Migration::ALL
        .into_iter()
        .rev()
        .find(|m| applied.iter().any(|a| a == m.name()))
}

async fn apply(conn: &mut PgConnection, migration: Migration) -> Result<(), MigrationError> {
    match migration {
        Migration::Initial => execute_all(conn, migration.name(), schema::UP).await,
        Migration::ExtractExistingRecords => {
            if let Some(records) = read_legacy_records(&mut *conn).await? {
                copy_legacy_records(conn, records).await?;
            }
            Ok(())
        }
    }
}

async fn unapply(conn: &mut PgConnection, migration: Migration) -> Result<(), MigrationError> {
    match migration {
        Migration::Initial => execute_all(conn, migration.name(), schema::DOWN).await,
        Migration::ExtractExistingRecords => {
            delete_all_entries(conn).await?;
            Ok(())
        }
    }
}

async fn execute_all(conn: &mut PgConnection, name: &'static str, statements: &[&str]) -> Result<(), MigrationError> {
    for statement in statements {
        sqlx::query(*statement)
            .execute(&mut *conn)
            .await
            .map_err(PostgresMigrator::failed(name))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_keeps_order_and_skips_applied() {
        assert_eq!(pending(&[]), Migration::ALL.to_vec());
        assert_eq!(
            pending(&["0001_initial".to_string()]),
            vec![Migration::ExtractExistingRecords]
        );
        assert!(pending(&["0001_initial".to_string(), "0002_extract_existing_records".to_string()]).is_empty());
    }

    #[test]
    fn revert_targets_the_newest_applied_migration() {
        assert_eq!(last_applied(&[]), None);
        assert_eq!(last_applied(&["0001_initial".to_string()]), Some(Migration::Initial));
        assert_eq!(
            last_applied(&["0002_extract_existing_records".to_string(), "0001_initial".to_string()]),
            Some(Migration::ExtractExistingRecords)
        );
        assert_eq!(last_applied(&["0099_unknown".to_string()]), None);
    }

    #[test]
    fn schema_statements_are_idempotent() {
        assert!(schema::UP.iter().all(|s| s.contains("IF NOT EXISTS")));
        assert!(schema::DOWN.iter().all(|s| s.contains("IF EXISTS")));
    }
}
