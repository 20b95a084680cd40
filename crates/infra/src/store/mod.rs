//! Persistence for history entries and plugin settings.
//!
//! Two backends share one contract:
//! - `in_memory`: tests and dev runs without a database
//! - `postgres`: the host's database, tables created by the migrations module
//!
//! Both must agree with `HistoryQuery::evaluate` on filtering and ordering.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use stockhistory_core::PartId;
use stockhistory_history::{HistoryQuery, HistorySettings, NewStockHistoryEntry, Page, StockHistoryEntry};

pub use in_memory::{InMemoryHistoryStore, InMemorySettingsStore};
pub use postgres::{PostgresHistoryStore, PostgresSettingsStore};

/// Store operation error.
///
/// Infrastructure failures only; validation happens before anything reaches
/// a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// A row violated a table constraint (unknown part, negative quantity).
    #[error("constraint violated in {operation}: {message}")]
    Constraint {
        operation: &'static str,
        message: String,
    },

    /// Stored data could not be turned back into domain values.
    #[error("stored data is invalid: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Stock history entries.
///
/// Entries are append-only: nothing updates a stored entry. Deletion happens
/// in bulk (retention, part cascade).
#[async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    /// Insert entries atomically. Entries without a date are stamped with today's date.
    async fn insert_many(
        &self,
        entries: Vec<NewStockHistoryEntry>,
    ) -> Result<Vec<StockHistoryEntry>, StoreError>;

    async fn list(&self, query: &HistoryQuery) -> Result<Page<StockHistoryEntry>, StoreError>;

    /// Date of the most recent entry, if any.
    async fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError>;

    /// Delete entries dated strictly before `cutoff`.
    async fn delete_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError>;

    async fn delete_for_part(&self, part: PartId) -> Result<u64, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S> HistoryStore for Arc<S>
where
    S: HistoryStore + ?Sized,
{
    async fn insert_many(
        &self,
        entries: Vec<NewStockHistoryEntry>,
    ) -> Result<Vec<StockHistoryEntry>, StoreError> {
        (**self).insert_many(entries).await
    }

    async fn list(&self, query: &HistoryQuery) -> Result<Page<StockHistoryEntry>, StoreError> {
        (**self).list(query).await
    }

    async fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        (**self).latest_date().await
    }

    async fn delete_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        (**self).delete_before(cutoff).await
    }

    async fn delete_for_part(&self, part: PartId) -> Result<u64, StoreError> {
        (**self).delete_for_part(part).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        (**self).count().await
    }
}

/// Plugin settings, persisted as key/value text pairs.
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    /// Current settings; defaults fill in anything never saved.
    async fn load(&self) -> Result<HistorySettings, StoreError>;

    async fn save(&self, settings: &HistorySettings) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> SettingsStore for Arc<S>
where
    S: SettingsStore + ?Sized,
{
    async fn load(&self) -> Result<HistorySettings, StoreError> {
        (**self).load().await
    }

    async fn save(&self, settings: &HistorySettings) -> Result<(), StoreError> {
        (**self).save(settings).await
    }
}
