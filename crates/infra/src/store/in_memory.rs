use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use stockhistory_core::{EntryId, PartId};
use stockhistory_history::{
    HistoryQuery, HistorySettings, NewStockHistoryEntry, Page, StockHistoryEntry, is_expired,
};

use super::{HistoryStore, SettingsStore, StoreError};

#[derive(Debug, Default)]
struct Entries {
    last_pk: i64,
    rows: Vec<StockHistoryEntry>,
}

/// In-memory history store.
///
/// Intended for tests/dev. Primary keys are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    inner: RwLock<Entries>,
    /// Date stamped on undated entries; `None` uses the current UTC date.
    today: Option<NaiveDate>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp undated entries with `today` instead of the wall clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("lock poisoned".to_string())
    }

    fn retain(&self, keep: impl Fn(&StockHistoryEntry) -> bool) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        let before = inner.rows.len();
        inner.rows.retain(|e| keep(e));
        Ok((before - inner.rows.len()) as u64)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn insert_many(
        &self,
        entries: Vec<NewStockHistoryEntry>,
    ) -> Result<Vec<StockHistoryEntry>, StoreError> {
        let today = self.today();
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;

        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            inner.last_pk += 1;
            let entry = entry.into_entry(EntryId::new(inner.last_pk), today);
            inner.rows.push(entry.clone());
            stored.push(entry);
        }
        Ok(stored)
    }

    async fn list(&self, query: &HistoryQuery) -> Result<Page<StockHistoryEntry>, StoreError> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(query.evaluate(&inner.rows))
    }

    async fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(inner.rows.iter().map(|e| e.date).max())
    }

    async fn delete_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        self.retain(|e| !is_expired(e.date, cutoff))
    }

    async fn delete_for_part(&self, part: PartId) -> Result<u64, StoreError> {
        self.retain(|e| e.part != part)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(inner.rows.len() as u64)
    }
}

/// In-memory settings store. Starts from defaults.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    inner: RwLock<HistorySettings>,
}

impl InMemorySettingsStore {
    pub fn new(settings: HistorySettings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<HistorySettings, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(inner.clone())
    }

    async fn save(&self, settings: &HistorySettings) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        *inner = settings.clone();
        Ok(())
    }
}
