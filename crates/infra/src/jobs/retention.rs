use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use stockhistory_history::retention_cutoff;

use super::JobError;
use crate::store::{HistoryStore, SettingsStore};

/// Deletes entries older than `STOCK_DELETE_PERIOD` days.
#[derive(Clone)]
pub struct RetentionJob {
    history: Arc<dyn HistoryStore>,
    settings: Arc<dyn SettingsStore>,
}

impl RetentionJob {
    pub fn new(history: Arc<dyn HistoryStore>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { history, settings }
    }

    /// Returns the number of entries deleted.
    #[instrument(skip(self), err)]
    pub async fn run(&self, today: NaiveDate) -> Result<u64, JobError> {
        let settings = self.settings.load().await?;
        let cutoff = retention_cutoff(today, settings.stock_delete_period);
        let deleted = self.history.delete_before(cutoff).await?;
        info!(%cutoff, deleted, "stock history retention sweep");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use stockhistory_core::PartId;
    use stockhistory_history::{HistorySettings, NewStockHistoryEntry};

    use crate::store::{InMemoryHistoryStore, InMemorySettingsStore};

    #[tokio::test]
    async fn removes_only_entries_past_the_horizon() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let history = Arc::new(InMemoryHistoryStore::new());
        let entry = |age: i64| {
            NewStockHistoryEntry::new(PartId::new(1), 1, Decimal::ONE)
                .unwrap()
                .with_date(today - Duration::days(age))
        };
        history
            .insert_many(vec![entry(0), entry(29), entry(30), entry(31), entry(400)])
            .await
            .unwrap();

        let mut settings = HistorySettings::default();
        settings.stock_delete_period = 30;
        let job = RetentionJob::new(history.clone(), Arc::new(InMemorySettingsStore::new(settings)));

        assert_eq!(job.run(today).await.unwrap(), 2);
        assert_eq!(history.count().await.unwrap(), 3);
        assert_eq!(job.run(today).await.unwrap(), 0);
    }
}
