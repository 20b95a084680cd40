use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use stockhistory_history::{SnapshotReport, build_snapshot, snapshot_due};

use super::JobError;
use crate::source::StockSource;
use crate::store::{HistoryStore, SettingsStore};

/// Reads current stock from the host and records it.
#[derive(Clone)]
pub struct SnapshotJob {
    history: Arc<dyn HistoryStore>,
    source: Arc<dyn StockSource>,
    settings: Arc<dyn SettingsStore>,
}

impl SnapshotJob {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        source: Arc<dyn StockSource>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            history,
            source,
            settings,
        }
    }

    /// Record a snapshot dated `today`.
    ///
    /// Unless `force` is set, nothing is read or written while the latest
    /// snapshot is younger than `STOCK_COUNT_PERIOD` days.
    #[instrument(skip(self), err)]
    pub async fn run(&self, today: NaiveDate, force: bool) -> Result<SnapshotReport, JobError> {
        let settings = self.settings.load().await?;

        if !force {
            let last = self.history.latest_date().await?;
            if !snapshot_due(last, today, settings.stock_count_period) {
                info!(?last, period = settings.stock_count_period, "stock snapshot not due");
                return Ok(SnapshotReport::not_due());
            }
        }

        let stock = self.source.read_snapshot().await?;
        let (entries, report) = build_snapshot(&stock, &settings);
        let entries = entries.into_iter().map(|e| e.with_date(today)).collect();
        self.history.insert_many(entries).await?;

        info!(
            parts_examined = report.parts_examined,
            parts_skipped = report.parts_skipped,
            entries_created = report.entries_created,
            unpriced_items = report.unpriced_items,
            "stock snapshot recorded"
        );
        Ok(report)
    }
}
