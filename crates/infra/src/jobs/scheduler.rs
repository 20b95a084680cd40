use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use stockhistory_history::SnapshotReport;

use super::{JobError, RetentionJob, SnapshotJob};
use crate::store::SettingsStore;

/// Config for the history scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(86_400),
            max_retries: 5,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
        }
    }
}

impl SchedulerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// What one scheduler tick did. `None` means the job is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub snapshot: Option<SnapshotReport>,
    pub retention_deleted: Option<u64>,
}

/// Handle for the running scheduler.
///
/// Dropping the handle also stops the scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for the current tick to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.join.await;
    }
}

/// Runs the snapshot job then the retention job on every tick.
#[derive(Clone)]
pub struct HistoryScheduler {
    config: SchedulerConfig,
    snapshot: SnapshotJob,
    retention: RetentionJob,
    settings: Arc<dyn SettingsStore>,
}

impl HistoryScheduler {
    pub fn new(
        config: SchedulerConfig,
        snapshot: SnapshotJob,
        retention: RetentionJob,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            config,
            snapshot,
            retention,
            settings,
        }
    }

    /// One tick: snapshot (period-gated) then retention, each only when enabled.
    pub async fn run_once(&self, today: NaiveDate) -> Result<TickReport, JobError> {
        let settings = self.settings.load().await?;
        let mut report = TickReport::default();

        if settings.enable_snapshots {
            report.snapshot = Some(self.snapshot.run(today, false).await?);
        }
        if settings.enable_retention {
            report.retention_deleted = Some(self.retention.run(today).await?);
        }
        Ok(report)
    }

    /// Spawn on the current tokio runtime.
    ///
    /// - Schedule: runs once at startup, then every `interval`
    /// - Failures: logged + retried with bounded exponential backoff; never propagate
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(self.run_loop(shutdown_rx));

        SchedulerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    async fn run_loop(self, mut shutdown_rx: oneshot::Receiver<()>) {
        info!(interval_secs = self.config.interval.as_secs(), "stock history scheduler started");

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'ticks: loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break 'ticks,
                _ = ticker.tick() => {}
            }

            let mut failures: u32 = 0;
            loop {
                let today = Utc::now().date_naive();
                match self.run_once(today).await {
                    Ok(report) => {
                        info!(?report, "stock history tick complete");
                        break;
                    }
                    Err(e) => {
                        failures += 1;
                        warn!(error = %e, attempt = failures, "stock history tick failed");
                        if failures > self.config.max_retries {
                            warn!("giving up until the next tick");
                            break;
                        }
                    }
                }

                let delay = backoff(self.config.base_backoff, self.config.max_backoff, failures);
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break 'ticks,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        info!("stock history scheduler stopped");
    }
}

fn backoff(base: Duration, max: Duration, attempt: u32) -> Duration {
    // base * 2^(attempt-1), capped.
    let pow = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(pow).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use stockhistory_core::PartId;
    use stockhistory_history::{HistorySettings, PartRecord, StockItemRecord, StockSnapshot};

    use crate::source::{InMemoryStockSource, SourceError, StockSource};
    use crate::store::{HistoryStore, InMemoryHistoryStore, InMemorySettingsStore};

    struct FailingSource {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl StockSource for FailingSource {
        async fn read_snapshot(&self) -> Result<StockSnapshot, SourceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SourceError::Unavailable("host offline".to_string()))
        }
    }

    fn scheduler(
        history: Arc<InMemoryHistoryStore>,
        source: Arc<dyn StockSource>,
        settings: HistorySettings,
        config: SchedulerConfig,
    ) -> HistoryScheduler {
        let settings: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new(settings));
        HistoryScheduler::new(
            config,
            SnapshotJob::new(history.clone(), source, settings.clone()),
            RetentionJob::new(history, settings.clone()),
            settings,
        )
    }

    fn stocked_source() -> Arc<dyn StockSource> {
        Arc::new(InMemoryStockSource::new(StockSnapshot {
            parts: vec![PartRecord::new(PartId::new(1))],
            items: vec![StockItemRecord::new(PartId::new(1), Decimal::from(2))],
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn disabled_jobs_do_not_run() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let mut settings = HistorySettings::default();
        settings.enable_snapshots = false;
        settings.enable_retention = false;

        let report = scheduler(history.clone(), stocked_source(), settings, SchedulerConfig::default())
            .run_once(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
            .await
            .unwrap();

        assert_eq!(report, TickReport::default());
        assert_eq!(history.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn runs_on_startup_and_stops_on_shutdown() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let handle = scheduler(
            history.clone(),
            stocked_source(),
            HistorySettings::default(),
            SchedulerConfig::default().with_interval(Duration::from_secs(3600)),
        )
        .spawn();

        for _ in 0..100 {
            if history.count().await.unwrap() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(history.count().await.unwrap(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn failures_are_retried_a_bounded_number_of_times() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let source = Arc::new(FailingSource {
            attempts: AtomicU32::new(0),
        });
        let config = SchedulerConfig {
            interval: Duration::from_secs(3600),
            max_retries: 2,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        };
        let handle = scheduler(history, source.clone(), HistorySettings::default(), config).spawn();

        for _ in 0..200 {
            if source.attempts.load(Ordering::SeqCst) >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.attempts.load(Ordering::SeqCst), 3);

        handle.shutdown().await;
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(500);
        assert_eq!(backoff(base, max, 1), Duration::from_millis(100));
        assert_eq!(backoff(base, max, 2), Duration::from_millis(200));
        assert_eq!(backoff(base, max, 3), Duration::from_millis(400));
        assert_eq!(backoff(base, max, 9), max);
    }
}
