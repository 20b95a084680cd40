//! Service wiring: stores, stock source, jobs and the host event bus.

use std::sync::{Arc, Mutex};

use sqlx::PgPool;
use tracing::{info, warn};

use stockhistory_events::{
    EventBus, EventHook, HookRunner, HookRunnerHandle, HostEvent, InMemoryBusError,
    InMemoryEventBus, LogPartCreated,
};
use stockhistory_infra::{
    HistoryScheduler, HistoryStore, InMemoryHistoryStore, InMemorySettingsStore,
    InMemoryStockSource, PartCascadeHook, PostgresHistoryStore, PostgresSettingsStore,
    PostgresStockSource, RetentionJob, SchedulerConfig, SettingsStore, SnapshotJob, StockSource,
};

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub history: Arc<dyn HistoryStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub snapshot: SnapshotJob,
    pub retention: RetentionJob,
    events: InMemoryEventBus<HostEvent>,
    hook_runner: Mutex<Option<HookRunnerHandle>>,
}

impl AppServices {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        settings: Arc<dyn SettingsStore>,
        source: Arc<dyn StockSource>,
    ) -> Self {
        Self {
            snapshot: SnapshotJob::new(history.clone(), source, settings.clone()),
            retention: RetentionJob::new(history.clone(), settings.clone()),
            history,
            settings,
            events: InMemoryEventBus::new(),
            hook_runner: Mutex::new(None),
        }
    }

    /// Dev wiring: nothing persists across restarts and the host has no stock.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryHistoryStore::new()),
            Arc::new(InMemorySettingsStore::default()),
            Arc::new(InMemoryStockSource::default()),
        )
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::new(
            Arc::new(PostgresHistoryStore::new(pool.clone())),
            Arc::new(PostgresSettingsStore::new(pool.clone())),
            Arc::new(PostgresStockSource::new(pool)),
        )
    }

    pub fn scheduler(&self, config: SchedulerConfig) -> HistoryScheduler {
        HistoryScheduler::new(
            config,
            self.snapshot.clone(),
            self.retention.clone(),
            self.settings.clone(),
        )
    }

    /// Subscribe the event hooks to the bus on a background runner.
    ///
    /// Must be called before events are published; earlier events are not replayed.
    pub fn start_hooks(&self, runtime: tokio::runtime::Handle) -> std::io::Result<()> {
        let hooks: Vec<Arc<dyn EventHook>> = vec![
            Arc::new(LogPartCreated),
            Arc::new(PartCascadeHook::new(self.history.clone())),
        ];

        let handle = HookRunner::new(hooks).spawn(self.events.subscribe(), runtime)?;
        match self.hook_runner.lock() {
            Ok(mut slot) => {
                if let Some(previous) = slot.replace(handle) {
                    previous.shutdown();
                }
            }
            Err(_) => warn!("hook runner slot poisoned; runner left detached"),
        }
        info!("event hooks started");
        Ok(())
    }

    pub fn publish(&self, event: HostEvent) -> Result<(), InMemoryBusError> {
        self.events.publish(event)
    }

    pub fn stop_hooks(&self) {
        let handle = match self.hook_runner.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }
}
