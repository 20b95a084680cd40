//! Infrastructure layer: database, host data, background jobs, config.

pub mod config;
pub mod hooks;
pub mod jobs;
pub mod migrations;
pub mod source;
pub mod store;

pub use config::{ConfigError, ServiceConfig};
pub use hooks::PartCascadeHook;
pub use jobs::{HistoryScheduler, JobError, RetentionJob, SchedulerConfig, SchedulerHandle, SnapshotJob};
pub use migrations::{MigrationError, PostgresMigrator};
pub use source::{InMemoryStockSource, PostgresStockSource, SourceError, StockSource};
pub use store::{
    HistoryStore, InMemoryHistoryStore, InMemorySettingsStore, PostgresHistoryStore,
    PostgresSettingsStore, SettingsStore, StoreError,
};
