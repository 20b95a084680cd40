//! Background jobs: periodic stock snapshots and the retention sweep.
//!
//! - `SnapshotJob`: records one entry per eligible part, gated by `STOCK_COUNT_PERIOD`
//! - `RetentionJob`: deletes entries older than `STOCK_DELETE_PERIOD`
//! - `HistoryScheduler`: runs both on an interval with bounded retry

pub mod retention;
pub mod scheduler;
pub mod snapshot;

use thiserror::Error;

use crate::source::SourceError;
use crate::store::StoreError;

pub use retention::RetentionJob;
pub use scheduler::{HistoryScheduler, SchedulerConfig, SchedulerHandle, TickReport};
pub use snapshot::SnapshotJob;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),
}
