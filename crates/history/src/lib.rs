//! Stock history domain module.
//!
//! Business rules for stock snapshots, implemented as deterministic domain
//! logic (no IO, no HTTP, no storage): what a history entry is, which parts
//! and stock items a snapshot counts, how old records expire, and how the
//! list endpoint filters and orders entries.

pub mod entry;
pub mod panel;
pub mod query;
pub mod retention;
pub mod settings;
pub mod snapshot;

pub use entry::{NewStockHistoryEntry, StockHistoryEntry};
pub use panel::{PanelRequest, UiPanel, panels_for};
pub use query::{
    HistoryFilter, HistoryOrdering, HistoryQuery, HistoryQueryParams, Page, PageRequest, SortField,
};
pub use retention::{is_expired, retention_cutoff};
pub use settings::{HistorySettings, SettingDefinition, SettingKind, SettingsPatch};
pub use snapshot::{
    PartPricing, PartRecord, SnapshotReport, StockItemRecord, StockSnapshot, build_snapshot,
    snapshot_due,
};
