//! Event hooks backed by the history store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use stockhistory_core::PartId;
use stockhistory_events::{EventHook, HookError, HostEvent, PART_DELETED};

use crate::store::HistoryStore;

/// Removes a part's history when the host deletes the part.
///
/// With the Postgres schema the foreign key already cascades; this hook
/// keeps stores without one (in-memory) consistent as well.
#[derive(Clone)]
pub struct PartCascadeHook {
    history: Arc<dyn HistoryStore>,
}

impl PartCascadeHook {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl EventHook for PartCascadeHook {
    fn name(&self) -> &'static str {
        "part-cascade"
    }

    fn wants_process_event(&self, event: &str) -> bool {
        event == PART_DELETED
    }

    async fn process_event(&self, event: &HostEvent) -> Result<(), HookError> {
        let id = event
            .id_kwarg()
            .ok_or_else(|| HookError::Payload(format!("{} without an integer 'id'", event.name)))?;
        let part = PartId::new(id);

        let deleted = self
            .history
            .delete_for_part(part)
            .await
            .map_err(|e| HookError::Failed(e.to_string()))?;

        info!(part = %part, deleted, "removed stock history of deleted part");
        Ok(())
    }
}
