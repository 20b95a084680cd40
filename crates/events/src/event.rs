use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Emitted by the host after a part is created.
pub const PART_CREATED: &str = "part_part.created";

/// Emitted by the host after a part is deleted.
pub const PART_DELETED: &str = "part_part.deleted";

/// An event forwarded by the host application.
///
/// Events are facts: they are never mutated after being received. The payload
/// is kept as loose JSON because the host decides what it sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEvent {
    pub event_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    pub received_at: DateTime<Utc>,
}

impl HostEvent {
    pub fn new(name: impl Into<String>, args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            name: name.into(),
            args,
            kwargs,
            received_at: Utc::now(),
        }
    }

    /// The `id` keyword argument as an integer, if present.
    ///
    /// Model events from the host carry the primary key of the affected row
    /// this way.
    pub fn id_kwarg(&self) -> Option<i64> {
        match self.kwargs.get("id")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kwargs(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn id_kwarg_accepts_numbers_and_strings() {
        let e = HostEvent::new(PART_DELETED, vec![], kwargs(json!({ "id": 12 })));
        assert_eq!(e.id_kwarg(), Some(12));

        let e = HostEvent::new(PART_DELETED, vec![], kwargs(json!({ "id": "13" })));
        assert_eq!(e.id_kwarg(), Some(13));

        let e = HostEvent::new(PART_DELETED, vec![], kwargs(json!({ "model": "Part" })));
        assert_eq!(e.id_kwarg(), None);
    }
}
