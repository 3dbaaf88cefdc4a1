use crate::triggers::TriggerClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A schedulable unit created when a trigger fires
///
/// Immutable once created. Consumed exactly once by the orchestrator, or
/// re-created from a dead-letter entry on replay (keeping the same `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub id: Uuid,
    pub work_item_id: String,
    pub event_name: String,
    pub trigger_class: TriggerClass,
    pub urgency_rank: u8,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub interruptible: bool,
}

impl DispatchRequest {
    pub fn new(event_name: &str, trigger_class: TriggerClass, payload: Value) -> Self {
        let id = Uuid::new_v4();
        let work_item_id = Self::work_item_from_payload(&payload).unwrap_or_else(|| id.to_string());
        let definition = trigger_class.definition();

        Self {
            id,
            work_item_id,
            event_name: event_name.to_string(),
            trigger_class,
            urgency_rank: definition.urgency_rank,
            payload,
            created_at: Utc::now(),
            interruptible: definition.interruptible,
        }
    }

    fn work_item_from_payload(payload: &Value) -> Option<String> {
        ["work_item_id", "venture_id"]
            .iter()
            .filter_map(|key| payload.get(*key))
            .find_map(|value| match value {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}
