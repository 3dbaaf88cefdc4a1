use crate::constants::triggers;
use crate::models::DispatchRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Delivery channel for an inbound trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerClass {
    /// Reactive signal that must be handled immediately
    Event,
    /// Cadence-driven work picked up on the next round
    Round,
    /// Best-effort backlog work
    PriorityQueue,
}

/// Immutable per-class delivery guarantees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerDefinition {
    pub class: TriggerClass,
    /// 0 is most urgent
    pub urgency_rank: u8,
    pub max_latency: Duration,
    pub interruptible: bool,
}

/// One definition per class, indexed by urgency rank
pub const TRIGGER_DEFINITIONS: [TriggerDefinition; 3] = [
    TriggerDefinition {
        class: TriggerClass::Event,
        urgency_rank: 0,
        max_latency: Duration::from_secs(5),
        interruptible: true,
    },
    TriggerDefinition {
        class: TriggerClass::Round,
        urgency_rank: 1,
        max_latency: Duration::from_secs(300),
        interruptible: false,
    },
    TriggerDefinition {
        class: TriggerClass::PriorityQueue,
        urgency_rank: 2,
        max_latency: Duration::from_secs(3600),
        interruptible: false,
    },
];

impl TriggerClass {
    pub const ALL: [TriggerClass; 3] = [Self::Event, Self::Round, Self::PriorityQueue];

    pub fn definition(&self) -> &'static TriggerDefinition {
        match self {
            Self::Event => &TRIGGER_DEFINITIONS[0],
            Self::Round => &TRIGGER_DEFINITIONS[1],
            Self::PriorityQueue => &TRIGGER_DEFINITIONS[2],
        }
    }

    pub fn urgency_rank(&self) -> u8 {
        self.definition().urgency_rank
    }

    pub fn max_latency(&self) -> Duration {
        self.definition().max_latency
    }

    pub fn is_interruptible(&self) -> bool {
        self.definition().interruptible
    }
}

impl fmt::Display for TriggerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::Round => write!(f, "round"),
            Self::PriorityQueue => write!(f, "priority_queue"),
        }
    }
}

impl std::str::FromStr for TriggerClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(Self::Event),
            "round" => Ok(Self::Round),
            "priority_queue" => Ok(Self::PriorityQueue),
            _ => Err(format!("Invalid trigger class: {s}")),
        }
    }
}

/// Classify an inbound event name. Total: unknown names are `PriorityQueue`.
pub fn classify(event_name: &str) -> TriggerClass {
    match event_name.trim() {
        triggers::DECISION_SUBMITTED
        | triggers::GATE_EVALUATED
        | triggers::CHAIRMAN_OVERRIDE
        | triggers::VENTURE_KILLED => TriggerClass::Event,
        triggers::STAGE_COMPLETED
        | triggers::ROUND_SCHEDULED
        | triggers::PORTFOLIO_SWEEP
        | triggers::OPS_CYCLE => TriggerClass::Round,
        triggers::VENTURE_READY | triggers::BACKLOG_ENQUEUED => TriggerClass::PriorityQueue,
        _ => TriggerClass::PriorityQueue,
    }
}

pub fn urgency_rank_of(class: TriggerClass) -> u8 {
    class.urgency_rank()
}

pub fn definition_of(class: TriggerClass) -> &'static TriggerDefinition {
    class.definition()
}

/// Anything that can be ordered by trigger urgency
pub trait HasUrgency {
    fn urgency_rank(&self) -> u8;
}

impl HasUrgency for TriggerClass {
    fn urgency_rank(&self) -> u8 {
        TriggerClass::urgency_rank(self)
    }
}

impl HasUrgency for DispatchRequest {
    fn urgency_rank(&self) -> u8 {
        self.urgency_rank
    }
}

impl<T: HasUrgency> HasUrgency for &T {
    fn urgency_rank(&self) -> u8 {
        (**self).urgency_rank()
    }
}

/// Stable sort by urgency rank; equal ranks keep their arrival order
pub fn sort_by_urgency<T: HasUrgency>(items: &mut [T]) {
    items.sort_by_key(|item| item.urgency_rank());
}

/// Sole entry point from a raw event to a schedulable unit
///
/// The work item is taken from `work_item_id` (or `venture_id`) in the
/// payload; a payload without either becomes its own work item.
pub fn build_dispatch_request(event_name: &str, payload: Value) -> DispatchRequest {
    let class = classify(event_name);
    DispatchRequest::new(event_name, class, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_events_classify() {
        assert_eq!(classify("decision.submitted"), TriggerClass::Event);
        assert_eq!(classify("gate.evaluated"), TriggerClass::Event);
        assert_eq!(classify("stage.completed"), TriggerClass::Round);
        assert_eq!(classify("ops.cycle"), TriggerClass::Round);
        assert_eq!(classify("venture.ready"), TriggerClass::PriorityQueue);
    }

    #[test]
    fn test_unknown_events_degrade_to_least_urgent() {
        assert_eq!(classify(""), TriggerClass::PriorityQueue);
        assert_eq!(classify("DECISION.SUBMITTED"), TriggerClass::PriorityQueue);
        assert_eq!(classify("something.else"), TriggerClass::PriorityQueue);
    }

    #[test]
    fn test_definitions_order_classes_strictly() {
        assert_eq!(urgency_rank_of(TriggerClass::Event), 0);
        assert!(urgency_rank_of(TriggerClass::Event) < urgency_rank_of(TriggerClass::Round));
        assert!(
            urgency_rank_of(TriggerClass::Round) < urgency_rank_of(TriggerClass::PriorityQueue)
        );
        assert!(TriggerClass::Event.is_interruptible());
        assert!(!TriggerClass::PriorityQueue.is_interruptible());

        for (rank, definition) in TRIGGER_DEFINITIONS.iter().enumerate() {
            assert_eq!(definition.urgency_rank as usize, rank);
            assert_eq!(definition_of(definition.class), definition);
        }
    }

    #[test]
    fn test_class_string_round_trip() {
        for class in TriggerClass::ALL {
            assert_eq!(class.to_string().parse::<TriggerClass>().unwrap(), class);
        }
        assert!("urgent".parse::<TriggerClass>().is_err());
    }

    #[test]
    fn test_sort_by_urgency_keeps_arrival_order_for_ties() {
        let mut classes = vec![
            (TriggerClass::PriorityQueue, 'a'),
            (TriggerClass::Event, 'b'),
            (TriggerClass::Round, 'c'),
            (TriggerClass::Event, 'd'),
            (TriggerClass::PriorityQueue, 'e'),
        ];
        classes.sort_by_key(|(class, _)| class.urgency_rank());
        let order: String = classes.iter().map(|(_, tag)| *tag).collect();
        assert_eq!(order, "bdcae");

        let mut requests = vec![
            build_dispatch_request("venture.ready", json!({"work_item_id": "v1"})),
            build_dispatch_request("decision.submitted", json!({"work_item_id": "v2"})),
            build_dispatch_request("venture.ready", json!({"work_item_id": "v3"})),
        ];
        sort_by_urgency(&mut requests);
        let ids: Vec<&str> = requests.iter().map(|r| r.work_item_id.as_str()).collect();
        assert_eq!(ids, vec!["v2", "v1", "v3"]);
    }

    #[test]
    fn test_build_dispatch_request_copies_definition() {
        let request = build_dispatch_request(
            "decision.submitted",
            json!({"venture_id": "venture-42", "stage": 3}),
        );
        assert_eq!(request.trigger_class, TriggerClass::Event);
        assert_eq!(request.urgency_rank, 0);
        assert!(request.interruptible);
        assert_eq!(request.work_item_id, "venture-42");
        assert_eq!(request.event_name, "decision.submitted");
    }

    #[test]
    fn test_payload_without_work_item_becomes_its_own_item() {
        let request = build_dispatch_request("ops.cycle", json!({}));
        assert_eq!(request.work_item_id, request.id.to_string());
    }
}
