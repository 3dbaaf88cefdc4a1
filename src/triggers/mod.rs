//! # Trigger Classification
//!
//! Maps inbound event names to one of three delivery channels and turns raw
//! events into schedulable [`DispatchRequest`](crate::models::DispatchRequest)s.
//!
//! | Class           | Rank | Max latency | Interruptible |
//! |-----------------|------|-------------|---------------|
//! | `Event`         | 0    | 5s          | yes           |
//! | `Round`         | 1    | 5m          | no            |
//! | `PriorityQueue` | 2    | 1h          | no            |
//!
//! Unknown event names degrade to `PriorityQueue` so an unrecognized signal
//! never blocks the pipeline nor jumps the queue.

pub mod classifier;

pub use classifier::{
    build_dispatch_request, classify, definition_of, sort_by_urgency, urgency_rank_of,
    HasUrgency, TriggerClass, TriggerDefinition, TRIGGER_DEFINITIONS,
};
