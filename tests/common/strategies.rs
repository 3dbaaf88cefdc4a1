#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::Just;

/// Every event name the classifier knows about
pub const KNOWN_EVENTS: [&str; 10] = [
    "decision.submitted",
    "gate.evaluated",
    "chairman.override",
    "venture.killed",
    "stage.completed",
    "round.scheduled",
    "portfolio.sweep",
    "ops.cycle",
    "venture.ready",
    "backlog.enqueued",
];

/// Strategy for known event names
pub fn known_event_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(KNOWN_EVENTS.to_vec()).prop_map(str::to_string)
}

/// Strategy for arbitrary event names, known or not
pub fn event_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        known_event_strategy(),
        "[a-z]{1,12}\\.[a-z_]{1,12}",
        ".{0,40}",
    ]
}

/// Strategy for a burst of triggers against a handful of work items
pub fn trigger_burst_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (
            known_event_strategy(),
            prop_oneof![Just("v-1"), Just("v-2"), Just("v-3"), Just("v-4")].prop_map(str::to_string),
        ),
        0..24,
    )
}

/// Strategy for orchestrator capacities
pub fn max_concurrent_strategy() -> impl Strategy<Value = usize> {
    1usize..=6
}
