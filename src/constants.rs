//! # System Constants
//!
//! Known trigger event names, pipeline stage bounds and lifecycle event names.

/// Inbound trigger event names recognized by the classifier
pub mod triggers {
    // Event class: immediate, interruptible
    pub const DECISION_SUBMITTED: &str = "decision.submitted";
    pub const GATE_EVALUATED: &str = "gate.evaluated";
    pub const CHAIRMAN_OVERRIDE: &str = "chairman.override";
    pub const VENTURE_KILLED: &str = "venture.killed";

    // Round class: cadence-driven
    pub const STAGE_COMPLETED: &str = "stage.completed";
    pub const ROUND_SCHEDULED: &str = "round.scheduled";
    pub const PORTFOLIO_SWEEP: &str = "portfolio.sweep";
    pub const OPS_CYCLE: &str = "ops.cycle";

    // Priority queue class: best effort
    pub const VENTURE_READY: &str = "venture.ready";
    pub const BACKLOG_ENQUEUED: &str = "backlog.enqueued";
}

/// Pipeline stage numbering
pub mod stages {
    pub const FIRST_STAGE: u32 = 1;
    pub const LAST_STAGE: u32 = 25;
    pub const STAGE_COUNT: usize = 25;
}

/// Lifecycle events published on the event channel
pub mod events {
    pub const DISPATCH_ACCEPTED: &str = "dispatch.accepted";
    pub const DISPATCH_QUEUED: &str = "dispatch.queued";
    pub const DISPATCH_SUPERSEDED: &str = "dispatch.superseded";
    pub const WORK_ITEM_COMPLETED: &str = "work_item.completed";
    pub const WORK_ITEM_BLOCKED: &str = "work_item.blocked";
    pub const WORK_ITEM_FAILED: &str = "work_item.failed";
    pub const EVENT_ROUTED: &str = "event.routed";
    pub const EVENT_DEAD_LETTERED: &str = "event.dead_lettered";
    pub const DEAD_LETTER_REPLAYED: &str = "dead_letter.replayed";
    pub const CIRCUIT_OPENED: &str = "circuit.opened";
    pub const CIRCUIT_HALF_OPENED: &str = "circuit.half_opened";
    pub const CIRCUIT_CLOSED: &str = "circuit.closed";
    pub const SCHEDULER_CYCLE_COMPLETED: &str = "scheduler.cycle_completed";
}
