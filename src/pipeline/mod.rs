//! # Stage Execution
//!
//! [`StageExecutor`] is the handler the router invokes for stage work. It is
//! the only place the stage contract registry is consulted at runtime:
//!
//! 1. validate the consumed upstream fields (strict mode blocks on violation)
//! 2. run the caller-supplied [`StageRunner`]
//! 3. validate the produced fields (violations are reported, never rolled back)
//! 4. ask the [`DecisionFilter`] whether the pipeline may auto-advance
//!
//! Only `AUTO_PROCEED` sets `next_stage`; `REQUIRE_REVIEW` and `STOP` are
//! relayed to the caller unchanged. [`StageAdvancer`] reads the result back
//! out of the orchestrator and dispatches `next_stage` when it is set.

pub mod advancer;
pub mod executor;
pub mod types;

pub use advancer::StageAdvancer;
pub use executor::{AutoProceedFilter, DecisionFilter, StageExecutor, StageRunner};
pub use types::{
    FilterAction, FilterDecision, StageContext, StagePayload, StageResult, StageStatus,
};
