//! # Concurrent Work Orchestrator
//!
//! Admission control for work items. At most `max_concurrent` requests are
//! active at once; the rest wait in a pending queue ordered by urgency rank
//! with FIFO tie-break, so an Event-class request overtakes queued Round and
//! PriorityQueue work.
//!
//! ## Lifecycle
//!
//! ```text
//! dispatch ──slot free──▶ Active ──route ok──▶ Completed | Blocked
//!    │                      ▲    └─dead-lettered─▶ Failed
//!    └──no slot──▶ Pending ─┘ (promoted on completion/failure)
//! ```
//!
//! A [`CompletionHandler`] sees every delivered output. It can mark the item
//! blocked, or return a follow-up request that re-enters the pending queue
//! ahead of the slot being released.
//!
//! Work item state is discarded once an item completes or fails; only the
//! aggregate counters in [`OrchestratorStatus`] remain.

pub mod completion;
pub mod pending_queue;
pub mod work_orchestrator;

pub use completion::{Completion, CompletionHandler};
pub use pending_queue::PendingQueue;
pub use work_orchestrator::{Admission, OrchestratorStatus, WorkOrchestrator};
