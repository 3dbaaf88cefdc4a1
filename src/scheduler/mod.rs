//! # Master Scheduler
//!
//! The periodic control loop. Each cycle asks a [`WorkSource`] for up to
//! `dispatch_batch_size` due work items, classifies them, and hands them to
//! the [`WorkOrchestrator`](crate::orchestration::WorkOrchestrator) in urgency
//! order. The cycle is wrapped in a circuit breaker:
//!
//! ```text
//!           threshold consecutive failures
//!   Closed ────────────────────────────────▶ Open
//!     ▲                                       │ cooldown elapsed
//!     │ trial succeeds                        ▼
//!     └──────────────────────────────────── HalfOpen ──trial fails──▶ Open
//! ```
//!
//! The scheduler is an owned instance passed to whoever needs it; its state is
//! only observable through [`MasterScheduler::status`].

pub mod circuit;
pub mod master_scheduler;

pub use circuit::{CircuitState, CircuitTransition, SchedulerCircuit};
pub use master_scheduler::{
    CycleOutcome, MasterScheduler, ReadyWorkItem, SchedulerStatus, WorkSource,
};
