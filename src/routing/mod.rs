//! # Event Router
//!
//! Dispatches classified requests to the handler registered for their trigger
//! class. The router is the failure boundary of the dispatch pipeline: handler
//! errors, panics and timeouts are converted into dead-letter entries and never
//! propagated to the caller.
//!
//! ## Recovery Flow
//!
//! ```text
//! route(request) ──fail──▶ DeadLetterStore ──operator──▶ replay_dead_letter(id) ──▶ route(request)
//!                                 ▲                                                    │
//!                                 └──────────── fail: attempt_count += 1 ◀─────────────┤
//!                                                     success: entry removed ◀─────────┘
//! ```
//!
//! Replays are never automatic. A replay holds a [`ReplayGuard`] on its entry,
//! which is released even when the replaying future is dropped part way.

pub mod dead_letter;
pub mod handler;
pub mod router;

pub use dead_letter::{DeadLetterStore, ReplayGuard, ReplayRejection};
pub use handler::{EventHandler, FnHandler};
pub use router::{EventRouter, ReplayOutcome, RouteOutcome, RouteResult};
