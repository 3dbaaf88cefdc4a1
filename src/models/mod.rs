//! # Pipeline Data Model
//!
//! Records that flow between the classifier, router and orchestrator.

pub mod dead_letter;
pub mod dispatch_request;
pub mod work_item;

pub use dead_letter::{DeadLetterEntry, FailureReason};
pub use dispatch_request::DispatchRequest;
pub use work_item::{WorkItemState, WorkItemStatus};
