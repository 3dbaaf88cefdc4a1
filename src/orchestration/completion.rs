use crate::models::DispatchRequest;
use serde_json::Value;

/// What the orchestrator should do once a request was delivered
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The work item is done for now
    Finished,
    /// The handler ran but refused the work; counted separately from completions
    Blocked,
    /// Dispatch a follow-up request for the same work item
    Advance(DispatchRequest),
}

impl Completion {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Finished => "completed",
            Self::Blocked => "blocked",
            Self::Advance(_) => "advanced",
        }
    }
}

/// Inspects a delivered handler output and decides what happens next
///
/// Called synchronously on the routing task, after delivery and before the
/// slot is released.
pub trait CompletionHandler: Send + Sync + 'static {
    fn on_delivered(&self, request: &DispatchRequest, output: &Value) -> Completion;
}
