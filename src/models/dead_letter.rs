use super::DispatchRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Why a handler invocation was dead-lettered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Handler returned an error
    HandlerError,
    /// Handler exceeded the configured timeout
    Timeout,
    /// Handler panicked
    Panic,
    /// No handler registered for the trigger class
    NoHandler,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandlerError => write!(f, "handler_error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Panic => write!(f, "panic"),
            Self::NoHandler => write!(f, "no_handler"),
        }
    }
}

/// Durable record of a failed dispatch, retained for operator-driven replay
///
/// Keyed by the original request id so repeated failures of the same logical
/// event update one entry instead of creating new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub id: Uuid,
    pub original_event: DispatchRequest,
    pub attempt_count: u32,
    pub failure_reason: FailureReason,
    pub error_message: String,
    pub error_stack: Option<String>,
    pub first_failed_at: DateTime<Utc>,
    pub last_failed_at: DateTime<Utc>,
    #[serde(default)]
    pub replay_in_progress: bool,
}

impl DeadLetterEntry {
    pub fn new(
        original_event: DispatchRequest,
        failure_reason: FailureReason,
        error_message: String,
        error_stack: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: original_event.id,
            original_event,
            attempt_count: 1,
            failure_reason,
            error_message,
            error_stack,
            first_failed_at: now,
            last_failed_at: now,
            replay_in_progress: false,
        }
    }

    /// Record another failure of the same logical event
    pub fn record_failure(
        &mut self,
        failure_reason: FailureReason,
        error_message: String,
        error_stack: Option<String>,
    ) {
        self.attempt_count += 1;
        self.failure_reason = failure_reason;
        self.error_message = error_message;
        self.error_stack = error_stack;
        self.last_failed_at = Utc::now();
    }
}
