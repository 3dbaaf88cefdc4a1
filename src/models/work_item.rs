use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a work item inside the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    /// Accepted but waiting for capacity
    Pending,
    /// Occupying one of the concurrency slots
    Active,
    Completed,
    /// Delivered, but the handler refused to run the work
    Blocked,
    Failed,
}

impl WorkItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Blocked | Self::Failed)
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Blocked => write!(f, "blocked"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Orchestrator-owned state for one dispatch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemState {
    pub request_id: Uuid,
    pub work_item_id: String,
    pub status: WorkItemStatus,
    /// When the request entered the orchestrator
    pub created_at: DateTime<Utc>,
    /// When the request took a concurrency slot
    pub dispatched_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkItemState {
    pub fn pending(request_id: Uuid, work_item_id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            request_id,
            work_item_id,
            status: WorkItemStatus::Pending,
            created_at,
            dispatched_at: None,
            completed_at: None,
        }
    }

    pub fn activate(&mut self, at: DateTime<Utc>) {
        self.status = WorkItemStatus::Active;
        self.dispatched_at = Some(at);
    }

    pub fn finish(&mut self, success: bool, at: DateTime<Utc>) {
        self.status = if success {
            WorkItemStatus::Completed
        } else {
            WorkItemStatus::Failed
        };
        self.completed_at = Some(at);
    }

    pub fn block(&mut self, at: DateTime<Utc>) {
        self.status = WorkItemStatus::Blocked;
        self.completed_at = Some(at);
    }

    /// Time spent queued before activation
    pub fn queue_wait(&self) -> Option<chrono::Duration> {
        self.dispatched_at.map(|at| at - self.created_at)
    }
}
