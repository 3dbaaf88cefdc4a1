use crate::logging::log_dead_letter_operation;
use crate::models::{DeadLetterEntry, DispatchRequest, FailureReason};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Why a replay could not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayRejection {
    NotFound,
    AlreadyReplaying,
}

/// Holds the replay marker on one entry until dropped
#[derive(Debug)]
pub struct ReplayGuard<'a> {
    store: &'a DeadLetterStore,
    id: Uuid,
    request: DispatchRequest,
}

impl ReplayGuard<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The original request to route again
    pub fn request(&self) -> &DispatchRequest {
        &self.request
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        // No-op when a successful replay already removed the entry
        self.store.end_replay(self.id);
    }
}

/// In-memory dead-letter store keyed by the original request id
///
/// Reads are lock-free across shards; each write to an entry happens under
/// that entry's shard lock, so concurrent failures of the same event never
/// lose an `attempt_count` increment.
#[derive(Debug, Default)]
pub struct DeadLetterStore {
    entries: DashMap<Uuid, DeadLetterEntry>,
}

impl DeadLetterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry for a failed request, or bump the existing one
    pub fn record_failure(
        &self,
        request: &DispatchRequest,
        failure_reason: FailureReason,
        error_message: String,
        error_stack: Option<String>,
    ) -> DeadLetterEntry {
        let (operation, entry) = match self.entries.entry(request.id) {
            Entry::Occupied(mut occupied) => {
                occupied
                    .get_mut()
                    .record_failure(failure_reason, error_message, error_stack);
                ("updated", occupied.get().clone())
            }
            Entry::Vacant(vacant) => {
                let entry = DeadLetterEntry::new(
                    request.clone(),
                    failure_reason,
                    error_message,
                    error_stack,
                );
                ("created", vacant.insert(entry).value().clone())
            }
        };

        log_dead_letter_operation(
            operation,
            &entry.id.to_string(),
            entry.attempt_count,
            &entry.failure_reason.to_string(),
            Some(&entry.error_message),
        );

        entry
    }

    /// Mark an entry as being replayed and hand back its original request
    ///
    /// The marker is cleared when the returned guard drops, including when the
    /// replaying future is cancelled part way through.
    pub fn begin_replay(&self, id: Uuid) -> Result<ReplayGuard<'_>, ReplayRejection> {
        let mut entry = self.entries.get_mut(&id).ok_or(ReplayRejection::NotFound)?;
        if entry.replay_in_progress {
            return Err(ReplayRejection::AlreadyReplaying);
        }
        entry.replay_in_progress = true;
        let request = entry.original_event.clone();
        drop(entry);

        Ok(ReplayGuard {
            store: self,
            id,
            request,
        })
    }

    /// Clear the replay marker if the entry survived the replay
    pub fn end_replay(&self, id: Uuid) -> Option<DeadLetterEntry> {
        self.entries.get_mut(&id).map(|mut entry| {
            entry.replay_in_progress = false;
            entry.clone()
        })
    }

    pub fn remove(&self, id: Uuid) -> Option<DeadLetterEntry> {
        self.entries.remove(&id).map(|(_, entry)| entry)
    }

    pub fn get(&self, id: Uuid) -> Option<DeadLetterEntry> {
        self.entries.get(&id).map(|entry| entry.clone())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.contains_key(&id)
    }

    /// All entries, oldest first failure first
    pub fn list(&self) -> Vec<DeadLetterEntry> {
        let mut entries: Vec<DeadLetterEntry> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        entries.sort_by_key(|entry| entry.first_failed_at);
        entries
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}
