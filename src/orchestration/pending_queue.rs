use crate::models::DispatchRequest;
use std::collections::BTreeMap;

/// Requests waiting for a concurrency slot
///
/// Ordered by urgency rank, then by arrival. Keys are `(urgency_rank, seq)`
/// where `seq` is a monotonically increasing arrival counter, so the first
/// entry is always the most urgent, oldest request.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: BTreeMap<(u8, u64), DispatchRequest>,
    next_seq: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: DispatchRequest) {
        let key = (request.urgency_rank, self.next_seq);
        self.next_seq += 1;
        self.entries.insert(key, request);
    }

    /// Remove and return the most urgent request
    pub fn pop_next(&mut self) -> Option<DispatchRequest> {
        self.entries.pop_first().map(|(_, request)| request)
    }

    pub fn peek_next(&self) -> Option<&DispatchRequest> {
        self.entries.values().next()
    }

    /// Abandon queued interruptible requests for `work_item_id` whose urgency
    /// is equal to or lower than `urgency_rank`
    ///
    /// Non-interruptible requests are never removed.
    pub fn supersede(&mut self, work_item_id: &str, urgency_rank: u8) -> Vec<DispatchRequest> {
        let keys: Vec<(u8, u64)> = self
            .entries
            .iter()
            .filter(|(_, queued)| {
                queued.interruptible
                    && queued.work_item_id == work_item_id
                    && queued.urgency_rank >= urgency_rank
            })
            .map(|(key, _)| *key)
            .collect();

        keys.into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued requests in promotion order
    pub fn iter(&self) -> impl Iterator<Item = &DispatchRequest> {
        self.entries.values()
    }
}
