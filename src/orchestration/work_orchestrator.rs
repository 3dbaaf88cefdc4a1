use super::completion::{Completion, CompletionHandler};
use super::pending_queue::PendingQueue;
use crate::constants::events;
use crate::events::EventPublisher;
use crate::logging::log_dispatch_operation;
use crate::models::{DispatchRequest, WorkItemState, WorkItemStatus};
use crate::routing::{EventRouter, RouteOutcome};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How a dispatch request was admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// Took a concurrency slot immediately
    Activated,
    /// Waiting in the pending queue
    Queued,
    /// The orchestrator is closed to new work
    Rejected,
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Aggregate orchestrator counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub active_count: usize,
    pub pending_count: usize,
    pub max_concurrent: usize,
    pub total_dispatched: u64,
    pub total_completed: u64,
    /// Delivered, but refused by the handler
    pub total_blocked: u64,
    pub total_failed: u64,
    pub total_superseded: u64,
    /// Work item ids currently holding a slot, oldest activation first
    pub active_items: Vec<String>,
}

#[derive(Debug, Default)]
struct OrchestratorState {
    /// In activation order; never longer than `max_concurrent`
    active: Vec<WorkItemState>,
    pending: PendingQueue,
    total_dispatched: u64,
    total_completed: u64,
    total_blocked: u64,
    total_failed: u64,
    total_superseded: u64,
    closed: bool,
}

impl OrchestratorState {
    fn in_flight(&self) -> usize {
        self.active.len() + self.pending.len()
    }
}

struct OrchestratorInner {
    max_concurrent: usize,
    state: Mutex<OrchestratorState>,
    router: Arc<EventRouter>,
    publisher: EventPublisher,
    completion: Option<Arc<dyn CompletionHandler>>,
    in_flight: watch::Sender<usize>,
}

/// Bounds the number of work items processed at once
///
/// All admission bookkeeping happens under one mutex that is never held
/// across an await point, so `dispatch` returns promptly no matter how long
/// active handlers run. Activated requests are routed on their own tokio
/// task; `dispatch` must therefore be called from within a tokio runtime.
///
/// With a [`CompletionHandler`] installed, a delivered output can mark the
/// item blocked or hand back a follow-up request. The follow-up is queued
/// before the finished item releases its slot, so `wait_for_idle` covers the
/// whole chain.
#[derive(Clone)]
pub struct WorkOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl std::fmt::Debug for WorkOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkOrchestrator")
            .field("max_concurrent", &self.inner.max_concurrent)
            .finish()
    }
}

impl WorkOrchestrator {
    pub fn new(max_concurrent: usize, router: Arc<EventRouter>, publisher: EventPublisher) -> Self {
        Self::build(max_concurrent, router, publisher, None)
    }

    pub fn with_completion_handler(
        max_concurrent: usize,
        router: Arc<EventRouter>,
        publisher: EventPublisher,
        completion: Arc<dyn CompletionHandler>,
    ) -> Self {
        Self::build(max_concurrent, router, publisher, Some(completion))
    }

    fn build(
        max_concurrent: usize,
        router: Arc<EventRouter>,
        publisher: EventPublisher,
        completion: Option<Arc<dyn CompletionHandler>>,
    ) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            inner: Arc::new(OrchestratorInner {
                max_concurrent: max_concurrent.max(1),
                state: Mutex::new(OrchestratorState::default()),
                router,
                publisher,
                completion,
                in_flight,
            }),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Admit a request: activate it when a slot is free, otherwise queue it
    /// by urgency
    ///
    /// Queued interruptible requests for the same work item with equal or
    /// lower urgency are abandoned in favour of the new one.
    pub fn dispatch(&self, request: DispatchRequest) -> Admission {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if state.closed {
            debug!(request_id = %request.id, "Orchestrator closed, rejecting dispatch");
            return Admission::Rejected;
        }

        let superseded = state
            .pending
            .supersede(&request.work_item_id, request.urgency_rank);
        state.total_superseded += superseded.len() as u64;
        state.total_dispatched += 1;

        let admission = if state.active.len() < inner.max_concurrent {
            inner.activate(&mut state, &request);
            Admission::Activated
        } else {
            state.pending.push(request.clone());
            Admission::Queued
        };

        log_dispatch_operation(
            if admission == Admission::Activated {
                "activated"
            } else {
                "queued"
            },
            &request.id.to_string(),
            &request.work_item_id,
            &request.trigger_class.to_string(),
            state.active.len(),
            state.pending.len(),
        );
        inner.in_flight.send_replace(state.in_flight());
        drop(state);

        for abandoned in &superseded {
            info!(
                request_id = %abandoned.id,
                superseded_by = %request.id,
                work_item_id = %abandoned.work_item_id,
                "✂️ ORCHESTRATOR: Queued request superseded"
            );
            inner.publisher.publish(
                events::DISPATCH_SUPERSEDED,
                json!({
                    "request_id": abandoned.id,
                    "superseded_by": request.id,
                    "work_item_id": abandoned.work_item_id,
                }),
            );
        }

        let event_name = match admission {
            Admission::Activated => events::DISPATCH_ACCEPTED,
            _ => events::DISPATCH_QUEUED,
        };
        inner.publisher.publish(
            event_name,
            json!({
                "request_id": request.id,
                "work_item_id": request.work_item_id,
                "trigger_class": request.trigger_class,
            }),
        );

        if admission == Admission::Activated {
            OrchestratorInner::spawn(Arc::clone(inner), request);
        }
        admission
    }

    pub fn get_status(&self) -> OrchestratorStatus {
        let state = self.inner.state.lock();

        OrchestratorStatus {
            active_count: state.active.len(),
            pending_count: state.pending.len(),
            max_concurrent: self.inner.max_concurrent,
            total_dispatched: state.total_dispatched,
            total_completed: state.total_completed,
            total_blocked: state.total_blocked,
            total_failed: state.total_failed,
            total_superseded: state.total_superseded,
            active_items: state
                .active
                .iter()
                .map(|item| item.work_item_id.clone())
                .collect(),
        }
    }

    /// Whether any request for `work_item_id` currently holds a slot
    pub fn is_active(&self, work_item_id: &str) -> bool {
        self.inner
            .state
            .lock()
            .active
            .iter()
            .any(|item| item.work_item_id == work_item_id)
    }

    pub fn is_request_active(&self, request_id: Uuid) -> bool {
        self.inner
            .state
            .lock()
            .active
            .iter()
            .any(|item| item.request_id == request_id)
    }

    /// Stop admitting new requests. Active and queued work still drains.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Resolves once nothing is active or pending
    pub async fn wait_for_idle(&self) {
        let mut in_flight = self.inner.in_flight.subscribe();
        let _ = in_flight.wait_for(|count| *count == 0).await;
    }
}

impl OrchestratorInner {
    fn activate(&self, state: &mut OrchestratorState, request: &DispatchRequest) {
        let now = Utc::now();
        let mut item =
            WorkItemState::pending(request.id, request.work_item_id.clone(), request.created_at);
        item.activate(now);

        if let Some(wait) = item.queue_wait() {
            debug!(
                request_id = %request.id,
                work_item_id = %request.work_item_id,
                queue_wait_ms = wait.num_milliseconds(),
                "Work item activated"
            );
        }
        state.active.push(item);
    }

    fn spawn(inner: Arc<Self>, request: DispatchRequest) {
        tokio::spawn(async move {
            let result = inner.router.route(&request).await;
            let delivered = match result.outcome {
                RouteOutcome::Delivered { output } => {
                    let completion = inner
                        .completion
                        .as_ref()
                        .map_or(Completion::Finished, |handler| {
                            handler.on_delivered(&request, &output)
                        });
                    Some((output, completion))
                }
                RouteOutcome::DeadLettered { .. } => None,
            };
            inner.finish(&request, delivered);
        });
    }

    /// Retire an active item, queue any follow-up, and promote pending
    /// requests into free slots
    fn finish(
        self: &Arc<Self>,
        request: &DispatchRequest,
        delivered: Option<(Value, Completion)>,
    ) {
        let mut state = self.state.lock();

        let Some(position) = state
            .active
            .iter()
            .position(|item| item.request_id == request.id)
        else {
            return;
        };
        let mut item = state.active.remove(position);
        let now = Utc::now();

        let (output, completion) = match delivered {
            Some((output, completion)) => (output, Some(completion)),
            None => (Value::Null, None),
        };
        let outcome = completion.as_ref().map_or("failed", Completion::label);
        match &completion {
            None => {
                item.finish(false, now);
                state.total_failed += 1;
            }
            Some(Completion::Blocked) => {
                item.block(now);
                state.total_blocked += 1;
            }
            Some(_) => {
                item.finish(true, now);
                state.total_completed += 1;
            }
        }

        let mut superseded = Vec::new();
        let mut follow_up = None;
        if let Some(Completion::Advance(next)) = completion {
            if state.closed {
                warn!(
                    request_id = %request.id,
                    work_item_id = %request.work_item_id,
                    event = %next.event_name,
                    "Orchestrator closed, dropping follow-up request"
                );
            } else {
                superseded = state
                    .pending
                    .supersede(&next.work_item_id, next.urgency_rank);
                state.total_superseded += superseded.len() as u64;
                state.total_dispatched += 1;
                state.pending.push(next.clone());
                follow_up = Some(next);
            }
        }

        let mut promoted = Vec::new();
        while state.active.len() < self.max_concurrent {
            let Some(next) = state.pending.pop_next() else {
                break;
            };
            self.activate(&mut state, &next);
            promoted.push(next);
        }

        log_dispatch_operation(
            outcome,
            &request.id.to_string(),
            &request.work_item_id,
            &request.trigger_class.to_string(),
            state.active.len(),
            state.pending.len(),
        );
        self.in_flight.send_replace(state.in_flight());
        drop(state);

        let event_name = match item.status {
            WorkItemStatus::Completed => events::WORK_ITEM_COMPLETED,
            WorkItemStatus::Blocked => events::WORK_ITEM_BLOCKED,
            _ => events::WORK_ITEM_FAILED,
        };
        self.publisher.publish(
            event_name,
            json!({
                "request_id": request.id,
                "work_item_id": item.work_item_id,
                "dispatched_at": item.dispatched_at,
                "completed_at": item.completed_at,
                "output": output,
                "advanced_to": follow_up.as_ref().map(|next| next.id),
            }),
        );

        for abandoned in &superseded {
            self.publisher.publish(
                events::DISPATCH_SUPERSEDED,
                json!({
                    "request_id": abandoned.id,
                    "superseded_by": follow_up.as_ref().map(|next| next.id),
                    "work_item_id": abandoned.work_item_id,
                }),
            );
        }
        if let Some(next) = &follow_up {
            info!(
                request_id = %next.id,
                previous_request_id = %request.id,
                work_item_id = %next.work_item_id,
                event = %next.event_name,
                "➡️ ORCHESTRATOR: Queued follow-up request"
            );
        }

        for next in promoted {
            info!(
                request_id = %next.id,
                work_item_id = %next.work_item_id,
                trigger_class = %next.trigger_class,
                "⬆️ ORCHESTRATOR: Promoted pending request"
            );
            Self::spawn(Arc::clone(self), next);
        }
    }
}
