use super::dead_letter::{DeadLetterStore, ReplayRejection};
use super::handler::EventHandler;
use crate::constants::events;
use crate::events::EventPublisher;
use crate::models::{DispatchRequest, FailureReason};
use crate::triggers::TriggerClass;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happened to a routed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteOutcome {
    Delivered {
        output: Value,
    },
    DeadLettered {
        entry_id: Uuid,
        attempt_count: u32,
        failure_reason: FailureReason,
        error_message: String,
    },
}

/// Result of routing one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub request_id: Uuid,
    pub work_item_id: String,
    pub trigger_class: TriggerClass,
    #[serde(flatten)]
    pub outcome: RouteOutcome,
    pub duration_ms: u64,
}

impl RouteResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RouteOutcome::Delivered { .. })
    }
}

/// Result of an operator-requested replay
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutcome {
    /// Handler succeeded; the entry was removed
    Succeeded { output: Value },
    /// Handler failed again; the entry remains with a higher attempt count
    StillFailing { attempt_count: u32 },
    NotFound,
    /// Another replay of the same entry has not finished yet
    AlreadyReplaying,
}

/// Routes dispatch requests to per-class handlers behind a failure boundary
pub struct EventRouter {
    handlers: RwLock<HashMap<TriggerClass, Arc<dyn EventHandler>>>,
    dead_letters: Arc<DeadLetterStore>,
    handler_timeout: Duration,
    publisher: EventPublisher,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<TriggerClass> = self.handlers.read().keys().copied().collect();
        f.debug_struct("EventRouter")
            .field("handlers", &registered)
            .field("dead_letter_depth", &self.dead_letters.depth())
            .field("handler_timeout", &self.handler_timeout)
            .finish()
    }
}

impl EventRouter {
    pub fn new(handler_timeout: Duration, publisher: EventPublisher) -> Self {
        Self::with_store(handler_timeout, publisher, Arc::new(DeadLetterStore::new()))
    }

    pub fn with_store(
        handler_timeout: Duration,
        publisher: EventPublisher,
        dead_letters: Arc<DeadLetterStore>,
    ) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            dead_letters,
            handler_timeout,
            publisher,
        }
    }

    /// Register the handler for a trigger class, replacing any previous one
    pub fn register_handler(&self, class: TriggerClass, handler: Arc<dyn EventHandler>) {
        info!(
            trigger_class = %class,
            handler = handler.name(),
            "🔌 ROUTER: Registered handler"
        );
        self.handlers.write().insert(class, handler);
    }

    /// Register one handler for every trigger class
    pub fn register_for_all(&self, handler: Arc<dyn EventHandler>) {
        for class in TriggerClass::ALL {
            self.register_handler(class, Arc::clone(&handler));
        }
    }

    pub fn has_handler(&self, class: TriggerClass) -> bool {
        self.handlers.read().contains_key(&class)
    }

    pub fn dead_letters(&self) -> &Arc<DeadLetterStore> {
        &self.dead_letters
    }

    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }

    /// Invoke the handler for `request`
    ///
    /// Never fails: any handler failure becomes a dead-letter entry keyed by
    /// `request.id`. A success removes an existing entry for the same id.
    pub async fn route(&self, request: &DispatchRequest) -> RouteResult {
        let started = Instant::now();
        let handler = self.handlers.read().get(&request.trigger_class).cloned();

        let invocation = match handler {
            Some(handler) => {
                debug!(
                    request_id = %request.id,
                    handler = handler.name(),
                    "Routing dispatch request"
                );
                self.invoke(handler.as_ref(), request).await
            }
            None => Err((
                FailureReason::NoHandler,
                format!(
                    "No handler registered for trigger class '{}'",
                    request.trigger_class
                ),
                None,
            )),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let outcome = match invocation {
            Ok(output) => {
                if self.dead_letters.remove(request.id).is_some() {
                    debug!(request_id = %request.id, "Cleared dead-letter entry after success");
                }
                self.publisher.publish(
                    events::EVENT_ROUTED,
                    json!({
                        "request_id": request.id,
                        "work_item_id": request.work_item_id,
                        "trigger_class": request.trigger_class,
                        "duration_ms": duration_ms,
                    }),
                );
                RouteOutcome::Delivered { output }
            }
            Err((failure_reason, error_message, error_stack)) => {
                warn!(
                    request_id = %request.id,
                    work_item_id = %request.work_item_id,
                    failure_reason = %failure_reason,
                    error = %error_message,
                    "⚠️ ROUTER: Handler failed, dead-lettering request"
                );
                let entry = self.dead_letters.record_failure(
                    request,
                    failure_reason,
                    error_message,
                    error_stack,
                );
                self.publisher.publish(
                    events::EVENT_DEAD_LETTERED,
                    json!({
                        "entry_id": entry.id,
                        "work_item_id": request.work_item_id,
                        "attempt_count": entry.attempt_count,
                        "failure_reason": entry.failure_reason,
                    }),
                );
                RouteOutcome::DeadLettered {
                    entry_id: entry.id,
                    attempt_count: entry.attempt_count,
                    failure_reason: entry.failure_reason,
                    error_message: entry.error_message,
                }
            }
        };

        RouteResult {
            request_id: request.id,
            work_item_id: request.work_item_id.clone(),
            trigger_class: request.trigger_class,
            outcome,
            duration_ms,
        }
    }

    async fn invoke(
        &self,
        handler: &dyn EventHandler,
        request: &DispatchRequest,
    ) -> Result<Value, (FailureReason, String, Option<String>)> {
        let guarded = AssertUnwindSafe(handler.handle(request)).catch_unwind();

        match tokio::time::timeout(self.handler_timeout, guarded).await {
            Err(_) => Err((
                FailureReason::Timeout,
                format!(
                    "Handler '{}' timed out after {}ms",
                    handler.name(),
                    self.handler_timeout.as_millis()
                ),
                None,
            )),
            Ok(Err(panic)) => Err((FailureReason::Panic, panic_message(panic.as_ref()), None)),
            Ok(Ok(Err(error))) => Err((
                FailureReason::HandlerError,
                error.to_string(),
                Some(format!("{error:?}")),
            )),
            Ok(Ok(Ok(output))) => Ok(output),
        }
    }

    /// Re-route the original request of a dead-letter entry
    ///
    /// Only ever called on operator request. A concurrent replay of the same
    /// entry is rejected rather than run twice.
    pub async fn replay_dead_letter(&self, id: Uuid) -> ReplayOutcome {
        let guard = match self.dead_letters.begin_replay(id) {
            Ok(guard) => guard,
            Err(ReplayRejection::NotFound) => return ReplayOutcome::NotFound,
            Err(ReplayRejection::AlreadyReplaying) => {
                debug!(entry_id = %id, "Replay already in progress");
                return ReplayOutcome::AlreadyReplaying;
            }
        };

        info!(
            entry_id = %id,
            event = %guard.request().event_name,
            "🔁 ROUTER: Replaying dead-letter entry"
        );
        let result = self.route(guard.request()).await;
        drop(guard);

        let outcome = match result.outcome {
            RouteOutcome::Delivered { output } => ReplayOutcome::Succeeded { output },
            RouteOutcome::DeadLettered { attempt_count, .. } => {
                ReplayOutcome::StillFailing { attempt_count }
            }
        };

        self.publisher.publish(
            events::DEAD_LETTER_REPLAYED,
            json!({
                "entry_id": id,
                "succeeded": matches!(outcome, ReplayOutcome::Succeeded { .. }),
            }),
        );
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("Handler panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("Handler panicked: {message}")
    } else {
        "Handler panicked".to_string()
    }
}
