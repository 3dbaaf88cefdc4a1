use super::circuit::{CircuitState, CircuitTransition, SchedulerCircuit};
use crate::config::{CircuitBreakerConfig, SchedulerConfig};
use crate::constants::events;
use crate::events::EventPublisher;
use crate::logging::{log_error, log_scheduler_cycle};
use crate::models::DispatchRequest;
use crate::orchestration::{Admission, WorkOrchestrator};
use crate::triggers::{build_dispatch_request, sort_by_urgency};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// A work item that is due for its next stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyWorkItem {
    pub work_item_id: String,
    pub event_name: String,
    #[serde(default)]
    pub payload: Value,
}

impl ReadyWorkItem {
    pub fn new(work_item_id: impl Into<String>, event_name: impl Into<String>, payload: Value) -> Self {
        Self {
            work_item_id: work_item_id.into(),
            event_name: event_name.into(),
            payload,
        }
    }

    /// Classify into a dispatch request bound to this work item
    pub fn into_request(self) -> DispatchRequest {
        let mut payload = match self.payload {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        payload.insert(
            "work_item_id".to_string(),
            Value::String(self.work_item_id),
        );
        build_dispatch_request(&self.event_name, Value::Object(payload))
    }
}

/// Where the scheduler finds due work
///
/// A fetch error counts as a failed cycle for the circuit.
#[async_trait]
pub trait WorkSource: Send + Sync + 'static {
    async fn fetch_ready(&self, limit: usize) -> anyhow::Result<Vec<ReadyWorkItem>>;
}

/// What one scheduling cycle did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Circuit open and cooling down; nothing was polled
    Skipped { cooldown_remaining_ms: u64 },
    Completed {
        circuit_state: CircuitState,
        fetched: usize,
        activated: usize,
        queued: usize,
        rejected: usize,
    },
    Failed {
        circuit_state: CircuitState,
        error: String,
    },
}

/// Read-only scheduler state for the status interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub circuit_state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub poll_interval_ms: u64,
    pub dispatch_batch_size: usize,
    pub half_open_batch_size: usize,
}

#[derive(Debug)]
struct CycleState {
    circuit: SchedulerCircuit,
    last_cycle_at: Option<DateTime<Utc>>,
}

/// Periodic control loop feeding due work into the orchestrator
pub struct MasterScheduler {
    poll_interval: Duration,
    dispatch_batch_size: usize,
    half_open_batch_size: usize,
    state: Mutex<CycleState>,
    /// Serializes cycles; held across the fetch
    cycle_lock: tokio::sync::Mutex<()>,
    source: Arc<dyn WorkSource>,
    orchestrator: WorkOrchestrator,
    publisher: EventPublisher,
}

impl std::fmt::Debug for MasterScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterScheduler")
            .field("poll_interval", &self.poll_interval)
            .field("dispatch_batch_size", &self.dispatch_batch_size)
            .field("state", &self.state.lock())
            .finish()
    }
}

impl MasterScheduler {
    pub fn new(
        scheduler: &SchedulerConfig,
        circuit_breaker: &CircuitBreakerConfig,
        source: Arc<dyn WorkSource>,
        orchestrator: WorkOrchestrator,
        publisher: EventPublisher,
    ) -> Self {
        let dispatch_batch_size = scheduler.dispatch_batch_size.max(1);
        Self {
            poll_interval: scheduler.poll_interval(),
            dispatch_batch_size,
            half_open_batch_size: scheduler.half_open_batch_size.clamp(1, dispatch_batch_size),
            state: Mutex::new(CycleState {
                circuit: SchedulerCircuit::new(
                    circuit_breaker.failure_threshold,
                    circuit_breaker.cooldown(),
                ),
                last_cycle_at: None,
            }),
            cycle_lock: tokio::sync::Mutex::new(()),
            source,
            orchestrator,
            publisher,
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.state.lock();
        SchedulerStatus {
            circuit_state: state.circuit.state(),
            consecutive_failures: state.circuit.consecutive_failures(),
            failure_threshold: state.circuit.failure_threshold(),
            last_cycle_at: state.last_cycle_at,
            poll_interval_ms: self.poll_interval.as_millis() as u64,
            dispatch_batch_size: self.dispatch_batch_size,
            half_open_batch_size: self.half_open_batch_size,
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.state.lock().circuit.state()
    }

    /// Run one scheduling cycle
    ///
    /// Closed fetches a full batch; HalfOpen fetches a reduced trial batch;
    /// Open skips until the cooldown has elapsed.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let _cycle = self.cycle_lock.lock().await;
        let started = Instant::now();

        let (circuit_state, batch_size) = {
            let mut state = self.state.lock();
            state.last_cycle_at = Some(Utc::now());
            let transition = state.circuit.poll(started);
            let circuit_state = state.circuit.state();
            if let Some(transition) = transition {
                self.publish_transition(transition);
            }

            match circuit_state {
                CircuitState::Open => {
                    let remaining = state
                        .circuit
                        .cooldown_remaining(started)
                        .unwrap_or_default();
                    debug!(
                        cooldown_remaining_ms = remaining.as_millis() as u64,
                        "Scheduler circuit open, skipping cycle"
                    );
                    return CycleOutcome::Skipped {
                        cooldown_remaining_ms: remaining.as_millis() as u64,
                    };
                }
                CircuitState::HalfOpen => (circuit_state, self.half_open_batch_size),
                CircuitState::Closed => (circuit_state, self.dispatch_batch_size),
            }
        };

        let fetched = self.source.fetch_ready(batch_size).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match fetched {
            Ok(items) => {
                let fetched = items.len();
                let mut requests: Vec<DispatchRequest> = items
                    .into_iter()
                    .take(batch_size)
                    .map(ReadyWorkItem::into_request)
                    .collect();
                sort_by_urgency(&mut requests);

                let (mut activated, mut queued, mut rejected) = (0, 0, 0);
                for request in requests {
                    match self.orchestrator.dispatch(request) {
                        Admission::Activated => activated += 1,
                        Admission::Queued => queued += 1,
                        Admission::Rejected => rejected += 1,
                    }
                }

                let transition = self.state.lock().circuit.record_success();
                if let Some(transition) = transition {
                    self.publish_transition(transition);
                }

                log_scheduler_cycle(
                    &circuit_state.to_string(),
                    fetched,
                    activated,
                    queued,
                    duration_ms,
                );
                self.publisher.publish(
                    events::SCHEDULER_CYCLE_COMPLETED,
                    json!({
                        "circuit_state": circuit_state,
                        "fetched": fetched,
                        "activated": activated,
                        "queued": queued,
                        "duration_ms": duration_ms,
                    }),
                );

                CycleOutcome::Completed {
                    circuit_state,
                    fetched,
                    activated,
                    queued,
                    rejected,
                }
            }
            Err(error) => {
                log_error(
                    "master_scheduler",
                    "fetch_ready",
                    &error.to_string(),
                    Some(&format!("circuit_state={circuit_state}")),
                );

                let transition = self.state.lock().circuit.record_failure(Instant::now());
                if let Some(transition) = transition {
                    self.publish_transition(transition);
                }

                CycleOutcome::Failed {
                    circuit_state,
                    error: error.to_string(),
                }
            }
        }
    }

    /// Poll on the configured interval until `shutdown` flips to true
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            dispatch_batch_size = self.dispatch_batch_size,
            "🚀 SCHEDULER: Starting periodic loop"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("🛑 SCHEDULER: Periodic loop stopped");
    }

    fn publish_transition(&self, transition: CircuitTransition) {
        let event_name = match transition.to {
            CircuitState::Open => events::CIRCUIT_OPENED,
            CircuitState::HalfOpen => events::CIRCUIT_HALF_OPENED,
            CircuitState::Closed => events::CIRCUIT_CLOSED,
        };
        self.publisher.publish(
            event_name,
            json!({ "from": transition.from, "to": transition.to }),
        );
    }
}
