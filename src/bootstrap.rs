//! # Pipeline System Bootstrap
//!
//! Wires the components into one running system:
//!
//! ```text
//! WorkSource ─▶ MasterScheduler ─▶ WorkOrchestrator ─▶ EventRouter ─▶ StageExecutor
//!                                      ▲     ▲              │
//!               submit_trigger ────────┘     │              ├─fail─▶ DeadLetterStore
//!                                            └─advance──────┘ StageAdvancer on AUTO_PROCEED
//! ```
//!
//! Bootstrapping loads and integrity-checks the stage contracts first; any
//! contract or configuration error is fatal and no component is started.

use crate::config::{ConfigManager, PipelineConfig};
use crate::contracts::StageContractRegistry;
use crate::error::{PipelineError, Result};
use crate::events::{EventPublisher, PublishedEvent};
use crate::models::DeadLetterEntry;
use crate::orchestration::{Admission, OrchestratorStatus, WorkOrchestrator};
use crate::pipeline::{DecisionFilter, StageAdvancer, StageExecutor, StageRunner};
use crate::routing::{EventRouter, ReplayOutcome};
use crate::scheduler::{MasterScheduler, SchedulerStatus, WorkSource};
use crate::triggers::build_dispatch_request;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Response to an inbound trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAck {
    pub accepted: bool,
    /// Accepted but waiting for a concurrency slot
    pub queued: bool,
    pub request_id: Option<Uuid>,
}

/// Read-only snapshot for dashboards and health checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub circuit: SchedulerStatus,
    pub orchestrator: OrchestratorStatus,
    pub dead_letter_depth: usize,
    pub contract_version: String,
    pub scheduler_running: bool,
}

struct SchedulerTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Handle to a fully wired pipeline
pub struct PipelineSystem {
    config: PipelineConfig,
    registry: Arc<StageContractRegistry>,
    publisher: EventPublisher,
    router: Arc<EventRouter>,
    orchestrator: WorkOrchestrator,
    scheduler: Arc<MasterScheduler>,
    scheduler_task: Mutex<Option<SchedulerTask>>,
}

impl std::fmt::Debug for PipelineSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineSystem")
            .field("contract_version", &self.registry.version())
            .field("router", &self.router)
            .field("orchestrator", &self.orchestrator)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl PipelineSystem {
    /// Load contracts from `config.contracts.path` and wire every component
    pub fn bootstrap(
        config: PipelineConfig,
        runner: Arc<dyn StageRunner>,
        filter: Arc<dyn DecisionFilter>,
        work_source: Arc<dyn WorkSource>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = StageContractRegistry::load(&config.contracts.path)?;
        Self::bootstrap_with_registry(config, Arc::new(registry), runner, filter, work_source)
    }

    /// Bootstrap from a loaded [`ConfigManager`]
    pub fn from_config_manager(
        manager: &ConfigManager,
        runner: Arc<dyn StageRunner>,
        filter: Arc<dyn DecisionFilter>,
        work_source: Arc<dyn WorkSource>,
    ) -> Result<Self> {
        info!(
            environment = %manager.environment(),
            "🔧 BOOTSTRAP: Using environment configuration"
        );
        Self::bootstrap(manager.config().clone(), runner, filter, work_source)
    }

    /// Wire every component around an already loaded registry
    pub fn bootstrap_with_registry(
        config: PipelineConfig,
        registry: Arc<StageContractRegistry>,
        runner: Arc<dyn StageRunner>,
        filter: Arc<dyn DecisionFilter>,
        work_source: Arc<dyn WorkSource>,
    ) -> Result<Self> {
        config.validate()?;
        if !registry.is_complete() {
            return Err(PipelineError::Internal(format!(
                "stage contract registry holds {} stages",
                registry.len()
            )));
        }

        let publisher = EventPublisher::from_config(&config.events);
        let router = Arc::new(EventRouter::new(
            config.router.handler_timeout(),
            publisher.clone(),
        ));
        let executor = Arc::new(StageExecutor::new(
            Arc::clone(&registry),
            config.contracts.enforcement,
            runner,
            filter,
        ));
        router.register_for_all(executor);

        let orchestrator = WorkOrchestrator::with_completion_handler(
            config.orchestrator.max_concurrent,
            Arc::clone(&router),
            publisher.clone(),
            Arc::new(StageAdvancer),
        );
        let scheduler = Arc::new(MasterScheduler::new(
            &config.scheduler,
            &config.circuit_breaker,
            work_source,
            orchestrator.clone(),
            publisher.clone(),
        ));

        info!(
            contract_version = %registry.version(),
            max_concurrent = config.orchestrator.max_concurrent,
            handler_timeout_ms = config.router.handler_timeout_ms,
            enforcement = ?config.contracts.enforcement,
            "✅ BOOTSTRAP: Pipeline system wired"
        );

        Ok(Self {
            config,
            registry,
            publisher,
            router,
            orchestrator,
            scheduler,
            scheduler_task: Mutex::new(None),
        })
    }

    /// Inbound trigger interface: classify, build a request, and dispatch it
    pub fn submit_trigger(&self, event_name: &str, payload: Value) -> TriggerAck {
        let request = build_dispatch_request(event_name, payload);
        let request_id = request.id;

        match self.orchestrator.dispatch(request) {
            Admission::Activated => TriggerAck {
                accepted: true,
                queued: false,
                request_id: Some(request_id),
            },
            Admission::Queued => TriggerAck {
                accepted: true,
                queued: true,
                request_id: Some(request_id),
            },
            Admission::Rejected => TriggerAck {
                accepted: false,
                queued: false,
                request_id: None,
            },
        }
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            circuit: self.scheduler.status(),
            orchestrator: self.orchestrator.get_status(),
            dead_letter_depth: self.router.dead_letters().depth(),
            contract_version: self.registry.version().to_string(),
            scheduler_running: self.is_scheduler_running(),
        }
    }

    /// Operator-initiated replay of one dead-letter entry
    pub async fn replay_dead_letter(&self, id: Uuid) -> ReplayOutcome {
        self.router.replay_dead_letter(id).await
    }

    pub fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.router.dead_letters().list()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.publisher.subscribe()
    }

    /// Start the periodic scheduling loop on its own task
    pub fn start_scheduler(&self) -> Result<()> {
        let mut task = self.scheduler_task.lock();
        if task.is_some() {
            return Err(PipelineError::Scheduler(
                "scheduler is already running".to_string(),
            ));
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(&self.scheduler).run(shutdown_rx));
        *task = Some(SchedulerTask { shutdown, handle });
        Ok(())
    }

    pub fn is_scheduler_running(&self) -> bool {
        self.scheduler_task.lock().is_some()
    }

    /// Stop the scheduler, refuse new triggers, and drain in-flight work
    pub async fn shutdown(&self) -> Result<()> {
        info!("🛑 SHUTDOWN: Stopping pipeline system");
        let task = self.scheduler_task.lock().take();
        if let Some(task) = task {
            let _ = task.shutdown.send(true);
            task.handle.await.map_err(|e| {
                PipelineError::Scheduler(format!("scheduler task failed: {e}"))
            })?;
        } else {
            warn!("Scheduler was not running");
        }

        self.orchestrator.close();
        self.orchestrator.wait_for_idle().await;
        info!("✅ SHUTDOWN: Pipeline system drained");
        Ok(())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<StageContractRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    pub fn orchestrator(&self) -> &WorkOrchestrator {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &Arc<MasterScheduler> {
        &self.scheduler
    }
}
