#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Venture Pipeline
//!
//! Event-driven orchestration engine that advances long-lived work items
//! ("ventures") through a fixed 25-stage pipeline.
//!
//! ## Architecture
//!
//! Data flows one way in steady state and one way for recovery. A stage that
//! auto-proceeds feeds its successor back into the orchestrator:
//!
//! ```text
//! steady state:  MasterScheduler ─▶ WorkOrchestrator ─▶ EventRouter ─▶ handler
//! advance:       StageResult ─▶ StageAdvancer ─▶ WorkOrchestrator (next stage)
//! recovery:      failed event ─▶ DeadLetterStore ─▶ operator replay ─▶ EventRouter
//! ```
//!
//! The stage contract registry is consulted synchronously by whatever executes
//! a stage, independent of which trigger channel started it.
//!
//! ## Module Organization
//!
//! - [`triggers`] - Classification of inbound events into Event, Round and PriorityQueue
//! - [`contracts`] - Typed pre/post-conditions between the 25 stages
//! - [`routing`] - Handler dispatch, dead-letter store and replay
//! - [`orchestration`] - Bounded concurrency with an urgency-ordered pending queue
//! - [`scheduler`] - Periodic control loop wrapped in a circuit breaker
//! - [`pipeline`] - The stage executor handler and its collaborators
//! - [`bootstrap`] - Wiring everything into a [`PipelineSystem`]
//! - [`config`] - YAML configuration with environment overrides
//! - [`error`] - Structured error handling
//! - [`events`] - Lifecycle event broadcasting
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//! use venture_pipeline::config::ConfigManager;
//! use venture_pipeline::pipeline::{AutoProceedFilter, StageContext, StageRunner};
//! use venture_pipeline::scheduler::{ReadyWorkItem, WorkSource};
//! use venture_pipeline::PipelineSystem;
//!
//! struct Runner;
//!
//! #[async_trait]
//! impl StageRunner for Runner {
//!     async fn run(&self, context: &StageContext) -> anyhow::Result<Value> {
//!         Ok(json!({ "stage": context.stage }))
//!     }
//! }
//!
//! struct NothingDue;
//!
//! #[async_trait]
//! impl WorkSource for NothingDue {
//!     async fn fetch_ready(&self, _limit: usize) -> anyhow::Result<Vec<ReadyWorkItem>> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let system = PipelineSystem::from_config_manager(
//!     &manager,
//!     Arc::new(Runner),
//!     Arc::new(AutoProceedFilter),
//!     Arc::new(NothingDue),
//! )?;
//!
//! system.start_scheduler()?;
//! let ack = system.submit_trigger("gate.evaluated", json!({ "venture_id": "v-1", "stage": 1 }));
//! println!("accepted: {}", ack.accepted);
//! system.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod pipeline;
pub mod routing;
pub mod scheduler;
pub mod triggers;

pub use bootstrap::{PipelineSystem, SystemStatus, TriggerAck};
pub use config::{ConfigManager, PipelineConfig};
pub use contracts::{ContractError, ContractViolation, EnforcementMode, StageContractRegistry};
pub use error::{PipelineError, Result};
pub use models::{DeadLetterEntry, DispatchRequest, FailureReason};
pub use orchestration::{
    Admission, Completion, CompletionHandler, OrchestratorStatus, WorkOrchestrator,
};
pub use routing::{EventHandler, EventRouter, ReplayOutcome, RouteResult};
pub use scheduler::{CircuitState, MasterScheduler, SchedulerStatus};
pub use triggers::{build_dispatch_request, classify, TriggerClass};
