//! # Pipeline Configuration System
//!
//! Layered configuration for the venture pipeline: a base YAML file, an optional
//! environment overlay, then `VENTURE__`-prefixed environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use venture_pipeline::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//!
//! let poll_interval = manager.config().scheduler.poll_interval();
//! let max_concurrent = manager.config().orchestrator.max_concurrent;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::contracts::EnforcementMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/base.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Master scheduler polling and batching
    pub scheduler: SchedulerConfig,

    /// Admission control for the work orchestrator
    pub orchestrator: OrchestratorConfig,

    /// Event router handler settings
    pub router: RouterConfig,

    /// Circuit breaker wrapped around each scheduling cycle
    pub circuit_breaker: CircuitBreakerConfig,

    /// Stage contract source and enforcement
    pub contracts: ContractsConfig,

    /// Lifecycle event channel
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_interval_seconds: u64,
    pub dispatch_batch_size: usize,
    /// Batch size for the single trial cycle while half-open
    pub half_open_batch_size: usize,
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 30,
            dispatch_batch_size: 10,
            half_open_batch_size: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub max_concurrent: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_concurrent: 5 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    pub handler_timeout_ms: u64,
}

impl RouterConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            handler_timeout_ms: 30_000,
        }
    }
}

/// Scheduler circuit breaker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failing cycles before the circuit opens
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before a half-open trial
    pub cooldown_seconds: u64,
}

impl CircuitBreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractsConfig {
    pub path: PathBuf,
    pub enforcement: EnforcementMode,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("config/stage_contracts.yaml"),
            enforcement: EnforcementMode::Strict,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
        }
    }
}

impl PipelineConfig {
    /// Reject values that would stall or disable the pipeline
    pub fn validate(&self) -> ConfigResult<()> {
        let checks: [(&str, u64); 7] = [
            (
                "scheduler.poll_interval_seconds",
                self.scheduler.poll_interval_seconds,
            ),
            (
                "scheduler.dispatch_batch_size",
                self.scheduler.dispatch_batch_size as u64,
            ),
            (
                "scheduler.half_open_batch_size",
                self.scheduler.half_open_batch_size as u64,
            ),
            (
                "orchestrator.max_concurrent",
                self.orchestrator.max_concurrent as u64,
            ),
            ("router.handler_timeout_ms", self.router.handler_timeout_ms),
            (
                "circuit_breaker.failure_threshold",
                u64::from(self.circuit_breaker.failure_threshold),
            ),
            (
                "circuit_breaker.cooldown_seconds",
                self.circuit_breaker.cooldown_seconds,
            ),
        ];

        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigurationError::validation(
                    field,
                    "must be greater than 0",
                ));
            }
        }

        if self.scheduler.half_open_batch_size > self.scheduler.dispatch_batch_size {
            return Err(ConfigurationError::invalid_value(
                "scheduler.half_open_batch_size",
                self.scheduler.half_open_batch_size.to_string(),
                "must not exceed scheduler.dispatch_batch_size",
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::validation(
                "events.channel_capacity",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}
