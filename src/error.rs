//! Error types for the venture pipeline.
//!
//! Only startup integrity failures are fatal. Everything else recovers locally
//! and surfaces through the status interface or the dead-letter store.

use crate::config::ConfigurationError;
use crate::contracts::ContractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Stage contract error: {0}")]
    Contract(#[from] ContractError),
    #[error("Orchestration error: {0}")]
    Orchestration(String),
    #[error("Routing error: {0}")]
    Routing(String),
    #[error("Scheduler error: {0}")]
    Scheduler(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether the process must refuse to start when this error occurs
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Contract(_))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        PipelineError::Validation(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
