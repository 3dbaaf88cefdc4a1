use crate::contracts::{ContractViolation, StageInputs};
use crate::error::{PipelineError, Result};
use crate::constants::stages::{FIRST_STAGE, LAST_STAGE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Decision returned by the downstream decision filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterAction {
    /// Pipeline may advance to the next stage on its own
    AutoProceed,
    RequireReview,
    Stop,
}

impl fmt::Display for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoProceed => write!(f, "AUTO_PROCEED"),
            Self::RequireReview => write!(f, "REQUIRE_REVIEW"),
            Self::Stop => write!(f, "STOP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDecision {
    pub action: FilterAction,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl FilterDecision {
    pub fn auto_proceed() -> Self {
        Self {
            action: FilterAction::AutoProceed,
            reasons: Vec::new(),
        }
    }

    pub fn require_review(reasons: Vec<String>) -> Self {
        Self {
            action: FilterAction::RequireReview,
            reasons,
        }
    }

    pub fn stop(reasons: Vec<String>) -> Self {
        Self {
            action: FilterAction::Stop,
            reasons,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    /// The stage ran (post-stage violations may still be reported)
    Completed,
    /// Pre-stage contract violations prevented the stage from running
    Blocked,
}

/// Everything a stage runner needs for one execution
#[derive(Debug, Clone, PartialEq)]
pub struct StageContext {
    pub work_item_id: String,
    pub stage: u32,
    pub stage_name: String,
    pub inputs: StageInputs,
    pub correlation_id: Uuid,
}

/// Outcome of one stage execution, returned as the handler output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub work_item_id: String,
    pub stage: u32,
    pub stage_name: String,
    pub status: StageStatus,
    pub pre_violations: Vec<ContractViolation>,
    pub post_violations: Vec<ContractViolation>,
    pub decision: Option<FilterDecision>,
    /// Set only when the decision is AUTO_PROCEED and a later stage exists
    pub next_stage: Option<u32>,
    pub output: Option<Value>,
    pub correlation_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl StageResult {
    pub fn is_blocked(&self) -> bool {
        self.status == StageStatus::Blocked
    }
}

/// Parsed form of a stage-execution payload
///
/// ```json
/// { "stage": 3, "inputs": { "1": {...}, "2": {...} }, "idempotency_key": "v-1:3" }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StagePayload {
    pub stage: u32,
    pub inputs: StageInputs,
    pub idempotency_key: Option<String>,
}

impl StagePayload {
    pub fn parse(payload: &Value) -> Result<Self> {
        let stage = payload
            .get("stage")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                PipelineError::Validation("payload requires an integer 'stage'".to_string())
            })?;
        let stage = u32::try_from(stage)
            .ok()
            .filter(|stage| (FIRST_STAGE..=LAST_STAGE).contains(stage))
            .ok_or_else(|| {
                PipelineError::Validation(format!(
                    "stage {stage} is outside {FIRST_STAGE}-{LAST_STAGE}"
                ))
            })?;

        let mut inputs = StageInputs::new();
        match payload.get("inputs") {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                for (key, value) in map {
                    let upstream: u32 = key.parse().map_err(|_| {
                        PipelineError::Validation(format!(
                            "input key '{key}' is not a stage number"
                        ))
                    })?;
                    inputs.insert(upstream, value.clone());
                }
            }
            Some(_) => {
                return Err(PipelineError::Validation(
                    "'inputs' must be an object keyed by stage number".to_string(),
                ))
            }
        }

        let idempotency_key = payload
            .get("idempotency_key")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Ok(Self {
            stage,
            inputs,
            idempotency_key,
        })
    }
}
