use thiserror::Error;

/// Startup integrity failures. All of them are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("Failed to read stage contracts from '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse stage contracts from {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("Stage contracts must cover stages 1-25: stage {stage} is missing")]
    MissingStage { stage: u32 },

    #[error("Stage {stage} is outside the pipeline (expected 1-25)")]
    UnexpectedStage { stage: u32 },

    #[error("Stage {stage} consumes '{field}' from unknown stage {upstream_stage}")]
    UnknownUpstreamStage {
        stage: u32,
        upstream_stage: u32,
        field: String,
    },

    #[error(
        "Stage {stage} consumes '{field}' from stage {upstream_stage}, which does not run earlier"
    )]
    ForwardReference {
        stage: u32,
        upstream_stage: u32,
        field: String,
    },

    #[error("Stage {stage} consumes '{field}' which stage {upstream_stage} does not produce")]
    MissingUpstreamField {
        stage: u32,
        upstream_stage: u32,
        field: String,
    },

    #[error(
        "Stage {stage} consumes '{field}' as {declared} but stage {upstream_stage} produces {produced}"
    )]
    TypeMismatch {
        stage: u32,
        upstream_stage: u32,
        field: String,
        declared: String,
        produced: String,
    },

    #[error("Stage {stage} declares unknown constraint '{key}' on produced field '{field}'")]
    UnknownConstraint {
        stage: u32,
        field: String,
        key: String,
    },
}

impl ContractError {
    /// Stage the error is attributed to, when there is one
    pub fn stage(&self) -> Option<u32> {
        match self {
            Self::Io { .. } | Self::Parse { .. } => None,
            Self::MissingStage { stage }
            | Self::UnexpectedStage { stage }
            | Self::UnknownUpstreamStage { stage, .. }
            | Self::ForwardReference { stage, .. }
            | Self::MissingUpstreamField { stage, .. }
            | Self::TypeMismatch { stage, .. }
            | Self::UnknownConstraint { stage, .. } => Some(*stage),
        }
    }
}
