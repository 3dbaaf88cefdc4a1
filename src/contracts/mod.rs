//! # Stage Contract Registry
//!
//! Typed pre/post-conditions between the 25 pipeline stages, loaded once at
//! startup from a declarative YAML file.
//!
//! ## Contract File
//!
//! ```yaml
//! version: "1.0.0"
//! stages:
//!   1:
//!     name: Idea Hydration
//!     produces:
//!       problem_statement: { type: string, min_length: 20 }
//!   2:
//!     name: Multi-Persona Evaluation
//!     consumes:
//!       - { stage: 1, field: problem_statement, type: string }
//!     produces:
//!       persona_scores: { type: array, min_items: 1 }
//! ```
//!
//! ## Integrity
//!
//! Loading fails fast when a stage in `1..=25` is missing, when a `consumes`
//! entry references a stage that is not strictly earlier, or when the consumed
//! field is not produced upstream with a compatible type. A loaded registry is
//! therefore a directed acyclic dependency chain.
//!
//! ## Validation
//!
//! [`StageContractRegistry::validate_pre_stage`] and
//! [`StageContractRegistry::validate_post_stage`] return violation lists and
//! never fail, so callers choose between [`EnforcementMode::Strict`] and
//! [`EnforcementMode::Advisory`].

pub mod error;
pub mod registry;
pub mod types;

pub use error::ContractError;
pub use registry::{StageContractRegistry, StageInputs};
pub use types::{
    ConsumedField, ContractFile, ContractViolation, FieldConstraints, FieldType, ProducedField,
    StageContract, StageDefinition, ViolationKind,
};

use serde::{Deserialize, Serialize};

/// How contract violations are acted on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// Pre-stage violations block execution
    #[default]
    Strict,
    /// Violations are reported but never block
    Advisory,
}
