use super::error::ContractError;
use super::types::{
    ContractFile, ContractViolation, FieldType, StageContract, StageDefinition, ViolationKind,
};
use crate::constants::stages::{FIRST_STAGE, LAST_STAGE, STAGE_COUNT};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Outputs of earlier stages, keyed by stage number
pub type StageInputs = BTreeMap<u32, Value>;

/// Read-only registry of the 25 stage contracts
///
/// Built once at startup; safe to share across threads without locking.
#[derive(Debug, Clone)]
pub struct StageContractRegistry {
    version: String,
    /// Indexed by `stage_number - 1`
    contracts: Vec<StageContract>,
}

impl StageContractRegistry {
    /// Load and integrity-check the contract file at `path`
    pub fn load(path: &Path) -> Result<Self, ContractError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ContractError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml_str(&contents, &path.display().to_string())
    }

    /// Parse and integrity-check contract YAML
    pub fn from_yaml_str(yaml: &str, source_name: &str) -> Result<Self, ContractError> {
        let file: ContractFile = serde_yaml::from_str(yaml).map_err(|e| ContractError::Parse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;
        let registry = Self::from_definitions(file.version, file.stages)?;

        info!(
            source = source_name,
            version = %registry.version,
            stages = registry.contracts.len(),
            "📜 Stage contracts loaded"
        );

        Ok(registry)
    }

    /// Build a registry from parsed stage definitions, failing on the first
    /// integrity error
    pub fn from_definitions(
        version: String,
        definitions: BTreeMap<u32, StageDefinition>,
    ) -> Result<Self, ContractError> {
        if let Some(error) = Self::integrity_report(&definitions).into_iter().next() {
            return Err(error);
        }

        let contracts = definitions
            .into_iter()
            .map(|(stage_number, definition)| StageContract {
                stage_number,
                name: definition.name,
                consumes: definition.consumes,
                produces: definition.produces,
            })
            .collect();

        Ok(Self { version, contracts })
    }

    /// Every integrity error in the definitions, in stage order
    pub fn integrity_report(definitions: &BTreeMap<u32, StageDefinition>) -> Vec<ContractError> {
        let mut errors: Vec<ContractError> = definitions
            .keys()
            .filter(|stage| !(FIRST_STAGE..=LAST_STAGE).contains(*stage))
            .map(|stage| ContractError::UnexpectedStage { stage: *stage })
            .collect();

        errors.extend(
            (FIRST_STAGE..=LAST_STAGE)
                .filter(|stage| !definitions.contains_key(stage))
                .map(|stage| ContractError::MissingStage { stage }),
        );

        for (stage, definition) in definitions {
            for consumed in &definition.consumes {
                let upstream_stage = consumed.stage;
                let field = consumed.field.clone();

                if upstream_stage >= *stage {
                    errors.push(ContractError::ForwardReference {
                        stage: *stage,
                        upstream_stage,
                        field,
                    });
                    continue;
                }

                let Some(upstream) = definitions.get(&upstream_stage) else {
                    errors.push(ContractError::UnknownUpstreamStage {
                        stage: *stage,
                        upstream_stage,
                        field,
                    });
                    continue;
                };

                match upstream.produces.get(&consumed.field) {
                    None => errors.push(ContractError::MissingUpstreamField {
                        stage: *stage,
                        upstream_stage,
                        field,
                    }),
                    Some(produced) if !produced.field_type.satisfies(consumed.field_type) => {
                        errors.push(ContractError::TypeMismatch {
                            stage: *stage,
                            upstream_stage,
                            field,
                            declared: consumed.field_type.to_string(),
                            produced: produced.field_type.to_string(),
                        })
                    }
                    Some(_) => {}
                }
            }

            for (field, produced) in &definition.produces {
                errors.extend(produced.unknown_constraints().map(|key| {
                    ContractError::UnknownConstraint {
                        stage: *stage,
                        field: field.clone(),
                        key: key.to_string(),
                    }
                }));
            }
        }

        errors
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, stage: u32) -> Option<&StageContract> {
        let index = usize::try_from(stage.checked_sub(FIRST_STAGE)?).ok()?;
        self.contracts.get(index)
    }

    pub fn contracts(&self) -> &[StageContract] {
        &self.contracts
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Whether the registry holds exactly one contract per pipeline stage
    pub fn is_complete(&self) -> bool {
        self.contracts.len() == STAGE_COUNT
    }

    /// Check every consumed field before a stage runs
    pub fn validate_pre_stage(&self, stage: u32, inputs: &StageInputs) -> Vec<ContractViolation> {
        let Some(contract) = self.get(stage) else {
            return vec![unknown_stage(stage)];
        };

        let mut violations = Vec::new();
        for consumed in &contract.consumes {
            let violation = |kind| ContractViolation {
                stage,
                field: consumed.field.clone(),
                source_stage: Some(consumed.stage),
                kind,
            };

            let Some(upstream_output) = inputs.get(&consumed.stage) else {
                if consumed.required {
                    violations.push(violation(ViolationKind::MissingUpstreamOutput));
                }
                continue;
            };

            match upstream_output.get(&consumed.field) {
                None | Some(Value::Null) => {
                    if consumed.required {
                        violations.push(violation(ViolationKind::MissingField));
                    }
                }
                Some(value) if !consumed.field_type.matches(value) => {
                    violations.push(violation(ViolationKind::TypeMismatch {
                        expected: consumed.field_type.to_string(),
                        actual: FieldType::describe(value).to_string(),
                    }));
                }
                Some(_) => {}
            }
        }

        debug!(
            stage = stage,
            violations = violations.len(),
            "Pre-stage contract validation"
        );
        violations
    }

    /// Check every produced field after a stage runs
    pub fn validate_post_stage(&self, stage: u32, output: &Value) -> Vec<ContractViolation> {
        let Some(contract) = self.get(stage) else {
            return vec![unknown_stage(stage)];
        };

        let Some(fields) = output.as_object() else {
            return vec![ContractViolation {
                stage,
                field: "*".to_string(),
                source_stage: None,
                kind: ViolationKind::NotAnObject,
            }];
        };

        let mut violations = Vec::new();
        for (name, produced) in &contract.produces {
            let violation = |kind| ContractViolation {
                stage,
                field: name.clone(),
                source_stage: None,
                kind,
            };

            match fields.get(name) {
                None | Some(Value::Null) => violations.push(violation(ViolationKind::MissingField)),
                Some(value) if !produced.field_type.matches(value) => {
                    violations.push(violation(ViolationKind::TypeMismatch {
                        expected: produced.field_type.to_string(),
                        actual: FieldType::describe(value).to_string(),
                    }));
                }
                Some(value) => {
                    for (constraint, detail) in produced.constraints.check(value) {
                        violations.push(violation(ViolationKind::ConstraintViolated {
                            constraint,
                            detail,
                        }));
                    }
                }
            }
        }

        debug!(
            stage = stage,
            violations = violations.len(),
            "Post-stage contract validation"
        );
        violations
    }
}

fn unknown_stage(stage: u32) -> ContractViolation {
    ContractViolation {
        stage,
        field: "*".to_string(),
        source_stage: None,
        kind: ViolationKind::UnknownStage,
    }
}
