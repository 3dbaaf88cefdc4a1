mod common;

use common::{output_field, ContractYamlBuilder};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use venture_pipeline::contracts::{ContractError, StageContractRegistry, ViolationKind};

#[test]
fn test_missing_upstream_field_fails_startup_naming_stage_and_field() {
    let yaml = ContractYamlBuilder::new()
        .with_consumed(2, 1, "market_size", "number")
        .build();

    let error = StageContractRegistry::from_yaml_str(&yaml, "broken.yaml").unwrap_err();

    assert_eq!(
        error,
        ContractError::MissingUpstreamField {
            stage: 2,
            upstream_stage: 1,
            field: "market_size".to_string(),
        }
    );
    let message = error.to_string();
    assert!(message.contains("Stage 2"));
    assert!(message.contains("market_size"));
}

#[test]
fn test_misspelt_constraint_fails_startup() {
    let yaml = ContractYamlBuilder::new()
        .with_constraint(8, "minLenght: 20")
        .build();

    let error = StageContractRegistry::from_yaml_str(&yaml, "typo.yaml").unwrap_err();

    assert_eq!(
        error,
        ContractError::UnknownConstraint {
            stage: 8,
            field: output_field(8),
            key: "minLenght".to_string(),
        }
    );
    assert!(error.to_string().contains("minLenght"));
}

#[test]
fn test_camel_case_constraint_aliases_are_not_unknown() {
    let yaml = ContractYamlBuilder::new()
        .with_constraint(8, "maxLength: 40")
        .build();

    let registry = StageContractRegistry::from_yaml_str(&yaml, "aliases.yaml").unwrap();
    let produced = &registry.get(8).unwrap().produces[&output_field(8)];

    assert_eq!(produced.constraints.max_length, Some(40));
    assert_eq!(produced.unknown_constraints().count(), 0);
}

#[test]
fn test_gap_in_stage_numbers_fails_startup() {
    let yaml = ContractYamlBuilder::new().without_stage(13).build();

    let error = StageContractRegistry::from_yaml_str(&yaml, "gappy.yaml").unwrap_err();

    // Stage 14 also consumes from 13, but the missing stage is reported first
    assert_eq!(error, ContractError::MissingStage { stage: 13 });
}

#[test]
fn test_type_mismatch_with_upstream_fails_startup() {
    let yaml = ContractYamlBuilder::new()
        .with_consumed(5, 4, &output_field(4), "integer")
        .build();

    let error = StageContractRegistry::from_yaml_str(&yaml, "typed.yaml").unwrap_err();

    assert!(matches!(
        error,
        ContractError::TypeMismatch { stage: 5, upstream_stage: 4, .. }
    ));
}

#[test]
fn test_forward_reference_fails_startup() {
    let yaml = ContractYamlBuilder::new()
        .with_consumed(3, 7, &output_field(7), "string")
        .build();

    let error = StageContractRegistry::from_yaml_str(&yaml, "forward.yaml").unwrap_err();

    assert_eq!(error.stage(), Some(3));
    assert!(matches!(error, ContractError::ForwardReference { .. }));
}

#[test]
fn test_integrity_report_lists_every_problem() {
    let yaml = ContractYamlBuilder::new()
        .with_consumed(2, 1, "missing_a", "string")
        .with_consumed(9, 8, "missing_b", "string")
        .without_stage(20)
        .build();
    let file: venture_pipeline::contracts::ContractFile = serde_yaml::from_str(&yaml).unwrap();

    let errors = StageContractRegistry::integrity_report(&file.stages);

    let stages: Vec<Option<u32>> = errors.iter().map(ContractError::stage).collect();
    assert_eq!(stages, vec![Some(20), Some(2), Some(9), Some(21)]);
}

#[test]
fn test_shipped_contract_file_is_complete_and_acyclic() {
    let registry =
        StageContractRegistry::load(Path::new("config/stage_contracts.yaml")).unwrap();

    assert!(registry.is_complete());
    assert_eq!(registry.len(), 25);
    for contract in registry.contracts() {
        for consumed in &contract.consumes {
            assert!(consumed.stage < contract.stage_number);
            assert!(registry
                .get(consumed.stage)
                .unwrap()
                .produces
                .contains_key(&consumed.field));
        }
    }
}

#[test]
fn test_unreadable_contract_file_is_an_io_error() {
    let error = StageContractRegistry::load(Path::new("config/does_not_exist.yaml")).unwrap_err();
    assert!(matches!(error, ContractError::Io { .. }));
}

#[test]
fn test_pre_and_post_validation_report_instead_of_failing() {
    let registry = ContractYamlBuilder::new().registry();

    let mut inputs = BTreeMap::new();
    inputs.insert(2, json!({ output_field(2): 42 }));
    let pre = registry.validate_pre_stage(3, &inputs);
    assert_eq!(pre.len(), 1);
    assert_eq!(
        pre[0].kind,
        ViolationKind::TypeMismatch {
            expected: "string".to_string(),
            actual: "integer".to_string(),
        }
    );

    let post = registry.validate_post_stage(3, &json!({ output_field(3): "ok" }));
    assert_eq!(post.len(), 1);
    assert!(matches!(
        &post[0].kind,
        ViolationKind::ConstraintViolated { constraint, .. } if constraint == "min_length"
    ));

    assert!(registry
        .validate_post_stage(3, &json!({ output_field(3): "plenty long" }))
        .is_empty());
    assert_eq!(
        registry.validate_pre_stage(26, &BTreeMap::new())[0].kind,
        ViolationKind::UnknownStage
    );
}
