//! Test data builders for contract files, stage runners and work sources.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use venture_pipeline::config::{
    CircuitBreakerConfig, ContractsConfig, EventsConfig, OrchestratorConfig, PipelineConfig,
    RouterConfig, SchedulerConfig,
};
use venture_pipeline::contracts::{EnforcementMode, StageContractRegistry};
use venture_pipeline::pipeline::{StageContext, StageRunner};
use venture_pipeline::scheduler::{ReadyWorkItem, WorkSource};

/// Name of the field stage `n` produces in a [`ContractYamlBuilder`] chain
pub fn output_field(stage: u32) -> String {
    format!("stage_{stage}_output")
}

/// Builds a 25-stage contract file where each stage consumes its
/// predecessor's output field
pub struct ContractYamlBuilder {
    version: String,
    skip_stages: Vec<u32>,
    consumes: BTreeMap<u32, Vec<(u32, String, String)>>,
    extra_constraints: BTreeMap<u32, String>,
}

impl ContractYamlBuilder {
    pub fn new() -> Self {
        Self {
            version: "test-1.0.0".to_string(),
            skip_stages: Vec::new(),
            consumes: BTreeMap::new(),
            extra_constraints: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Leave a stage out of the file entirely
    pub fn without_stage(mut self, stage: u32) -> Self {
        self.skip_stages.push(stage);
        self
    }

    /// Replace a stage's consumes list with a single entry
    pub fn with_consumed(mut self, stage: u32, upstream: u32, field: &str, field_type: &str) -> Self {
        self.consumes
            .insert(stage, vec![(upstream, field.to_string(), field_type.to_string())]);
        self
    }

    /// Append a raw `key: value` constraint to a stage's produced field
    pub fn with_constraint(mut self, stage: u32, constraint: &str) -> Self {
        self.extra_constraints.insert(stage, constraint.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut yaml = format!("version: \"{}\"\nstages:\n", self.version);
        for stage in 1..=25u32 {
            if self.skip_stages.contains(&stage) {
                continue;
            }
            yaml.push_str(&format!("  {stage}:\n    name: Stage {stage}\n"));

            let consumes = match self.consumes.get(&stage) {
                Some(entries) => entries.clone(),
                None if stage > 1 => vec![(stage - 1, output_field(stage - 1), "string".to_string())],
                None => Vec::new(),
            };
            if !consumes.is_empty() {
                yaml.push_str("    consumes:\n");
                for (upstream, field, field_type) in consumes {
                    yaml.push_str(&format!(
                        "      - {{ stage: {upstream}, field: {field}, type: {field_type} }}\n"
                    ));
                }
            }

            let extra = self
                .extra_constraints
                .get(&stage)
                .map(|constraint| format!(", {constraint}"))
                .unwrap_or_default();
            yaml.push_str(&format!(
                "    produces:\n      {}: {{ type: string, min_length: 3{extra} }}\n",
                output_field(stage)
            ));
        }
        yaml
    }

    pub fn registry(&self) -> Arc<StageContractRegistry> {
        Arc::new(
            StageContractRegistry::from_yaml_str(&self.build(), "builder")
                .expect("builder contracts should be valid"),
        )
    }
}

impl Default for ContractYamlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload for running `stage` with a valid predecessor output
pub fn stage_payload(work_item_id: &str, stage: u32) -> Value {
    let mut payload = json!({ "work_item_id": work_item_id, "stage": stage });
    if stage > 1 {
        payload["inputs"] = json!({
            (stage - 1).to_string(): { output_field(stage - 1): format!("output of stage {}", stage - 1) }
        });
    }
    payload
}

/// Stage runner that produces the chain field, optionally failing or
/// sleeping first
pub struct ScriptedRunner {
    delay: Option<Duration>,
    fail_with: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedRunner {
    pub fn succeeding() -> Self {
        Self {
            delay: None,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::succeeding()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::succeeding()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StageRunner for ScriptedRunner {
    async fn run(&self, context: &StageContext) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{message}");
        }
        Ok(json!({ output_field(context.stage): format!("output of stage {}", context.stage) }))
    }
}

/// Work source backed by a queue of scripted fetch results
pub struct InMemoryWorkSource {
    script: Mutex<VecDeque<anyhow::Result<Vec<ReadyWorkItem>>>>,
    pub limits: Mutex<Vec<usize>>,
}

impl InMemoryWorkSource {
    pub fn empty() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn scripted(script: Vec<anyhow::Result<Vec<ReadyWorkItem>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            limits: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, result: anyhow::Result<Vec<ReadyWorkItem>>) {
        self.script.lock().push_back(result);
    }

    pub fn fetch_count(&self) -> usize {
        self.limits.lock().len()
    }
}

#[async_trait]
impl WorkSource for InMemoryWorkSource {
    async fn fetch_ready(&self, limit: usize) -> anyhow::Result<Vec<ReadyWorkItem>> {
        self.limits.lock().push(limit);
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Configuration tuned for fast tests
pub fn test_config(max_concurrent: usize) -> PipelineConfig {
    PipelineConfig {
        scheduler: SchedulerConfig {
            poll_interval_seconds: 1,
            dispatch_batch_size: 4,
            half_open_batch_size: 1,
        },
        orchestrator: OrchestratorConfig { max_concurrent },
        router: RouterConfig {
            handler_timeout_ms: 500,
        },
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown_seconds: 1,
        },
        contracts: ContractsConfig {
            path: "config/stage_contracts.yaml".into(),
            enforcement: EnforcementMode::Strict,
        },
        events: EventsConfig {
            channel_capacity: 256,
        },
    }
}
