use super::types::{
    FilterAction, FilterDecision, StageContext, StagePayload, StageResult, StageStatus,
};
use crate::constants::stages::LAST_STAGE;
use crate::contracts::{EnforcementMode, StageContractRegistry};
use crate::models::DispatchRequest;
use crate::routing::EventHandler;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Caller-supplied stage work, run between pre- and post-validation
///
/// May run arbitrarily long; the router's handler timeout bounds it.
#[async_trait]
pub trait StageRunner: Send + Sync + 'static {
    async fn run(&self, context: &StageContext) -> anyhow::Result<Value>;
}

/// Downstream decision step consulted after a stage produces output
#[async_trait]
pub trait DecisionFilter: Send + Sync + 'static {
    async fn evaluate(&self, context: &StageContext, output: &Value)
        -> anyhow::Result<FilterDecision>;
}

/// Filter that always lets the pipeline advance
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoProceedFilter;

#[async_trait]
impl DecisionFilter for AutoProceedFilter {
    async fn evaluate(
        &self,
        _context: &StageContext,
        _output: &Value,
    ) -> anyhow::Result<FilterDecision> {
        Ok(FilterDecision::auto_proceed())
    }
}

/// The standard handler for stage work
///
/// Validates inputs against the stage contract, runs the stage, validates
/// the output, then asks the decision filter whether the pipeline may
/// advance. Runner errors propagate so the router dead-letters them.
pub struct StageExecutor {
    registry: Arc<StageContractRegistry>,
    enforcement: EnforcementMode,
    runner: Arc<dyn StageRunner>,
    filter: Arc<dyn DecisionFilter>,
    /// Completed results keyed by `(work_item_id, idempotency_key)`
    completed: DashMap<(String, String), StageResult>,
}

impl std::fmt::Debug for StageExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageExecutor")
            .field("contract_version", &self.registry.version())
            .field("enforcement", &self.enforcement)
            .field("cached_results", &self.completed.len())
            .finish()
    }
}

impl StageExecutor {
    pub fn new(
        registry: Arc<StageContractRegistry>,
        enforcement: EnforcementMode,
        runner: Arc<dyn StageRunner>,
        filter: Arc<dyn DecisionFilter>,
    ) -> Self {
        Self {
            registry,
            enforcement,
            runner,
            filter,
            completed: DashMap::new(),
        }
    }

    pub fn cached_results(&self) -> usize {
        self.completed.len()
    }

    /// Execute one stage for one work item
    pub async fn execute(
        &self,
        work_item_id: &str,
        payload: StagePayload,
    ) -> anyhow::Result<StageResult> {
        let cache_key = payload
            .idempotency_key
            .as_ref()
            .map(|key| (work_item_id.to_string(), key.clone()));
        let cached = cache_key
            .as_ref()
            .and_then(|key| self.completed.get(key).map(|entry| entry.clone()));
        if let Some(cached) = cached {
            info!(
                work_item_id = %work_item_id,
                stage = payload.stage,
                idempotency_key = payload.idempotency_key.as_deref().unwrap_or_default(),
                "♻️ STAGE: Idempotent hit, returning cached result"
            );
            return Ok(cached);
        }

        let started_at = Utc::now();
        let context = StageContext {
            work_item_id: work_item_id.to_string(),
            stage: payload.stage,
            stage_name: self
                .registry
                .get(payload.stage)
                .map(|contract| contract.name.clone())
                .unwrap_or_default(),
            inputs: payload.inputs,
            correlation_id: Uuid::new_v4(),
        };

        let pre_violations = self
            .registry
            .validate_pre_stage(context.stage, &context.inputs);
        if !pre_violations.is_empty() {
            warn!(
                work_item_id = %work_item_id,
                stage = context.stage,
                violations = pre_violations.len(),
                enforcement = ?self.enforcement,
                "⚠️ STAGE: Pre-stage contract violations"
            );
            if self.enforcement == EnforcementMode::Strict {
                return Ok(StageResult {
                    work_item_id: context.work_item_id,
                    stage: context.stage,
                    stage_name: context.stage_name,
                    status: StageStatus::Blocked,
                    pre_violations,
                    post_violations: Vec::new(),
                    decision: None,
                    next_stage: None,
                    output: None,
                    correlation_id: context.correlation_id,
                    started_at,
                    completed_at: Utc::now(),
                });
            }
        }

        debug!(
            work_item_id = %work_item_id,
            stage = context.stage,
            correlation_id = %context.correlation_id,
            "Running stage"
        );
        let output = self.runner.run(&context).await?;

        let post_violations = self.registry.validate_post_stage(context.stage, &output);
        let decision = if !post_violations.is_empty() && self.enforcement == EnforcementMode::Strict
        {
            warn!(
                work_item_id = %work_item_id,
                stage = context.stage,
                violations = post_violations.len(),
                "⚠️ STAGE: Output violates stage contract, review required"
            );
            FilterDecision::require_review(
                post_violations.iter().map(|violation| violation.message()).collect(),
            )
        } else {
            match self.filter.evaluate(&context, &output).await {
                Ok(decision) => decision,
                Err(error) => {
                    warn!(
                        work_item_id = %work_item_id,
                        stage = context.stage,
                        error = %error,
                        "Decision filter failed, review required"
                    );
                    FilterDecision::require_review(vec![format!("Filter error: {error}")])
                }
            }
        };

        let next_stage = (decision.action == FilterAction::AutoProceed
            && context.stage < LAST_STAGE)
            .then_some(context.stage + 1);

        info!(
            work_item_id = %work_item_id,
            stage = context.stage,
            decision = %decision.action,
            next_stage = ?next_stage,
            post_violations = post_violations.len(),
            "✅ STAGE: Completed"
        );

        let result = StageResult {
            work_item_id: context.work_item_id,
            stage: context.stage,
            stage_name: context.stage_name,
            status: StageStatus::Completed,
            pre_violations,
            post_violations,
            decision: Some(decision),
            next_stage,
            output: Some(output),
            correlation_id: context.correlation_id,
            started_at,
            completed_at: Utc::now(),
        };

        if let Some(key) = cache_key {
            self.completed.insert(key, result.clone());
        }
        Ok(result)
    }
}

#[async_trait]
impl EventHandler for StageExecutor {
    fn name(&self) -> &str {
        "stage_executor"
    }

    async fn handle(&self, request: &DispatchRequest) -> anyhow::Result<Value> {
        let payload = StagePayload::parse(&request.payload)?;
        let result = self.execute(&request.work_item_id, payload).await?;
        Ok(serde_json::to_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ViolationKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CONTRACTS: &str = r#"
version: "test"
stages:
  1:
    name: Idea Hydration
    produces:
      summary: { type: string, min_length: 5 }
  2:
    name: Scoring
    consumes:
      - { stage: 1, field: summary, type: string }
    produces:
      score: { type: number, minimum: 0, maximum: 10 }
"#;

    fn registry() -> Arc<StageContractRegistry> {
        let mut yaml = CONTRACTS.to_string();
        for stage in 3..=25 {
            yaml.push_str(&format!(
                "  {stage}:\n    name: Stage {stage}\n    produces:\n      done: {{ type: boolean }}\n"
            ));
        }
        Arc::new(StageContractRegistry::from_yaml_str(&yaml, "test").unwrap())
    }

    struct CountingRunner {
        output: Value,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StageRunner for CountingRunner {
        async fn run(&self, _context: &StageContext) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    struct FixedFilter(FilterAction);

    #[async_trait]
    impl DecisionFilter for FixedFilter {
        async fn evaluate(
            &self,
            _context: &StageContext,
            _output: &Value,
        ) -> anyhow::Result<FilterDecision> {
            Ok(FilterDecision {
                action: self.0,
                reasons: vec!["fixed".to_string()],
            })
        }
    }

    fn executor(
        output: Value,
        enforcement: EnforcementMode,
        filter: Arc<dyn DecisionFilter>,
    ) -> (StageExecutor, Arc<CountingRunner>) {
        let runner = Arc::new(CountingRunner {
            output,
            calls: AtomicUsize::new(0),
        });
        let executor = StageExecutor::new(registry(), enforcement, runner.clone(), filter);
        (executor, runner)
    }

    #[tokio::test]
    async fn test_auto_proceed_sets_next_stage() {
        let (executor, _) = executor(
            json!({"score": 7}),
            EnforcementMode::Strict,
            Arc::new(AutoProceedFilter),
        );
        let payload = StagePayload::parse(&json!({
            "stage": 2,
            "inputs": { "1": { "summary": "a marketplace for boats" } }
        }))
        .unwrap();

        let result = executor.execute("v-1", payload).await.unwrap();

        assert_eq!(result.status, StageStatus::Completed);
        assert_eq!(result.stage_name, "Scoring");
        assert_eq!(result.next_stage, Some(3));
        assert!(result.post_violations.is_empty());
    }

    #[tokio::test]
    async fn test_strict_mode_blocks_without_running() {
        let (executor, runner) = executor(
            json!({"score": 7}),
            EnforcementMode::Strict,
            Arc::new(AutoProceedFilter),
        );
        let payload = StagePayload::parse(&json!({ "stage": 2, "inputs": {} })).unwrap();

        let result = executor.execute("v-1", payload).await.unwrap();

        assert!(result.is_blocked());
        assert_eq!(result.pre_violations.len(), 1);
        assert_eq!(result.pre_violations[0].source_stage, Some(1));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_advisory_mode_runs_despite_violations() {
        let (executor, runner) = executor(
            json!({"score": 7}),
            EnforcementMode::Advisory,
            Arc::new(AutoProceedFilter),
        );
        let payload = StagePayload::parse(&json!({ "stage": 2 })).unwrap();

        let result = executor.execute("v-1", payload).await.unwrap();

        assert_eq!(result.status, StageStatus::Completed);
        assert!(!result.pre_violations.is_empty());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_post_violations_are_reported_and_require_review() {
        let (executor, _) = executor(
            json!({"score": 42}),
            EnforcementMode::Strict,
            Arc::new(AutoProceedFilter),
        );
        let payload = StagePayload::parse(&json!({
            "stage": 2,
            "inputs": { "1": { "summary": "a marketplace for boats" } }
        }))
        .unwrap();

        let result = executor.execute("v-1", payload).await.unwrap();

        assert_eq!(result.status, StageStatus::Completed);
        assert_eq!(result.output, Some(json!({"score": 42})));
        assert!(matches!(
            result.post_violations[0].kind,
            ViolationKind::ConstraintViolated { .. }
        ));
        assert_eq!(
            result.decision.unwrap().action,
            FilterAction::RequireReview
        );
        assert_eq!(result.next_stage, None);
    }

    #[tokio::test]
    async fn test_review_and_stop_are_relayed() {
        for action in [FilterAction::RequireReview, FilterAction::Stop] {
            let (executor, _) = executor(
                json!({"summary": "hydrated idea"}),
                EnforcementMode::Strict,
                Arc::new(FixedFilter(action)),
            );
            let payload = StagePayload::parse(&json!({ "stage": 1 })).unwrap();

            let result = executor.execute("v-1", payload).await.unwrap();

            let decision = result.decision.unwrap();
            assert_eq!(decision.action, action);
            assert_eq!(decision.reasons, vec!["fixed".to_string()]);
            assert_eq!(result.next_stage, None);
        }
    }

    #[tokio::test]
    async fn test_last_stage_never_advances() {
        let (executor, _) = executor(
            json!({"done": true}),
            EnforcementMode::Advisory,
            Arc::new(AutoProceedFilter),
        );
        let payload = StagePayload::parse(&json!({ "stage": 25 })).unwrap();

        let result = executor.execute("v-1", payload).await.unwrap();

        assert_eq!(result.decision.unwrap().action, FilterAction::AutoProceed);
        assert_eq!(result.next_stage, None);
    }

    #[tokio::test]
    async fn test_idempotency_key_returns_cached_result() {
        let (executor, runner) = executor(
            json!({"summary": "hydrated idea"}),
            EnforcementMode::Strict,
            Arc::new(AutoProceedFilter),
        );
        let payload = json!({ "stage": 1, "idempotency_key": "v-1:1" });

        let first = executor
            .execute("v-1", StagePayload::parse(&payload).unwrap())
            .await
            .unwrap();
        let second = executor
            .execute("v-1", StagePayload::parse(&payload).unwrap())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.cached_results(), 1);

        executor
            .execute("v-2", StagePayload::parse(&payload).unwrap())
            .await
            .unwrap();
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handler_rejects_malformed_payload() {
        let (executor, _) = executor(
            Value::Null,
            EnforcementMode::Strict,
            Arc::new(AutoProceedFilter),
        );
        let request = crate::triggers::build_dispatch_request("stage.completed", json!({}));

        let error = executor.handle(&request).await.unwrap_err();
        assert!(error.to_string().contains("stage"));
    }
}
