use super::types::{FilterAction, StageResult, StageStatus};
use crate::constants::triggers;
use crate::models::DispatchRequest;
use crate::orchestration::{Completion, CompletionHandler};
use crate::triggers::build_dispatch_request;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

/// Turns stage results into pipeline progress
///
/// A blocked stage marks the work item blocked. An `AUTO_PROCEED` decision
/// with a `next_stage` dispatches that stage as a `stage.completed` round,
/// carrying the previous inputs plus the output just produced. Anything else
/// (review, stop, last stage, non-stage output) finishes the item.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageAdvancer;

impl StageAdvancer {
    /// Build the request that runs `next_stage` after `result`
    pub fn follow_up(
        request: &DispatchRequest,
        result: &StageResult,
        next_stage: u32,
    ) -> DispatchRequest {
        let mut inputs = request
            .payload
            .get("inputs")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);
        inputs.insert(
            result.stage.to_string(),
            result.output.clone().unwrap_or(Value::Null),
        );

        build_dispatch_request(
            triggers::STAGE_COMPLETED,
            json!({
                "work_item_id": result.work_item_id,
                "stage": next_stage,
                "inputs": inputs,
                "previous_stage": result.stage,
                "correlation_id": result.correlation_id,
            }),
        )
    }
}

impl CompletionHandler for StageAdvancer {
    fn on_delivered(&self, request: &DispatchRequest, output: &Value) -> Completion {
        let Ok(result) = serde_json::from_value::<StageResult>(output.clone()) else {
            return Completion::Finished;
        };

        if result.status == StageStatus::Blocked {
            debug!(
                work_item_id = %result.work_item_id,
                stage = result.stage,
                "Stage blocked, not advancing"
            );
            return Completion::Blocked;
        }

        let auto_proceed = result
            .decision
            .as_ref()
            .is_some_and(|decision| decision.action == FilterAction::AutoProceed);
        match result.next_stage {
            Some(next_stage) if auto_proceed => {
                let next = Self::follow_up(request, &result, next_stage);
                info!(
                    work_item_id = %result.work_item_id,
                    stage = result.stage,
                    next_stage,
                    request_id = %next.id,
                    "⏭️ PIPELINE: Auto-advancing to next stage"
                );
                Completion::Advance(next)
            }
            _ => Completion::Finished,
        }
    }
}
