//! Manual continuation: resuming a suspended activity with caller output.

use serde_json::Value;
use tracing::{info, instrument};

use crate::api::{ContinueWorkflowRequest, ContinueWorkflowResponse};
use crate::context::ContextTree;
use crate::error::{EngineError, Result};
use crate::models::ActivityStatus;

use super::WorkflowEngine;

impl WorkflowEngine {
    /// Resume a suspended manual activity by supplying its output.
    ///
    /// The output is applied exactly as an executor's output would be: the
    /// activity completes, the value lands in the context at the canonical
    /// slot, and the template's output mapping (if any) is merged alongside.
    /// The named activity must belong to the named workflow and be
    /// non-terminal.
    #[instrument(skip(self, request), fields(workflow_id = %request.workflow_id, activity_id = %request.activity_id))]
    pub async fn continue_workflow(
        &self,
        request: ContinueWorkflowRequest,
    ) -> Result<ContinueWorkflowResponse> {
        let activity = self.load_activity(request.activity_id).await?;
        let stage = self.load_stage(activity.stage_id).await?;
        if stage.workflow_id != request.workflow_id {
            return Err(EngineError::IllegalState {
                message: format!(
                    "activity {} does not belong to workflow {}",
                    activity.id, request.workflow_id
                ),
            });
        }
        if activity.status.is_terminal() {
            return Err(EngineError::IllegalState {
                message: format!(
                    "activity {} is already {:?}",
                    activity.id, activity.status
                ),
            });
        }

        let output: Value = serde_json::from_str(&request.output_json).map_err(|e| {
            EngineError::ValidationFailed {
                message: format!("continuation output is not valid JSON: {}", e),
            }
        })?;

        let workflow = self.load_workflow(request.workflow_id).await?;
        let mut context = ContextTree::from_json(&workflow.context_json)?;
        let template = self
            .templates()
            .get_activity_template(activity.activity_template_id)
            .await?;

        let mut activity = activity;
        activity.status = ActivityStatus::Completed;
        activity.output_data_json = Some(serde_json::to_string(&output)?);
        let activity = self.activities.update(activity).await?;

        self.fold_activity_result(workflow, &mut context, &activity, &template, None, &output)
            .await?;

        info!(activity = %template.name, "manual activity continued");
        Ok(ContinueWorkflowResponse {
            workflow_id: request.workflow_id,
            activity_id: activity.id,
        })
    }
}
