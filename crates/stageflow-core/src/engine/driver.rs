//! The run-to-completion driver: advance and execute in a loop until the
//! workflow terminates, suspends on a manual step, or exhausts its budget.

use tracing::{debug, instrument};

use crate::api::{
    AdvanceWorkflowRequest, ExecuteActivityRequest, GetWorkflowStatusRequest,
    RunToCompletionRequest, RunToCompletionResponse, StartWorkflowRequest,
};
use crate::context::ContextTree;
use crate::error::{EngineError, Result};
use crate::models::{Workflow, WorkflowStatus};
use crate::schema;

use super::WorkflowEngine;

impl WorkflowEngine {
    /// Start a workflow and drive it until it completes, blocks on a
    /// manual-class activity, or hits the iteration cap.
    ///
    /// Each loop turn performs exactly one advance or one activity
    /// execution, so the cap bounds repository work linearly. A workflow
    /// whose every activity has a registered automated executor and whose
    /// stage chain is finite terminates well within
    /// `stage_count × max_activities_per_stage` iterations.
    #[instrument(skip(self, request), fields(workflow_template_id = %request.workflow_template_id))]
    pub async fn run_to_completion(
        &self,
        request: RunToCompletionRequest,
    ) -> Result<RunToCompletionResponse> {
        let max_iterations = request
            .max_iterations
            .unwrap_or(self.config.max_iterations);

        let started = self
            .start_workflow(StartWorkflowRequest {
                workflow_template_id: request.workflow_template_id,
                input_json: request.input_json,
                workspace_id: request.workspace_id,
            })
            .await?;
        let workflow_id = started.workflow.id;

        let mut iterations = 0u32;
        loop {
            let status = self
                .workflow_status(GetWorkflowStatusRequest { workflow_id })
                .await?;
            if status.workflow.status == WorkflowStatus::Completed {
                return self.completion_response(status.workflow).await;
            }

            match status.pending_activity_id {
                None => {
                    let advanced = self
                        .advance_workflow(AdvanceWorkflowRequest { workflow_id })
                        .await?;
                    if advanced.workflow_completed {
                        let workflow = self.load_workflow(workflow_id).await?;
                        return self.completion_response(workflow).await;
                    }
                }
                Some(activity_id) => {
                    let activity = self.load_activity(activity_id).await?;
                    let template = self
                        .templates()
                        .get_activity_template(activity.activity_template_id)
                        .await?;
                    if template.activity_type.is_manual() {
                        debug!(%activity_id, activity = %template.name, "suspending on manual activity");
                        return Err(EngineError::SuspensionRequired { activity_id });
                    }
                    self.execute_activity(ExecuteActivityRequest {
                        activity_id,
                        workflow_id,
                    })
                    .await?;
                }
            }

            iterations += 1;
            if iterations >= max_iterations {
                return Err(EngineError::IterationLimitExceeded {
                    limit: max_iterations,
                });
            }
        }
    }

    /// Shape the completed workflow's output: the template's output mapping
    /// applied to the final context, or the full context tree when the
    /// template declares none.
    async fn completion_response(&self, workflow: Workflow) -> Result<RunToCompletionResponse> {
        let context = ContextTree::from_json(&workflow.context_json)?;
        let template = self
            .templates()
            .get_workflow_template(workflow.workflow_template_id)
            .await?;

        let output = match &template.output_mapping {
            Some(mapping) => schema::resolve(context.as_value(), mapping)?,
            None => context.as_value().clone(),
        };

        Ok(RunToCompletionResponse { workflow, output })
    }
}
