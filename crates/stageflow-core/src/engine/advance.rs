//! Stage progression: activity materialization, stage completion detection,
//! and the transition to the next stage or workflow completion.

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::api::{AdvanceWorkflowRequest, AdvanceWorkflowResponse};
use crate::error::{EngineError, Result};
use crate::models::{
    Activity, ActivityStatus, Stage, StageStatus, StageTemplate, Workflow, WorkflowStatus,
};

use super::WorkflowEngine;

impl WorkflowEngine {
    /// Drive a workflow's current stage one step forward.
    ///
    /// On the first visit to a stage its activities are materialized from
    /// the activity templates and the call returns immediately; the caller
    /// is expected to execute them. Once every activity is terminal the
    /// stage is closed and the successor stage (template `order_index + 1`)
    /// is created, or the workflow is completed when no successor exists.
    #[instrument(skip(self, request), fields(workflow_id = %request.workflow_id))]
    pub async fn advance_workflow(
        &self,
        request: AdvanceWorkflowRequest,
    ) -> Result<AdvanceWorkflowResponse> {
        let workflow = self.load_workflow(request.workflow_id).await?;
        match workflow.status {
            WorkflowStatus::Completed => {
                return Ok(AdvanceWorkflowResponse {
                    next_stage_id: None,
                    stage_advanced: false,
                    workflow_completed: true,
                });
            }
            WorkflowStatus::Failed | WorkflowStatus::Cancelled => {
                return Err(EngineError::IllegalState {
                    message: format!("workflow {} is {:?}", workflow.id, workflow.status),
                });
            }
            WorkflowStatus::Pending | WorkflowStatus::Running => {}
        }

        let stages = self.stages.list_for_workflow(workflow.id).await?;
        let Some(current) = Self::current_stage(stages) else {
            return Err(EngineError::IllegalState {
                message: format!("workflow {} has no stages", workflow.id),
            });
        };

        let activities = self.activities.list_for_stage(current.id).await?;

        // First visit: materialize the stage's activities and hand control
        // back to the caller.
        if activities.is_empty() {
            let created = self.materialize_activities(&current).await?;
            if created > 0 {
                info!(stage_id = %current.id, count = created, "activities materialized");
                return Ok(AdvanceWorkflowResponse {
                    next_stage_id: Some(current.id),
                    stage_advanced: false,
                    workflow_completed: false,
                });
            }
            // A stage template with no activities completes vacuously;
            // fall through so the workflow is not stuck on it.
            warn!(stage_id = %current.id, "stage template has no activities");
        }

        // Only completed and skipped activities let a stage close; a failed
        // activity pins the stage (retries are out of scope).
        if activities.iter().any(|activity| {
            !matches!(
                activity.status,
                ActivityStatus::Completed | ActivityStatus::Skipped
            )
        }) {
            return Ok(AdvanceWorkflowResponse {
                next_stage_id: Some(current.id),
                stage_advanced: false,
                workflow_completed: false,
            });
        }

        if current.status != StageStatus::Completed {
            let mut completed = current.clone();
            completed.status = StageStatus::Completed;
            self.stages.update(completed).await?;
            info!(stage_id = %current.id, order_index = current.order_index, "stage completed");
        }

        match self.successor_template(&workflow, &current).await? {
            None => {
                let mut completed = workflow;
                completed.status = WorkflowStatus::Completed;
                completed.updated_at = Utc::now();
                let completed = self.workflows.update(completed).await?;
                info!(workflow_id = %completed.id, "workflow completed");
                Ok(AdvanceWorkflowResponse {
                    next_stage_id: None,
                    stage_advanced: false,
                    workflow_completed: true,
                })
            }
            Some(successor) => {
                let stage = Stage {
                    id: self.ids.generate(),
                    workflow_id: workflow.id,
                    stage_template_id: successor.id,
                    order_index: successor.order_index.unwrap_or(current.order_index + 1),
                    status: StageStatus::Pending,
                    created_at: Utc::now(),
                };
                let stage = self.stages.create(stage).await?;
                info!(
                    stage_id = %stage.id,
                    order_index = stage.order_index,
                    "advanced to next stage"
                );
                Ok(AdvanceWorkflowResponse {
                    next_stage_id: Some(stage.id),
                    stage_advanced: true,
                    workflow_completed: false,
                })
            }
        }
    }

    /// Create pending activities for a freshly visited stage from its
    /// activity templates. Returns how many were created.
    async fn materialize_activities(&self, stage: &Stage) -> Result<usize> {
        let mut templates = self
            .templates()
            .get_activity_templates_for_stage(stage.stage_template_id)
            .await?;
        templates.sort_by_key(|t| t.order_index);

        let count = templates.len();
        for template in templates {
            let now = Utc::now();
            let activity = Activity {
                id: self.ids.generate(),
                stage_id: stage.id,
                activity_template_id: template.id,
                status: ActivityStatus::Pending,
                order_index: template.order_index,
                stage_order_index: stage.order_index,
                active: true,
                input_data_json: None,
                output_data_json: None,
                assigned_to: template.default_assignee_id.clone(),
                date_assigned: template.default_assignee_id.as_ref().map(|_| now),
                error_message: None,
                created_at: now,
            };
            self.activities.create(activity).await?;
        }
        Ok(count)
    }

    /// The stage template whose `order_index` follows the current stage's.
    async fn successor_template(
        &self,
        workflow: &Workflow,
        current: &Stage,
    ) -> Result<Option<StageTemplate>> {
        let templates = self
            .templates()
            .get_stage_templates(workflow.workflow_template_id)
            .await?;

        let next_index = current.order_index + 1;
        let mut matches = templates
            .into_iter()
            .filter(|t| t.order_index == Some(next_index));
        let successor = matches.next();
        if successor.is_some() && matches.next().is_some() {
            // Duplicate order_index is a template-authoring bug; first wins.
            warn!(
                workflow_template_id = %workflow.workflow_template_id,
                order_index = next_index,
                "multiple stage templates share an order_index"
            );
        }
        Ok(successor)
    }
}
