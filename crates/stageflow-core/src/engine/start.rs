//! Workflow materialization: template → running instance plus first stage.

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::api::{StartWorkflowRequest, StartWorkflowResponse};
use crate::context::ContextTree;
use crate::error::{EngineError, Result};
use crate::models::{Stage, StageStatus, Workflow, WorkflowStatus};
use crate::schema;

use super::WorkflowEngine;

impl WorkflowEngine {
    /// Create a workflow instance and its first stage from a workflow
    /// template.
    ///
    /// Caller input is validated against the template's input schema before
    /// anything is persisted; a validation failure leaves no trace. Once the
    /// workflow record exists, a failure to persist the first stage marks
    /// the workflow `failed` so it can never surface as a runnable,
    /// stageless instance.
    #[instrument(skip(self, request), fields(workflow_template_id = %request.workflow_template_id))]
    pub async fn start_workflow(
        &self,
        request: StartWorkflowRequest,
    ) -> Result<StartWorkflowResponse> {
        let template = self
            .templates()
            .get_workflow_template(request.workflow_template_id)
            .await?;

        let validated =
            schema::validate_input_json(&request.input_json, template.input_schema.as_ref())?;

        let stage_templates = self
            .templates()
            .get_stage_templates(template.id)
            .await?;
        let Some(first_template) = stage_templates.first() else {
            return Err(EngineError::TemplateIncomplete {
                workflow_template_id: template.id,
            });
        };

        let now = Utc::now();
        let context = ContextTree::new(validated);
        let workflow = Workflow {
            id: self.ids.generate(),
            workflow_template_id: template.id,
            status: WorkflowStatus::Running,
            workspace_id: request.workspace_id,
            context_json: context.to_json()?,
            created_at: now,
            updated_at: now,
        };
        let workflow = self.workflows.create(workflow).await?;

        let first_stage = Stage {
            id: self.ids.generate(),
            workflow_id: workflow.id,
            stage_template_id: first_template.id,
            order_index: first_template.order_index.unwrap_or(0),
            status: StageStatus::Pending,
            created_at: now,
        };
        let first_stage = match self.stages.create(first_stage).await {
            Ok(stage) => stage,
            Err(e) => {
                warn!(workflow_id = %workflow.id, error = %e, "first stage creation failed; failing workflow");
                let mut failed = workflow;
                failed.status = WorkflowStatus::Failed;
                failed.updated_at = Utc::now();
                // Best effort: the stage error is the one the caller needs.
                let _ = self.workflows.update(failed).await;
                return Err(e.into());
            }
        };

        info!(
            workflow_id = %workflow.id,
            first_stage_id = %first_stage.id,
            template = %template.name,
            "workflow started"
        );
        Ok(StartWorkflowResponse {
            workflow,
            first_stage_id: first_stage.id,
        })
    }
}
