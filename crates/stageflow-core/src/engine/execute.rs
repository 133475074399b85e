//! Activity execution: resolve input, dispatch the executor, fold the
//! result into the workflow context.

use serde_json::{Map, Value};
use tracing::{error, info, instrument};

use crate::api::{ExecuteActivityRequest, ExecuteActivityResponse};
use crate::context::ContextTree;
use crate::error::{EngineError, Result};
use crate::models::{Activity, ActivityStatus, ActivityTemplate, Workflow};
use crate::schema;

use super::WorkflowEngine;

impl WorkflowEngine {
    /// Execute one automated activity.
    ///
    /// The resolved input is persisted onto the activity before the executor
    /// runs, so a crashed executor leaves an inspectable record. Persistence
    /// on success is activity-status first, then context: the repository
    /// surface exposes no transactions, and readers treat activity status as
    /// authoritative (the advance controller tolerates a completed activity
    /// whose output has not yet reached the context).
    #[instrument(skip(self, request), fields(activity_id = %request.activity_id, workflow_id = %request.workflow_id))]
    pub async fn execute_activity(
        &self,
        request: ExecuteActivityRequest,
    ) -> Result<ExecuteActivityResponse> {
        let activity = self.load_activity(request.activity_id).await?;
        if activity.status.is_terminal() {
            return Err(EngineError::IllegalState {
                message: format!(
                    "activity {} is already {:?}",
                    activity.id, activity.status
                ),
            });
        }

        let workflow = self.load_workflow(request.workflow_id).await?;
        let mut context = ContextTree::from_json(&workflow.context_json)?;

        let template = self
            .templates()
            .get_activity_template(activity.activity_template_id)
            .await?;
        if template.activity_type.is_manual() {
            return Err(EngineError::SuspensionRequired {
                activity_id: activity.id,
            });
        }
        let executor = self.executors.get(template.activity_type.tag())?;

        let resolved_input = match &template.input_mapping {
            Some(mapping) => schema::resolve(context.as_value(), mapping)?,
            None => Value::Object(Map::new()),
        };

        let mut activity = activity;
        activity.input_data_json = Some(serde_json::to_string(&resolved_input)?);
        activity.status = ActivityStatus::Running;
        let activity = self.activities.update(activity).await?;

        let output = match executor.execute(&activity, &resolved_input).await {
            Ok(output) => output,
            Err(e) => return Err(self.fail_activity(activity, e).await?),
        };

        let mut activity = activity;
        activity.status = ActivityStatus::Completed;
        activity.output_data_json = Some(serde_json::to_string(&output)?);
        let activity = self.activities.update(activity).await?;

        self.fold_activity_result(
            workflow,
            &mut context,
            &activity,
            &template,
            Some(resolved_input),
            &output,
        )
        .await?;

        info!(activity = %template.name, "activity completed");
        Ok(ExecuteActivityResponse {
            activity_id: activity.id,
            output,
        })
    }

    /// Persist a failed activity and shape the surfaced error.
    async fn fail_activity(&self, mut activity: Activity, cause: EngineError) -> Result<EngineError> {
        error!(activity_id = %activity.id, error = %cause, "executor failed");
        activity.status = ActivityStatus::Failed;
        activity.error_message = Some(cause.to_string());
        self.activities.update(activity).await?;
        Ok(EngineError::ExecutorFailed {
            message: cause.to_string(),
        })
    }

    /// Fold an activity's resolved input and output into the workflow
    /// context at the canonical slot, apply the template's output mapping if
    /// any, and persist the updated context. Shared by execution and manual
    /// continuation.
    pub(crate) async fn fold_activity_result(
        &self,
        workflow: Workflow,
        context: &mut ContextTree,
        activity: &Activity,
        template: &ActivityTemplate,
        resolved_input: Option<Value>,
        output: &Value,
    ) -> Result<()> {
        let stage_order = activity.stage_order_index;
        let activity_order = activity.order_index;

        if let Some(input) = resolved_input {
            context.record_activity_input(stage_order, activity_order, input);
        }
        context.record_activity_output(stage_order, activity_order, output.clone());

        if let Some(mapping) = &template.output_mapping {
            let extended = context.with_activity_output(output);
            let mapped = schema::resolve(&extended, mapping)?;
            if let Value::Object(fields) = mapped {
                context.merge_activity_output(stage_order, activity_order, fields);
            }
        }

        self.persist_context(workflow, context).await?;
        Ok(())
    }
}
