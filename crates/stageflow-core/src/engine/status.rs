//! Status aggregation over a workflow's instance tree.

use tracing::instrument;
use uuid::Uuid;

use crate::api::{GetWorkflowStatusRequest, GetWorkflowStatusResponse};
use crate::error::Result;
use crate::models::{Activity, Stage, StageStatus};

use super::WorkflowEngine;

impl WorkflowEngine {
    /// Load a workflow with all of its stages and activities, plus the id
    /// of the activity currently blocking progress, if any.
    ///
    /// The pending activity is the earliest non-terminal activity
    /// (`order_index` ascending, creation time as tie-breaker) of the most
    /// recent stage that has not completed.
    #[instrument(skip(self, request), fields(workflow_id = %request.workflow_id))]
    pub async fn workflow_status(
        &self,
        request: GetWorkflowStatusRequest,
    ) -> Result<GetWorkflowStatusResponse> {
        let workflow = self.load_workflow(request.workflow_id).await?;
        let stages = self.stages.list_for_workflow(workflow.id).await?;

        let mut activities = Vec::new();
        for stage in &stages {
            activities.extend(self.activities.list_for_stage(stage.id).await?);
        }

        let pending_activity_id = pending_activity(&stages, &activities);

        Ok(GetWorkflowStatusResponse {
            workflow,
            stages,
            activities,
            pending_activity_id,
        })
    }
}

fn pending_activity(stages: &[Stage], activities: &[Activity]) -> Option<Uuid> {
    let open_stages: Vec<Stage> = stages
        .iter()
        .filter(|s| s.status != StageStatus::Completed)
        .cloned()
        .collect();
    let current = WorkflowEngine::current_stage(open_stages)?;

    activities
        .iter()
        .filter(|a| a.stage_id == current.id && !a.status.is_terminal())
        .min_by_key(|a| (a.order_index, a.created_at))
        .map(|a| a.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityStatus;
    use crate::testing::fixtures;

    #[test]
    fn pending_activity_prefers_lowest_order_index() {
        let stage = fixtures::stage_instance(1);
        let first = fixtures::activity_in_stage(&stage, 0, ActivityStatus::Pending);
        let second = fixtures::activity_in_stage(&stage, 1, ActivityStatus::Pending);
        let found = pending_activity(&[stage], &[second, first.clone()]);
        assert_eq!(found, Some(first.id));
    }

    #[test]
    fn terminal_activities_are_never_pending() {
        let stage = fixtures::stage_instance(1);
        let done = fixtures::activity_in_stage(&stage, 0, ActivityStatus::Completed);
        let skipped = fixtures::activity_in_stage(&stage, 1, ActivityStatus::Skipped);
        assert_eq!(pending_activity(&[stage], &[done, skipped]), None);
    }

    #[test]
    fn completed_stages_are_ignored() {
        let mut closed = fixtures::stage_instance(1);
        closed.status = StageStatus::Completed;
        let open = fixtures::stage_instance(2);
        let stale = fixtures::activity_in_stage(&closed, 0, ActivityStatus::Pending);
        let live = fixtures::activity_in_stage(&open, 0, ActivityStatus::Pending);
        let found = pending_activity(&[closed, open], &[stale, live.clone()]);
        assert_eq!(found, Some(live.id));
    }

    #[test]
    fn no_open_stage_means_no_pending_activity() {
        let mut closed = fixtures::stage_instance(1);
        closed.status = StageStatus::Completed;
        assert_eq!(pending_activity(&[closed], &[]), None);
    }
}
