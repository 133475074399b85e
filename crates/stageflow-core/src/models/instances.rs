//! Instance entities: live processes created from templates.
//!
//! Instances are persisted through the repository collaborators; the engine
//! holds no process-wide instance state between calls. JSON-bearing fields
//! (`context_json`, `input_data_json`, `output_data_json`) are opaque strings
//! on the wire and structured values only transiently during one operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActivityStatus, StageStatus, WorkflowStatus};

/// A running business process instantiated from a [`super::WorkflowTemplate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,

    /// Template this workflow was materialized from.
    pub workflow_template_id: Uuid,

    pub status: WorkflowStatus,

    /// Tenant tag for multi-workspace deployments.
    #[serde(default)]
    pub workspace_id: Option<String>,

    /// The serialized context tree: `{"input": …, "stage": {…}}`.
    pub context_json: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A live phase of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: Uuid,

    pub workflow_id: Uuid,

    /// Template this stage was created from.
    pub stage_template_id: Uuid,

    /// Snapshot of the stage template's `order_index` at creation time. The
    /// current stage of a workflow is the live stage with the highest value,
    /// creation timestamp as tie-breaker.
    pub order_index: u32,

    pub status: StageStatus,

    pub created_at: DateTime<Utc>,
}

/// An individual step instance within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,

    pub stage_id: Uuid,

    /// Template this activity was created from.
    pub activity_template_id: Uuid,

    pub status: ActivityStatus,

    /// Snapshot of the activity template's `order_index`. Copied at creation
    /// so context paths stay stable even if templates are edited later.
    pub order_index: u32,

    /// Snapshot of the parent stage's `order_index`, for the same reason.
    pub stage_order_index: u32,

    /// Whether this activity participates in stage progression.
    pub active: bool,

    /// Resolved input, serialized, persisted before the executor runs.
    #[serde(default)]
    pub input_data_json: Option<String>,

    /// Executor (or manual continuation) output, serialized.
    #[serde(default)]
    pub output_data_json: Option<String>,

    /// Assignee for manual-class steps; seeded from the template default.
    #[serde(default)]
    pub assigned_to: Option<String>,

    #[serde(default)]
    pub date_assigned: Option<DateTime<Utc>>,

    /// Populated when the activity fails.
    #[serde(default)]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// The canonical context-tree slot for this activity, as a dotted path
    /// under the workflow context root.
    pub fn context_slot(&self) -> String {
        format!(
            "stage.{}.activity.{}",
            self.stage_order_index, self.order_index
        )
    }
}
