//! Request and response values for the six orchestration operations.
//!
//! The engine is not a network service of its own; callers invoke it with
//! these typed values and engine methods return `Result<Response,
//! EngineError>`. Fronting adapters own the mapping from error kinds to
//! transport statuses. JSON-bearing request fields are opaque strings on the
//! wire, parsed only inside the operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Activity, Stage, Workflow};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartWorkflowRequest {
    pub workflow_template_id: Uuid,
    /// Caller-supplied start parameters, serialized. Empty means `{}`.
    #[serde(default)]
    pub input_json: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartWorkflowResponse {
    pub workflow: Workflow,
    /// The first stage, created `pending` alongside the workflow.
    pub first_stage_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteActivityRequest {
    pub activity_id: Uuid,
    pub workflow_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteActivityResponse {
    pub activity_id: Uuid,
    /// The executor's output document.
    pub output: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceWorkflowRequest {
    pub workflow_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceWorkflowResponse {
    /// The stage the workflow sits in after this call; absent when the
    /// workflow completed.
    pub next_stage_id: Option<Uuid>,
    /// Whether this call transitioned to a new stage, as opposed to
    /// reporting the current stage still in progress.
    pub stage_advanced: bool,
    pub workflow_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWorkflowStatusRequest {
    pub workflow_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWorkflowStatusResponse {
    pub workflow: Workflow,
    pub stages: Vec<Stage>,
    pub activities: Vec<Activity>,
    /// Earliest non-terminal activity of the most recent non-completed
    /// stage, if any.
    pub pending_activity_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueWorkflowRequest {
    pub workflow_id: Uuid,
    pub activity_id: Uuid,
    /// The manual step's result, serialized; applied as though an executor
    /// produced it.
    pub output_json: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueWorkflowResponse {
    pub workflow_id: Uuid,
    pub activity_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunToCompletionRequest {
    pub workflow_template_id: Uuid,
    #[serde(default)]
    pub input_json: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
    /// Overrides the engine's configured iteration budget.
    #[serde(default)]
    pub max_iterations: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunToCompletionResponse {
    pub workflow: Workflow,
    /// The workflow template's output mapping applied to the final context,
    /// or the full context tree when the template declares none.
    pub output: Value,
}
