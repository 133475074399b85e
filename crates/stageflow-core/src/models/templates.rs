//! Template entities: the declarative recipes workflows are created from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ActivityType;

/// Declarative recipe for a whole business process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    /// Unique template identity.
    pub id: Uuid,

    /// Human-readable name, e.g. `"client_onboarding"`.
    pub name: String,

    /// Optional description for authoring tools.
    #[serde(default)]
    pub description: Option<String>,

    /// Declarative validation applied to caller-provided start parameters.
    /// Accepts either the structured mapping shape or a JSON-Schema-style
    /// object; see the schema processor.
    #[serde(default)]
    pub input_schema: Option<Value>,

    /// What to expose as workflow output on completion, as a mapping over
    /// the final context tree. Absent means the full context is the output.
    #[serde(default)]
    pub output_mapping: Option<Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An ordered phase within a workflow template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTemplate {
    pub id: Uuid,

    /// Parent workflow template.
    pub workflow_template_id: Uuid,

    /// Display name, e.g. `"payment_setup"`.
    pub name: String,

    /// Position in the linear stage progression. Non-negative and unique
    /// per workflow template; templates without one sort after those that
    /// have one.
    #[serde(default)]
    pub order_index: Option<u32>,

    pub created_at: DateTime<Utc>,
}

/// An individual step template within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTemplate {
    pub id: Uuid,

    /// Parent stage template.
    pub stage_template_id: Uuid,

    /// Position within the stage.
    pub order_index: u32,

    /// Selects the executor, or marks the step as manual-class.
    pub activity_type: ActivityType,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// How to derive this activity's input from the workflow context.
    #[serde(default)]
    pub input_mapping: Option<Value>,

    /// How to fold the activity's output back into the context, resolved
    /// against the context extended with an `activity_output` root.
    #[serde(default)]
    pub output_mapping: Option<Value>,

    /// Declarative validation for the activity's resolved input.
    #[serde(default)]
    pub input_schema: Option<Value>,

    /// Authoring-time duration estimate, surfaced to planning tools.
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,

    /// Assignee seeded onto materialized activities of this template.
    #[serde(default)]
    pub default_assignee_id: Option<String>,

    pub created_at: DateTime<Utc>,
}
