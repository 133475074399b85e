//! # Engine Data Model
//!
//! Two families of entities flow through the engine:
//!
//! - **Templates** ([`WorkflowTemplate`], [`StageTemplate`],
//!   [`ActivityTemplate`]) — the declarative recipes. The engine only reads
//!   them (through the template cache); they are edited by separate CRUD
//!   paths.
//! - **Instances** ([`Workflow`], [`Stage`], [`Activity`]) — live processes
//!   created from templates. The engine owns their lifecycle and mutates
//!   them through the repository collaborators.
//!
//! Status values are closed enums serialized as lowercase snake_case strings
//! so repository back-ends can store them as plain text columns.

mod instances;
mod templates;

pub use instances::{Activity, Stage, Workflow};
pub use templates::{ActivityTemplate, StageTemplate, WorkflowTemplate};

use serde::{Deserialize, Serialize};

/// Lifecycle status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Whether this status ends the workflow's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }
}

/// Lifecycle status of a stage instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatus::Completed | StageStatus::Failed | StageStatus::Skipped
        )
    }
}

/// Lifecycle status of an activity instance.
///
/// An activity reaches a terminal state at most once; retries are not part
/// of the engine's contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl ActivityStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActivityStatus::Completed | ActivityStatus::Failed | ActivityStatus::Skipped
        )
    }
}

/// The kind of work an activity performs.
///
/// The three manual-class variants suspend automatic execution and cannot be
/// associated with an executor; everything else is an executor tag resolved
/// through the registry. The reserved literals (`manual`, `human_task`,
/// `approval`) exist only in this type's string round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    Manual,
    HumanTask,
    Approval,
    /// Automated step dispatched to the executor registered under the tag.
    Automated(String),
}

impl ActivityType {
    /// Whether this type suspends automatic execution for human input.
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            ActivityType::Manual | ActivityType::HumanTask | ActivityType::Approval
        )
    }

    /// The wire tag for this type.
    pub fn tag(&self) -> &str {
        match self {
            ActivityType::Manual => "manual",
            ActivityType::HumanTask => "human_task",
            ActivityType::Approval => "approval",
            ActivityType::Automated(tag) => tag,
        }
    }
}

impl From<String> for ActivityType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "manual" => ActivityType::Manual,
            "human_task" => ActivityType::HumanTask,
            "approval" => ActivityType::Approval,
            _ => ActivityType::Automated(tag),
        }
    }
}

impl From<&str> for ActivityType {
    fn from(tag: &str) -> Self {
        ActivityType::from(tag.to_string())
    }
}

impl From<ActivityType> for String {
    fn from(value: ActivityType) -> Self {
        value.tag().to_string()
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
