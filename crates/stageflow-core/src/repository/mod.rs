//! # Repository Collaborators
//!
//! The engine persists instance state and reads templates through these
//! trait seams. Concrete back-ends (PostgreSQL, document stores) live in the
//! application layer; the engine only depends on the contracts here, plus
//! [`IdService`] for identity allocation. In-memory implementations for
//! tests ship in [`crate::testing`].
//!
//! All implementations must be internally thread-safe: repositories are
//! shared across every concurrent engine operation.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{
    Activity, ActivityTemplate, Stage, StageTemplate, Workflow, WorkflowTemplate,
};

/// Repository layer failures.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("storage operation failed: {message}")]
    OperationFailed { message: String },

    #[error("conflicting write for {entity} {id}")]
    Conflict { entity: String, id: Uuid },
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        EngineError::StorageFailed {
            message: err.to_string(),
        }
    }
}

/// Workflow instance persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn create(&self, workflow: Workflow) -> Result<Workflow, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Workflow>, RepositoryError>;
    async fn update(&self, workflow: Workflow) -> Result<Workflow, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
    async fn list(&self, workspace_id: Option<String>) -> Result<Vec<Workflow>, RepositoryError>;
}

/// Stage instance persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageRepository: Send + Sync {
    async fn create(&self, stage: Stage) -> Result<Stage, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Stage>, RepositoryError>;
    async fn update(&self, stage: Stage) -> Result<Stage, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// All stages of a workflow, in repository order; callers sort.
    async fn list_for_workflow(&self, workflow_id: Uuid) -> Result<Vec<Stage>, RepositoryError>;
}

/// Activity instance persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, activity: Activity) -> Result<Activity, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Activity>, RepositoryError>;
    async fn update(&self, activity: Activity) -> Result<Activity, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
    async fn list_for_stage(&self, stage_id: Uuid) -> Result<Vec<Activity>, RepositoryError>;
}

/// Workflow template reads (and the CRUD surface used by authoring paths).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowTemplateRepository: Send + Sync {
    async fn create(&self, template: WorkflowTemplate) -> Result<WorkflowTemplate, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WorkflowTemplate>, RepositoryError>;
    async fn update(&self, template: WorkflowTemplate) -> Result<WorkflowTemplate, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<WorkflowTemplate>, RepositoryError>;
}

/// Stage template reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageTemplateRepository: Send + Sync {
    async fn create(&self, template: StageTemplate) -> Result<StageTemplate, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StageTemplate>, RepositoryError>;
    async fn update(&self, template: StageTemplate) -> Result<StageTemplate, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// All stage templates of a workflow template, unordered.
    async fn list_for_workflow_template(
        &self,
        workflow_template_id: Uuid,
    ) -> Result<Vec<StageTemplate>, RepositoryError>;
}

/// Activity template reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityTemplateRepository: Send + Sync {
    async fn create(&self, template: ActivityTemplate)
        -> Result<ActivityTemplate, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ActivityTemplate>, RepositoryError>;
    async fn update(&self, template: ActivityTemplate)
        -> Result<ActivityTemplate, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// All activity templates of a stage template, unordered.
    async fn list_for_stage_template(
        &self,
        stage_template_id: Uuid,
    ) -> Result<Vec<ActivityTemplate>, RepositoryError>;
}

/// Identity allocation for new instance entities.
pub trait IdService: Send + Sync {
    fn generate(&self) -> Uuid;
}

/// Default [`IdService`]: random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdService;

impl IdService for UuidIdService {
    fn generate(&self) -> Uuid {
        Uuid::new_v4()
    }
}
