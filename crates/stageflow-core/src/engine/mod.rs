//! # Workflow Engine
//!
//! The orchestration runtime. Six operations form the public surface:
//!
//! | Operation | Module | Responsibility |
//! |---|---|---|
//! | [`WorkflowEngine::start_workflow`] | [`start`] | materialize a workflow and its first stage from a template |
//! | [`WorkflowEngine::execute_activity`] | [`execute`] | resolve input, run the executor, fold output into the context |
//! | [`WorkflowEngine::advance_workflow`] | [`advance`] | materialize pending activities, close stages, transition |
//! | [`WorkflowEngine::workflow_status`] | [`status`] | aggregate the instance tree and the pending activity |
//! | [`WorkflowEngine::continue_workflow`] | [`resume`] | resume a suspended manual activity with caller output |
//! | [`WorkflowEngine::run_to_completion`] | [`driver`] | loop advance+execute until terminal, suspended, or capped |
//!
//! The engine holds no per-workflow state between calls: all instance state
//! lives behind the repository collaborators, and the template cache is the
//! only engine-owned shared state. Each operation is an independent unit of
//! work; serializing operations on one workflow is the caller's concern.

mod advance;
mod driver;
mod execute;
mod resume;
mod start;
mod status;

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::TemplateCache;
use crate::config::{ConfigError, EngineConfig};
use crate::context::ContextTree;
use crate::error::{EngineError, Result};
use crate::executor::ExecutorRegistry;
use crate::models::{Activity, Stage, Workflow};
use crate::repository::{
    ActivityRepository, ActivityTemplateRepository, IdService, StageRepository,
    StageTemplateRepository, UuidIdService, WorkflowRepository, WorkflowTemplateRepository,
};

/// The orchestration engine. Cheap to clone via the shared handles; safe to
/// call from any number of concurrent request handlers.
pub struct WorkflowEngine {
    workflows: Arc<dyn WorkflowRepository>,
    stages: Arc<dyn StageRepository>,
    activities: Arc<dyn ActivityRepository>,
    templates: Arc<TemplateCache>,
    executors: Arc<ExecutorRegistry>,
    ids: Arc<dyn IdService>,
    config: EngineConfig,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine").finish_non_exhaustive()
    }
}

impl WorkflowEngine {
    pub fn builder() -> WorkflowEngineBuilder {
        WorkflowEngineBuilder::default()
    }

    /// The template cache, exposed so authoring paths can invalidate after
    /// edits and operators can read [`crate::cache::CacheStats`].
    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    pub(crate) async fn load_workflow(&self, id: Uuid) -> Result<Workflow> {
        self.workflows
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("workflow", id))
    }

    pub(crate) async fn load_activity(&self, id: Uuid) -> Result<Activity> {
        self.activities
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("activity", id))
    }

    pub(crate) async fn load_stage(&self, id: Uuid) -> Result<Stage> {
        self.stages
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("stage", id))
    }

    /// Persist an updated context tree onto a workflow record.
    pub(crate) async fn persist_context(
        &self,
        mut workflow: Workflow,
        context: &ContextTree,
    ) -> Result<Workflow> {
        workflow.context_json = context.to_json()?;
        workflow.updated_at = chrono::Utc::now();
        Ok(self.workflows.update(workflow).await?)
    }

    /// The current stage: highest `order_index`, creation timestamp as
    /// tie-breaker.
    pub(crate) fn current_stage(mut stages: Vec<Stage>) -> Option<Stage> {
        stages.sort_by_key(|s| (s.order_index, s.created_at));
        stages.pop()
    }
}

/// Wires repositories, executors, and configuration into a
/// [`WorkflowEngine`]. The template cache is constructed here from the
/// template repositories and the configured TTL.
#[derive(Default)]
pub struct WorkflowEngineBuilder {
    workflows: Option<Arc<dyn WorkflowRepository>>,
    stages: Option<Arc<dyn StageRepository>>,
    activities: Option<Arc<dyn ActivityRepository>>,
    workflow_templates: Option<Arc<dyn WorkflowTemplateRepository>>,
    stage_templates: Option<Arc<dyn StageTemplateRepository>>,
    activity_templates: Option<Arc<dyn ActivityTemplateRepository>>,
    executors: Option<Arc<ExecutorRegistry>>,
    ids: Option<Arc<dyn IdService>>,
    config: Option<EngineConfig>,
}

impl WorkflowEngineBuilder {
    pub fn workflows(mut self, repo: Arc<dyn WorkflowRepository>) -> Self {
        self.workflows = Some(repo);
        self
    }

    pub fn stages(mut self, repo: Arc<dyn StageRepository>) -> Self {
        self.stages = Some(repo);
        self
    }

    pub fn activities(mut self, repo: Arc<dyn ActivityRepository>) -> Self {
        self.activities = Some(repo);
        self
    }

    pub fn workflow_templates(mut self, repo: Arc<dyn WorkflowTemplateRepository>) -> Self {
        self.workflow_templates = Some(repo);
        self
    }

    pub fn stage_templates(mut self, repo: Arc<dyn StageTemplateRepository>) -> Self {
        self.stage_templates = Some(repo);
        self
    }

    pub fn activity_templates(mut self, repo: Arc<dyn ActivityTemplateRepository>) -> Self {
        self.activity_templates = Some(repo);
        self
    }

    pub fn executors(mut self, registry: Arc<ExecutorRegistry>) -> Self {
        self.executors = Some(registry);
        self
    }

    pub fn id_service(mut self, ids: Arc<dyn IdService>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> std::result::Result<WorkflowEngine, ConfigError> {
        fn require<T>(value: Option<T>, component: &str) -> std::result::Result<T, ConfigError> {
            value.ok_or_else(|| ConfigError::MissingComponent {
                component: component.to_string(),
            })
        }

        let config = self.config.unwrap_or_default();
        let templates = Arc::new(TemplateCache::new(
            require(self.workflow_templates, "workflow template repository")?,
            require(self.stage_templates, "stage template repository")?,
            require(self.activity_templates, "activity template repository")?,
            config.template_cache_ttl,
        ));

        Ok(WorkflowEngine {
            workflows: require(self.workflows, "workflow repository")?,
            stages: require(self.stages, "stage repository")?,
            activities: require(self.activities, "activity repository")?,
            templates,
            executors: self.executors.unwrap_or_default(),
            ids: self.ids.unwrap_or_else(|| Arc::new(UuidIdService)),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AdvanceWorkflowRequest, StartWorkflowRequest};
    use crate::models::WorkflowStatus;
    use crate::repository::{MockStageRepository, RepositoryError};
    use crate::testing::mocks::{
        InMemoryActivityRepository, InMemoryActivityTemplateRepository,
        InMemoryStageTemplateRepository, InMemoryWorkflowRepository,
        InMemoryWorkflowTemplateRepository,
    };
    use crate::testing::{fixtures, TestBed};

    #[test]
    fn builder_requires_every_repository() {
        let err = WorkflowEngine::builder().build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingComponent { .. }));
    }

    #[tokio::test]
    async fn failed_first_stage_persist_fails_the_workflow() {
        let workflows = Arc::new(InMemoryWorkflowRepository::default());
        let workflow_templates = Arc::new(InMemoryWorkflowTemplateRepository::default());
        let stage_templates = Arc::new(InMemoryStageTemplateRepository::default());

        let template = fixtures::workflow_template("doomed");
        workflow_templates.insert(template.clone());
        stage_templates.insert(fixtures::stage_template(&template, 1, "first"));

        let mut stages = MockStageRepository::new();
        stages.expect_create().returning(|_| {
            Err(RepositoryError::OperationFailed {
                message: "disk full".to_string(),
            })
        });

        let engine = WorkflowEngine::builder()
            .workflows(workflows.clone())
            .stages(Arc::new(stages))
            .activities(Arc::new(InMemoryActivityRepository::default()))
            .workflow_templates(workflow_templates)
            .stage_templates(stage_templates)
            .activity_templates(Arc::new(InMemoryActivityTemplateRepository::default()))
            .build()
            .unwrap();

        let err = engine
            .start_workflow(StartWorkflowRequest {
                workflow_template_id: template.id,
                input_json: "{}".to_string(),
                workspace_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::StorageFailed { .. }));

        // No runnable stageless workflow is left behind.
        let orphan = workflows.all().pop().unwrap();
        assert_eq!(orphan.status, WorkflowStatus::Failed);
    }

    #[tokio::test]
    async fn advancing_a_stageless_workflow_is_illegal() {
        let bed = TestBed::new();
        let engine = bed.engine(crate::executor::ExecutorRegistry::new());

        let now = chrono::Utc::now();
        let workflow = Workflow {
            id: Uuid::new_v4(),
            workflow_template_id: Uuid::new_v4(),
            status: WorkflowStatus::Running,
            workspace_id: None,
            context_json: "{}".to_string(),
            created_at: now,
            updated_at: now,
        };
        bed.workflows.insert(workflow.clone());

        let err = engine
            .advance_workflow(AdvanceWorkflowRequest {
                workflow_id: workflow.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IllegalState { .. }));
    }

    #[tokio::test]
    async fn advancing_an_unknown_workflow_is_not_found() {
        let bed = TestBed::new();
        let engine = bed.engine(crate::executor::ExecutorRegistry::new());
        let err = engine
            .advance_workflow(AdvanceWorkflowRequest {
                workflow_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
