//! Test support: in-memory repositories, stub executors, and entity
//! fixtures.
//!
//! Everything here is deterministic and dependency-free so engine behavior
//! can be exercised without a database. The in-memory repositories count
//! their reads, which the cache tests use to verify read-through semantics.

pub mod fixtures;
pub mod mocks;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::WorkflowEngine;
use crate::executor::ExecutorRegistry;

use mocks::{
    InMemoryActivityRepository, InMemoryActivityTemplateRepository, InMemoryStageRepository,
    InMemoryStageTemplateRepository, InMemoryWorkflowRepository,
    InMemoryWorkflowTemplateRepository,
};

/// A complete in-memory persistence layer plus an engine wired to it.
///
/// Tests seed templates through the public repository handles, build an
/// engine with the executors under test, and assert on the stored instance
/// state afterwards.
pub struct TestBed {
    pub workflows: Arc<InMemoryWorkflowRepository>,
    pub stages: Arc<InMemoryStageRepository>,
    pub activities: Arc<InMemoryActivityRepository>,
    pub workflow_templates: Arc<InMemoryWorkflowTemplateRepository>,
    pub stage_templates: Arc<InMemoryStageTemplateRepository>,
    pub activity_templates: Arc<InMemoryActivityTemplateRepository>,
}

impl TestBed {
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(InMemoryWorkflowRepository::default()),
            stages: Arc::new(InMemoryStageRepository::default()),
            activities: Arc::new(InMemoryActivityRepository::default()),
            workflow_templates: Arc::new(InMemoryWorkflowTemplateRepository::default()),
            stage_templates: Arc::new(InMemoryStageTemplateRepository::default()),
            activity_templates: Arc::new(InMemoryActivityTemplateRepository::default()),
        }
    }

    /// Build an engine over this bed's repositories.
    pub fn engine(&self, executors: ExecutorRegistry) -> WorkflowEngine {
        self.engine_with_config(executors, EngineConfig::default())
    }

    pub fn engine_with_config(
        &self,
        executors: ExecutorRegistry,
        config: EngineConfig,
    ) -> WorkflowEngine {
        WorkflowEngine::builder()
            .workflows(self.workflows.clone())
            .stages(self.stages.clone())
            .activities(self.activities.clone())
            .workflow_templates(self.workflow_templates.clone())
            .stage_templates(self.stage_templates.clone())
            .activity_templates(self.activity_templates.clone())
            .executors(Arc::new(executors))
            .config(config)
            .build()
            .expect("test bed wires every component")
    }
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new()
    }
}
