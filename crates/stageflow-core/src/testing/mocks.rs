//! In-memory repository implementations and stub executors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::executor::ActivityExecutor;
use crate::models::{
    Activity, ActivityTemplate, Stage, StageTemplate, Workflow, WorkflowTemplate,
};
use crate::repository::{
    ActivityRepository, ActivityTemplateRepository, RepositoryError, StageRepository,
    StageTemplateRepository, WorkflowRepository, WorkflowTemplateRepository,
};

fn missing(entity: &str, id: Uuid) -> RepositoryError {
    RepositoryError::OperationFailed {
        message: format!("{} {} does not exist", entity, id),
    }
}

macro_rules! in_memory_store {
    ($name:ident, $entity:ty, $label:literal) => {
        /// In-memory store with read counting.
        #[derive(Default)]
        pub struct $name {
            rows: Mutex<HashMap<Uuid, $entity>>,
            fetches: AtomicUsize,
        }

        impl $name {
            /// Seed or overwrite a row directly, bypassing the trait.
            pub fn insert(&self, entity: $entity) {
                self.rows.lock().unwrap().insert(entity.id, entity);
            }

            /// How many reads (finds and lists) hit this store.
            pub fn fetch_count(&self) -> usize {
                self.fetches.load(Ordering::SeqCst)
            }

            pub fn get(&self, id: Uuid) -> Option<$entity> {
                self.rows.lock().unwrap().get(&id).cloned()
            }

            pub fn all(&self) -> Vec<$entity> {
                self.rows.lock().unwrap().values().cloned().collect()
            }

            pub fn len(&self) -> usize {
                self.rows.lock().unwrap().len()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            fn create_row(&self, entity: $entity) -> std::result::Result<$entity, RepositoryError> {
                self.rows.lock().unwrap().insert(entity.id, entity.clone());
                Ok(entity)
            }

            fn find_row(&self, id: Uuid) -> std::result::Result<Option<$entity>, RepositoryError> {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                Ok(self.rows.lock().unwrap().get(&id).cloned())
            }

            fn update_row(&self, entity: $entity) -> std::result::Result<$entity, RepositoryError> {
                let mut rows = self.rows.lock().unwrap();
                if !rows.contains_key(&entity.id) {
                    return Err(missing($label, entity.id));
                }
                rows.insert(entity.id, entity.clone());
                Ok(entity)
            }

            fn delete_row(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
                self.rows
                    .lock()
                    .unwrap()
                    .remove(&id)
                    .map(|_| ())
                    .ok_or_else(|| missing($label, id))
            }

            fn filtered<F>(&self, predicate: F) -> Vec<$entity>
            where
                F: Fn(&$entity) -> bool,
            {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                self.rows
                    .lock()
                    .unwrap()
                    .values()
                    .filter(|e| predicate(e))
                    .cloned()
                    .collect()
            }
        }
    };
}

in_memory_store!(InMemoryWorkflowRepository, Workflow, "workflow");
in_memory_store!(InMemoryStageRepository, Stage, "stage");
in_memory_store!(InMemoryActivityRepository, Activity, "activity");
in_memory_store!(
    InMemoryWorkflowTemplateRepository,
    WorkflowTemplate,
    "workflow template"
);
in_memory_store!(
    InMemoryStageTemplateRepository,
    StageTemplate,
    "stage template"
);
in_memory_store!(
    InMemoryActivityTemplateRepository,
    ActivityTemplate,
    "activity template"
);

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn create(&self, workflow: Workflow) -> std::result::Result<Workflow, RepositoryError> {
        self.create_row(workflow)
    }
    async fn find_by_id(&self, id: Uuid) -> std::result::Result<Option<Workflow>, RepositoryError> {
        self.find_row(id)
    }
    async fn update(&self, workflow: Workflow) -> std::result::Result<Workflow, RepositoryError> {
        self.update_row(workflow)
    }
    async fn delete(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
        self.delete_row(id)
    }
    async fn list(
        &self,
        workspace_id: Option<String>,
    ) -> std::result::Result<Vec<Workflow>, RepositoryError> {
        Ok(self.filtered(|w| match &workspace_id {
            Some(ws) => w.workspace_id.as_deref() == Some(ws.as_str()),
            None => true,
        }))
    }
}

#[async_trait]
impl StageRepository for InMemoryStageRepository {
    async fn create(&self, stage: Stage) -> std::result::Result<Stage, RepositoryError> {
        self.create_row(stage)
    }
    async fn find_by_id(&self, id: Uuid) -> std::result::Result<Option<Stage>, RepositoryError> {
        self.find_row(id)
    }
    async fn update(&self, stage: Stage) -> std::result::Result<Stage, RepositoryError> {
        self.update_row(stage)
    }
    async fn delete(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
        self.delete_row(id)
    }
    async fn list_for_workflow(
        &self,
        workflow_id: Uuid,
    ) -> std::result::Result<Vec<Stage>, RepositoryError> {
        Ok(self.filtered(|s| s.workflow_id == workflow_id))
    }
}

#[async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn create(&self, activity: Activity) -> std::result::Result<Activity, RepositoryError> {
        self.create_row(activity)
    }
    async fn find_by_id(&self, id: Uuid) -> std::result::Result<Option<Activity>, RepositoryError> {
        self.find_row(id)
    }
    async fn update(&self, activity: Activity) -> std::result::Result<Activity, RepositoryError> {
        self.update_row(activity)
    }
    async fn delete(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
        self.delete_row(id)
    }
    async fn list_for_stage(
        &self,
        stage_id: Uuid,
    ) -> std::result::Result<Vec<Activity>, RepositoryError> {
        Ok(self.filtered(|a| a.stage_id == stage_id))
    }
}

#[async_trait]
impl WorkflowTemplateRepository for InMemoryWorkflowTemplateRepository {
    async fn create(
        &self,
        template: WorkflowTemplate,
    ) -> std::result::Result<WorkflowTemplate, RepositoryError> {
        self.create_row(template)
    }
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> std::result::Result<Option<WorkflowTemplate>, RepositoryError> {
        self.find_row(id)
    }
    async fn update(
        &self,
        template: WorkflowTemplate,
    ) -> std::result::Result<WorkflowTemplate, RepositoryError> {
        self.update_row(template)
    }
    async fn delete(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
        self.delete_row(id)
    }
    async fn list(&self) -> std::result::Result<Vec<WorkflowTemplate>, RepositoryError> {
        Ok(self.filtered(|_| true))
    }
}

#[async_trait]
impl StageTemplateRepository for InMemoryStageTemplateRepository {
    async fn create(
        &self,
        template: StageTemplate,
    ) -> std::result::Result<StageTemplate, RepositoryError> {
        self.create_row(template)
    }
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> std::result::Result<Option<StageTemplate>, RepositoryError> {
        self.find_row(id)
    }
    async fn update(
        &self,
        template: StageTemplate,
    ) -> std::result::Result<StageTemplate, RepositoryError> {
        self.update_row(template)
    }
    async fn delete(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
        self.delete_row(id)
    }
    async fn list_for_workflow_template(
        &self,
        workflow_template_id: Uuid,
    ) -> std::result::Result<Vec<StageTemplate>, RepositoryError> {
        Ok(self.filtered(|s| s.workflow_template_id == workflow_template_id))
    }
}

#[async_trait]
impl ActivityTemplateRepository for InMemoryActivityTemplateRepository {
    async fn create(
        &self,
        template: ActivityTemplate,
    ) -> std::result::Result<ActivityTemplate, RepositoryError> {
        self.create_row(template)
    }
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> std::result::Result<Option<ActivityTemplate>, RepositoryError> {
        self.find_row(id)
    }
    async fn update(
        &self,
        template: ActivityTemplate,
    ) -> std::result::Result<ActivityTemplate, RepositoryError> {
        self.update_row(template)
    }
    async fn delete(&self, id: Uuid) -> std::result::Result<(), RepositoryError> {
        self.delete_row(id)
    }
    async fn list_for_stage_template(
        &self,
        stage_template_id: Uuid,
    ) -> std::result::Result<Vec<ActivityTemplate>, RepositoryError> {
        Ok(self.filtered(|a| a.stage_template_id == stage_template_id))
    }
}

/// Executor returning its resolved input verbatim.
#[derive(Debug, Default)]
pub struct EchoExecutor;

#[async_trait]
impl ActivityExecutor for EchoExecutor {
    async fn execute(&self, _activity: &Activity, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }
}

/// Executor returning a canned output regardless of input.
#[derive(Debug)]
pub struct StaticExecutor {
    output: Value,
}

impl StaticExecutor {
    pub fn new(output: Value) -> Self {
        Self { output }
    }
}

#[async_trait]
impl ActivityExecutor for StaticExecutor {
    async fn execute(&self, _activity: &Activity, _input: &Value) -> Result<Value> {
        Ok(self.output.clone())
    }
}

/// Executor that always fails with the given message.
#[derive(Debug)]
pub struct FailingExecutor {
    message: String,
}

impl FailingExecutor {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ActivityExecutor for FailingExecutor {
    async fn execute(&self, _activity: &Activity, _input: &Value) -> Result<Value> {
        Err(EngineError::ExecutorFailed {
            message: self.message.clone(),
        })
    }
}
