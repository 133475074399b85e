//! # Stageflow Core
//!
//! The core orchestration engine: a runtime that instantiates long-running,
//! multi-step business processes from declarative templates, drives them
//! through stages and activities, resolves data dependencies between steps,
//! and either executes steps automatically through pluggable executors or
//! suspends for external input.
//!
//! ## Core Concepts
//!
//! - **Templates** describe a process: a [`models::WorkflowTemplate`] owns
//!   ordered [`models::StageTemplate`]s, each owning
//!   [`models::ActivityTemplate`]s with input/output mappings.
//! - **Instances** are live processes: [`models::Workflow`],
//!   [`models::Stage`], [`models::Activity`], persisted through the
//!   [`repository`] collaborators.
//! - **The context tree** ([`context::ContextTree`]) accumulates the
//!   caller's start input and every activity's output; the
//!   [`schema`] processor derives each activity's input from it.
//! - **Executors** ([`executor::ActivityExecutor`]) perform the side
//!   effects, dispatched by `activity_type` tag through the
//!   [`executor::ExecutorRegistry`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stageflow_core::prelude::*;
//!
//! # async fn example(
//! #     workflows: Arc<dyn stageflow_core::repository::WorkflowRepository>,
//! #     stages: Arc<dyn stageflow_core::repository::StageRepository>,
//! #     activities: Arc<dyn stageflow_core::repository::ActivityRepository>,
//! #     wf_templates: Arc<dyn stageflow_core::repository::WorkflowTemplateRepository>,
//! #     st_templates: Arc<dyn stageflow_core::repository::StageTemplateRepository>,
//! #     at_templates: Arc<dyn stageflow_core::repository::ActivityTemplateRepository>,
//! #     template_id: uuid::Uuid,
//! # ) -> Result<()> {
//! let engine = WorkflowEngine::builder()
//!     .workflows(workflows)
//!     .stages(stages)
//!     .activities(activities)
//!     .workflow_templates(wf_templates)
//!     .stage_templates(st_templates)
//!     .activity_templates(at_templates)
//!     .build()
//!     .expect("all components wired");
//!
//! let response = engine
//!     .run_to_completion(RunToCompletionRequest {
//!         workflow_template_id: template_id,
//!         input_json: r#"{"client_id": "c-42"}"#.to_string(),
//!         workspace_id: None,
//!         max_iterations: None,
//!     })
//!     .await?;
//! println!("workflow output: {}", response.output);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod models;
pub mod repository;
pub mod schema;
pub mod testing;

// Re-export commonly used types
pub use engine::{WorkflowEngine, WorkflowEngineBuilder};
pub use error::{EngineError, ErrorCategory, Result};

/// Current version of the engine core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    pub use crate::api::{
        AdvanceWorkflowRequest, ContinueWorkflowRequest, ExecuteActivityRequest,
        GetWorkflowStatusRequest, RunToCompletionRequest, StartWorkflowRequest,
    };
    pub use crate::context::ContextTree;
    pub use crate::executor::{ActivityExecutor, ExecutorRegistry};
    pub use crate::models::{
        Activity, ActivityStatus, ActivityType, Stage, StageStatus, Workflow, WorkflowStatus,
    };
    pub use crate::{EngineError, Result, WorkflowEngine};
    pub use async_trait::async_trait;
    pub use serde_json::{json, Value};
    pub use uuid::Uuid;
}
