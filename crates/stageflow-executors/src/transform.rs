//! Pure data-reshaping executor.
//!
//! Applies a configured mapping document to the activity's resolved input
//! and returns the derived map. No side effects; useful for adapting one
//! step's output shape to the next step's expectations without writing a
//! bespoke executor.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use stageflow_core::error::Result;
use stageflow_core::executor::ActivityExecutor;
use stageflow_core::models::Activity;
use stageflow_core::schema;

/// Executor reshaping its input through a mapping fixed at registration.
pub struct TransformExecutor {
    mapping: Value,
}

impl TransformExecutor {
    pub fn new(mapping: Value) -> Self {
        Self { mapping }
    }
}

#[async_trait]
impl ActivityExecutor for TransformExecutor {
    #[instrument(skip(self, input), fields(activity_id = %activity.id))]
    async fn execute(&self, activity: &Activity, input: &Value) -> Result<Value> {
        schema::resolve(input, &self.mapping)
    }
}
