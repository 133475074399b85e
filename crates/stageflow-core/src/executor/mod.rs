//! # Activity Executors
//!
//! Activities are executed by pluggable executors registered under an
//! `activity_type` tag. An executor receives the activity instance and its
//! resolved input and returns the activity's output. Executors are expected
//! to bear side effects (send an email, charge a card, create an entity) but
//! must never mutate engine state directly — the runner persists activity
//! status and context updates from the returned output.
//!
//! The three reserved manual-class tags (`manual`, `human_task`, `approval`)
//! cannot be associated with an executor: encountering them during execution
//! is a suspension signal, not a dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::models::{Activity, ActivityType};

/// A pluggable handler for one activity type.
///
/// Implementations must be thread-safe: one executor instance serves every
/// concurrent workflow that reaches its tag.
#[async_trait]
pub trait ActivityExecutor: Send + Sync {
    /// Perform the activity's work and return its output document.
    async fn execute(&self, activity: &Activity, input: &Value) -> Result<Value>;
}

impl std::fmt::Debug for dyn ActivityExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn ActivityExecutor").finish()
    }
}

/// Tag-indexed lookup surface for activity executors.
///
/// The registry is populated once at startup and shared read-only across
/// all engine operations.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn ActivityExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate an executor with an activity type tag.
    ///
    /// Reserved manual-class tags are rejected: manual steps suspend, they
    /// do not dispatch.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        executor: Arc<dyn ActivityExecutor>,
    ) -> Result<()> {
        let tag = tag.into();
        if ActivityType::from(tag.as_str()).is_manual() {
            return Err(EngineError::IllegalState {
                message: format!("cannot register an executor for reserved tag {:?}", tag),
            });
        }
        self.executors.insert(tag, executor);
        Ok(())
    }

    /// Look up the executor for a tag.
    pub fn get(&self, tag: &str) -> Result<Arc<dyn ActivityExecutor>> {
        self.executors
            .get(tag)
            .cloned()
            .ok_or_else(|| EngineError::ExecutorNotFound {
                activity_type: tag.to_string(),
            })
    }

    /// Whether any executor is registered under the tag.
    pub fn contains(&self, tag: &str) -> bool {
        self.executors.contains_key(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Echo;

    #[async_trait]
    impl ActivityExecutor for Echo {
        async fn execute(&self, _activity: &Activity, input: &Value) -> Result<Value> {
            Ok(input.clone())
        }
    }

    #[test]
    fn registers_and_resolves_automated_tags() {
        let mut registry = ExecutorRegistry::new();
        registry.register("echo", Arc::new(Echo)).unwrap();
        assert!(registry.contains("echo"));
        assert!(registry.get("echo").is_ok());
    }

    #[test]
    fn reserved_tags_are_rejected() {
        let mut registry = ExecutorRegistry::new();
        for tag in ["manual", "human_task", "approval"] {
            let err = registry.register(tag, Arc::new(Echo)).unwrap_err();
            assert!(matches!(err, EngineError::IllegalState { .. }));
        }
    }

    #[test]
    fn unknown_tag_is_executor_not_found() {
        let registry = ExecutorRegistry::new();
        let err = registry.get("charge_card").unwrap_err();
        assert!(matches!(
            err,
            EngineError::ExecutorNotFound { activity_type } if activity_type == "charge_card"
        ));
    }

    #[tokio::test]
    async fn executors_receive_resolved_input() {
        let mut registry = ExecutorRegistry::new();
        registry.register("echo", Arc::new(Echo)).unwrap();
        let activity = crate::testing::fixtures::pending_activity(1, 0);
        let output = registry
            .get("echo")
            .unwrap()
            .execute(&activity, &json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(output["message"], "hi");
    }
}
