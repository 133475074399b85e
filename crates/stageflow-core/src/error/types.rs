//! Error types for all engine operations.
//!
//! Every failure mode of the six orchestration operations is a variant of
//! [`EngineError`]. Variants carry enough context to act on the failure
//! without parsing message strings: a missing entity names its kind and id,
//! a suspension carries the blocking activity, an exhausted driver carries
//! its iteration budget.

use uuid::Uuid;

/// Primary error type for all engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A referenced workflow, stage, activity, or template does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"workflow"` or `"activity template"`.
        entity: String,
        /// Identity that failed to resolve.
        id: String,
    },

    /// Caller input violated the declarative schema or was structurally
    /// malformed. The message enumerates every violation found in the call.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    /// The requested transition is not allowed from the current state, e.g.
    /// executing a completed activity or continuing an activity that belongs
    /// to a different workflow.
    #[error("illegal state: {message}")]
    IllegalState { message: String },

    /// A manual-class activity blocks automatic execution. The workflow
    /// remains runnable; a human tool is expected to pick the activity up
    /// and resume through `continue_workflow`.
    #[error("activity {activity_id} requires manual input")]
    SuspensionRequired { activity_id: Uuid },

    /// No executor is registered for the activity's type tag.
    #[error("no executor registered for activity type: {activity_type}")]
    ExecutorNotFound { activity_type: String },

    /// The executor returned an error. The activity has already been
    /// persisted as `failed` with this message by the time the error
    /// surfaces.
    #[error("executor failed: {message}")]
    ExecutorFailed { message: String },

    /// A workflow template has no stage templates and cannot be started.
    #[error("workflow template {workflow_template_id} has no stages")]
    TemplateIncomplete { workflow_template_id: Uuid },

    /// The repository layer reported a failure.
    #[error("storage failed: {message}")]
    StorageFailed { message: String },

    /// `run_to_completion` exhausted its iteration budget without the
    /// workflow reaching a terminal status.
    #[error("workflow did not complete within {limit} iterations")]
    IterationLimitExceeded { limit: u32 },

    /// A JSON-bearing field could not be parsed or serialized.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

impl EngineError {
    /// Shorthand for a [`EngineError::NotFound`] with a typed id.
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::SerializationError {
            message: error.to_string(),
        }
    }
}
