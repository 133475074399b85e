//! Notification executor: sends e-mail through a pluggable transport.
//!
//! The transport seam keeps the executor testable and lets deployments plug
//! SMTP, an API-based provider, or a spooling table without touching the
//! engine. Activity input shape:
//!
//! ```json
//! {
//!   "to": [ { "address": "a@example.com", "name": "Ada" } ],
//!   "subject": "Your subscription is live",
//!   "body": "Welcome aboard!"
//! }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use stageflow_core::error::{EngineError, Result};
use stageflow_core::executor::ActivityExecutor;
use stageflow_core::models::Activity;

/// One recipient of an outbound message.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Recipient {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A fully composed outbound message.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EmailMessage {
    pub to: Vec<Recipient>,
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

/// Delivery seam implemented per deployment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Deliver the message, returning a provider message id.
    async fn send(&self, message: &EmailMessage) -> Result<String>;
}

/// Executor delivering one e-mail per activity.
pub struct EmailExecutor {
    transport: Arc<dyn EmailTransport>,
}

impl EmailExecutor {
    pub fn new(transport: Arc<dyn EmailTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ActivityExecutor for EmailExecutor {
    #[instrument(skip(self, input), fields(activity_id = %activity.id))]
    async fn execute(&self, activity: &Activity, input: &Value) -> Result<Value> {
        let message: EmailMessage =
            serde_json::from_value(input.clone()).map_err(|e| EngineError::ValidationFailed {
                message: format!("email input is malformed: {}", e),
            })?;
        if message.to.is_empty() {
            return Err(EngineError::ValidationFailed {
                message: "email requires at least one recipient".to_string(),
            });
        }

        let message_id = self.transport.send(&message).await?;
        info!(%message_id, recipients = message.to.len(), "email dispatched");

        Ok(json!({
            "message_id": message_id,
            "recipient_count": message.to.len(),
        }))
    }
}
