//! Outbound HTTP call executor.
//!
//! Drives JSON requests against collaborator services (payment providers,
//! CRM systems, internal APIs) from a declarative activity input:
//!
//! ```json
//! {
//!   "method": "POST",
//!   "url": "https://billing.internal/charges",
//!   "headers": { "x-idempotency-key": "wf-123" },
//!   "body": { "amount_cents": 4200, "currency": "EUR" }
//! }
//! ```
//!
//! The output carries the response status and parsed JSON body (falling
//! back to a string for non-JSON responses). Non-2xx statuses fail the
//! activity so the failure is recorded on the instance.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use stageflow_core::error::{EngineError, Result};
use stageflow_core::executor::ActivityExecutor;
use stageflow_core::models::Activity;

#[derive(Debug, Deserialize)]
struct CallSpec {
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: std::collections::HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Executor performing one JSON HTTP request per activity.
pub struct HttpCallExecutor {
    client: reqwest::Client,
}

impl HttpCallExecutor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (timeouts, proxies, TLS settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn parse_spec(input: &Value) -> Result<(CallSpec, Method)> {
        let spec: CallSpec =
            serde_json::from_value(input.clone()).map_err(|e| EngineError::ValidationFailed {
                message: format!("http_call input is malformed: {}", e),
            })?;
        let method = spec.method.to_uppercase().parse::<Method>().map_err(|_| {
            EngineError::ValidationFailed {
                message: format!("http_call method {:?} is not valid", spec.method),
            }
        })?;
        Ok((spec, method))
    }
}

impl Default for HttpCallExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityExecutor for HttpCallExecutor {
    #[instrument(skip(self, input), fields(activity_id = %activity.id))]
    async fn execute(&self, activity: &Activity, input: &Value) -> Result<Value> {
        let (spec, method) = Self::parse_spec(input)?;
        debug!(method = %method, url = %spec.url, "dispatching http call");

        let mut request = self.client.request(method, &spec.url);
        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::ExecutorFailed {
                message: format!("http call to {} failed: {}", spec.url, e),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EngineError::ExecutorFailed {
                message: format!("reading response from {} failed: {}", spec.url, e),
            })?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if !status.is_success() {
            return Err(EngineError::ExecutorFailed {
                message: format!("{} returned {}: {}", spec.url, status, body),
            });
        }

        Ok(json!({
            "status": status.as_u16(),
            "body": body,
        }))
    }
}
