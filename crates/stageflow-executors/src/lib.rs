//! # Stageflow Executors
//!
//! Built-in activity executors for the stageflow orchestration engine.
//! This crate provides ready-to-use executor implementations:
//!
//! - [`http::HttpCallExecutor`] — outbound JSON HTTP calls to collaborator
//!   services
//! - [`email::EmailExecutor`] — notification steps over a pluggable
//!   transport
//! - [`transform::TransformExecutor`] — pure data reshaping through the
//!   schema processor, no side effects
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stageflow_core::executor::ExecutorRegistry;
//! use stageflow_executors::http::HttpCallExecutor;
//! use stageflow_executors::transform::TransformExecutor;
//!
//! # fn main() -> stageflow_core::Result<()> {
//! let mut registry = ExecutorRegistry::new();
//! registry.register("http_call", Arc::new(HttpCallExecutor::new()))?;
//! registry.register(
//!     "shape_invoice",
//!     Arc::new(TransformExecutor::new(serde_json::json!({
//!         "invoice.total": "$.amount",
//!         "invoice.currency": {"source": "$.currency", "default": "EUR"},
//!     }))),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod email;
pub mod http;
pub mod transform;

pub use email::EmailExecutor;
pub use http::HttpCallExecutor;
pub use transform::TransformExecutor;

/// Current version of the executors library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
