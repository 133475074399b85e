//! Engine configuration.
//!
//! Two knobs only: the template cache TTL and the `run_to_completion`
//! iteration budget. Both have sensible defaults and can be loaded from the
//! environment for deployments that tune them per instance.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cache::DEFAULT_TEMPLATE_TTL;

/// Iteration budget when none is supplied by the caller.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

const ENV_CACHE_TTL_SECS: &str = "STAGEFLOW_CACHE_TTL_SECS";
const ENV_MAX_ITERATIONS: &str = "STAGEFLOW_MAX_ITERATIONS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("engine is missing a required component: {component}")]
    MissingComponent { component: String },
}

/// Runtime tuning for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lifetime of template cache entries.
    pub template_cache_ttl: Duration,
    /// Default `run_to_completion` iteration cap; requests may lower or
    /// raise it per call.
    pub max_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_cache_ttl: DEFAULT_TEMPLATE_TTL,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        let ttl_secs = load_with_default(ENV_CACHE_TTL_SECS, DEFAULT_TEMPLATE_TTL.as_secs())?;
        let max_iterations = load_with_default(ENV_MAX_ITERATIONS, DEFAULT_MAX_ITERATIONS)?;
        Ok(Self {
            template_cache_ttl: Duration::from_secs(ttl_secs),
            max_iterations,
        })
    }
}

fn load_with_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.template_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.max_iterations, 100);
    }

    #[test]
    fn parse_helper_reports_key_on_failure() {
        env::set_var("STAGEFLOW_TEST_BAD_VALUE", "not-a-number");
        let result: Result<u32, _> = load_with_default("STAGEFLOW_TEST_BAD_VALUE", 5);
        env::remove_var("STAGEFLOW_TEST_BAD_VALUE");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("STAGEFLOW_TEST_BAD_VALUE"));
    }
}
