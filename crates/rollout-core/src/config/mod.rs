//! Configuration for the planning core
//!
//! Loaded from `rollout.toml`. Every section has defaults, so an absent
//! file yields a usable configuration.

pub mod parser;
pub mod store;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use parser::{parse_rollout_toml, parse_rollout_toml_str, to_toml};
pub use store::ConfigStore;

/// Environment variable that overrides `build_system.token`.
pub const TOKEN_ENV_VAR: &str = "ROLLOUT_BUILD_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Remote build system client settings
    #[serde(default)]
    pub build_system: BuildSystemConfig,

    /// Planning behaviour
    #[serde(default)]
    pub planning: PlanningConfig,
}

/// Remote build system client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSystemConfig {
    /// Per-call timeout in seconds; 0 disables the limit
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// REST API version sent with every request
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// User agent for outbound requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Personal access token for basic auth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for BuildSystemConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            api_version: default_api_version(),
            user_agent: default_user_agent(),
            token: None,
        }
    }
}

impl BuildSystemConfig {
    /// The per-call timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Planning behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Recursion bound applied when flattening component trees
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_version() -> String {
    "6.0".to_string()
}

fn default_user_agent() -> String {
    concat!("rollout/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_tree_depth() -> usize {
    crate::component::DEFAULT_MAX_DEPTH
}

impl RolloutConfig {
    /// Create a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate values that serde cannot check.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.build_system.api_version.trim().is_empty() {
            anyhow::bail!("build_system.api_version must not be empty");
        }
        if self.planning.max_tree_depth == 0 {
            anyhow::bail!("planning.max_tree_depth must be at least 1");
        }
        Ok(())
    }

    /// Replace the token with `ROLLOUT_BUILD_TOKEN` when it is set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_token_override(std::env::var(TOKEN_ENV_VAR).ok());
    }

    fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.build_system.token = Some(token);
        }
    }
}
