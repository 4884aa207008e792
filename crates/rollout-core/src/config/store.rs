//! Config store for loading and saving rollout.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{RolloutConfig, parser};

const CONFIG_FILE_NAME: &str = "rollout.toml";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store rooted at `<config_dir>/rollout/rollout.toml`.
    pub fn from_default_dir() -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("rollout");
        Ok(Self::from_path(dir.join(CONFIG_FILE_NAME)))
    }

    pub fn from_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file, falling back to defaults when it does not exist.
    ///
    /// `ROLLOUT_BUILD_TOKEN` is applied on top of whatever was loaded.
    pub fn load(&self) -> anyhow::Result<RolloutConfig> {
        let mut config = if self.config_path.exists() {
            parser::parse_rollout_toml(&self.config_path)?
        } else {
            RolloutConfig::new()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self, config: &RolloutConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
