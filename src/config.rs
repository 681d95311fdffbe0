//! Clock configuration
//!
//! Loaded from `dclock.toml`; every field is optional.

use crate::store::PersistentStore;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the project root
pub const CONFIG_FILE: &str = "dclock.toml";

/// Default sync worker period
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Directory holding clock artifacts
    pub state_dir: PathBuf,

    /// Sync worker period in milliseconds
    pub tick_interval_ms: u64,

    /// Flush staging files to the device before rotating them in
    pub durable_writes: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("."),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            durable_writes: true,
        }
    }
}

impl ClockConfig {
    pub fn with_state_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: dir.into(),
            ..Self::default()
        }
    }

    /// Load config from `path`, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ClockConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `dclock.toml` from the project root
    ///
    /// A relative `state_dir` is resolved against the project root.
    pub fn load_or_default(project_root: &Path) -> Result<Self> {
        let mut config = Self::load(&project_root.join(CONFIG_FILE))?;
        if config.state_dir.is_relative() {
            config.state_dir = project_root.join(&config.state_dir);
        }
        Ok(config)
    }

    /// Save config to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Store rooted at `state_dir`
    pub fn store(&self) -> PersistentStore {
        PersistentStore::new(&self.state_dir).with_durable_writes(self.durable_writes)
    }
}
