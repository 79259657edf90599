// Configuration loader
// Reads and writes <root>/config/overthinker.toml, creating defaults on first use

use std::fs;
use std::path::{Path, PathBuf};

use super::constants::CONFIG_RELATIVE_PATH;
use super::settings::PlannerConfig;
use crate::errors::{PlannerError, Result};

/// Persistent home of the singleton `PlannerConfig`.
///
/// Every `load()` re-reads the file, so edits made through the API (or by hand)
/// apply to the next run without restarting the process.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store rooted at a project directory (config lives in `config/overthinker.toml`).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(CONFIG_RELATIVE_PATH),
        }
    }

    /// Store backed by an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, writing the defaults first if the file does not exist.
    pub fn load(&self) -> Result<PlannerConfig> {
        if !self.path.exists() {
            let config = PlannerConfig::default();
            self.save(&config)?;
            tracing::info!(path = %self.path.display(), "Created default configuration");
            return Ok(config);
        }

        let contents =
            fs::read_to_string(&self.path).map_err(|e| PlannerError::io(&self.path, e))?;
        let config: PlannerConfig = toml::from_str(&contents).map_err(|e| {
            PlannerError::Config(format!("{}: {}", self.path.display(), e.message()))
        })?;
        config
            .validate()
            .map_err(|e| PlannerError::Config(format!("{}: {}", self.path.display(), e)))?;
        Ok(config)
    }

    /// Validate and persist `config`, replacing whatever was there.
    pub fn save(&self, config: &PlannerConfig) -> Result<()> {
        config.validate()?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PlannerError::io(parent, e))?;
        }
        let contents = toml::to_string_pretty(config)
            .map_err(|e| PlannerError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&self.path, contents).map_err(|e| PlannerError::io(&self.path, e))
    }
}
