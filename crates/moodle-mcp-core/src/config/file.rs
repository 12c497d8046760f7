//! File-based configuration loading (YAML)
//!
//! Reads `~/.config/moodle-mcp/config.yaml` or an explicit path. A missing
//! file is not an error: defaults apply.

use std::fs;
use std::path::{Path, PathBuf};

use super::settings::{AdapterConfig, ConfigResult};

/// Loads `AdapterConfig` from a YAML file
///
/// # Example
///
/// ```no_run
/// use moodle_mcp_core::config::FileConfigLoader;
///
/// let config = FileConfigLoader::user().load_with_env().unwrap();
/// println!("timeout: {:?}", config.request_timeout());
/// ```
#[derive(Debug, Clone)]
pub struct FileConfigLoader {
    path: PathBuf,
}

impl FileConfigLoader {
    /// Loader for a specific path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loader for the user-level config file
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("moodle-mcp").join("config.yaml"))
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the config file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the file, or defaults if it does not exist
    pub fn load(&self) -> ConfigResult<AdapterConfig> {
        if !self.exists() {
            return Ok(AdapterConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(AdapterConfig::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load the file and then apply `MOODLE_MCP_*` environment overrides
    pub fn load_with_env(&self) -> ConfigResult<AdapterConfig> {
        self.load()?.with_env_overrides()
    }
}
