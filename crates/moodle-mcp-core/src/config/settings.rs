//! Adapter settings and environment overrides

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Public schema lookup service. Receives function names or raw function
/// lists only, never site URLs or tokens.
pub const DEFAULT_LOOKUP_URL: &str = "https://api.mcp-ready.lmscloud.io/noauth/lookup";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Runtime settings for the adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Timeout applied to every outbound HTTP request
    pub request_timeout_secs: u64,
    /// Schema lookup service endpoint
    pub lookup_url: String,
    /// User-Agent header sent to Moodle and the lookup service
    pub user_agent: String,
    /// Minimum level for the console logger
    pub log_level: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            user_agent: format!("moodle-mcp/{}", env!("CARGO_PKG_VERSION")),
            log_level: "info".to_string(),
        }
    }
}

impl AdapterConfig {
    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed log level (falls back to info)
    pub fn log_level(&self) -> LogLevel {
        self.log_level.parse().unwrap_or_default()
    }

    /// Set the request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set the lookup service URL
    pub fn with_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.lookup_url = url.into();
        self
    }

    /// Apply `MOODLE_MCP_*` overrides read through `lookup`
    ///
    /// Taking the lookup as a function keeps tests away from process state.
    pub fn apply_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("MOODLE_MCP_TIMEOUT").filter(|v| !v.trim().is_empty()) {
            self.request_timeout_secs = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "MOODLE_MCP_TIMEOUT".to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("MOODLE_MCP_LOOKUP_URL").filter(|v| !v.trim().is_empty()) {
            self.lookup_url = value.trim().to_string();
        }
        if let Some(value) = lookup("MOODLE_MCP_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            value.parse::<LogLevel>().map_err(|_| ConfigError::InvalidValue {
                key: "MOODLE_MCP_LOG_LEVEL".to_string(),
                value: value.clone(),
            })?;
            self.log_level = value.trim().to_lowercase();
        }
        Ok(self)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.lookup_url, DEFAULT_LOOKUP_URL);
        assert_eq!(config.log_level(), LogLevel::Info);
        assert!(config.user_agent.starts_with("moodle-mcp/"));
    }

    #[test]
    fn test_overrides() {
        let config = AdapterConfig::default()
            .apply_overrides(vars(&[
                ("MOODLE_MCP_TIMEOUT", " 5 "),
                ("MOODLE_MCP_LOOKUP_URL", "http://localhost:9000/lookup"),
                ("MOODLE_MCP_LOG_LEVEL", "DEBUG"),
            ]))
            .unwrap();

        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.lookup_url, "http://localhost:9000/lookup");
        assert_eq!(config.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_empty_overrides_are_ignored() {
        let config = AdapterConfig::default()
            .apply_overrides(vars(&[("MOODLE_MCP_TIMEOUT", "  ")]))
            .unwrap();
        assert_eq!(config, AdapterConfig::default());
    }

    #[test]
    fn test_invalid_overrides() {
        let err = AdapterConfig::default()
            .apply_overrides(vars(&[("MOODLE_MCP_TIMEOUT", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MOODLE_MCP_TIMEOUT"));

        let err = AdapterConfig::default()
            .apply_overrides(vars(&[("MOODLE_MCP_LOG_LEVEL", "chatty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
