//! Adapter configuration
//!
//! - `AdapterConfig`: timeouts, lookup service URL, user agent, log level
//! - `FileConfigLoader`: YAML file loading (~/.config/moodle-mcp/config.yaml)
//!   with environment overrides

mod settings;
mod file;

pub use settings::{AdapterConfig, ConfigError, ConfigResult, DEFAULT_LOOKUP_URL};
pub use file::FileConfigLoader;
