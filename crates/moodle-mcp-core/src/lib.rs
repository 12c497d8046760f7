//! Moodle MCP Core
//!
//! Runtime-agnostic engine that exposes the web service functions of a
//! Moodle site as MCP tools without knowing in advance which functions exist.
//! The host framework (an rmcp server, a gateway, a test harness) owns the
//! request lifecycle and calls into a [`ProxyDispatcher`].
//!
//! ## Proxying
//!
//! - Credentials come from the `x-moodle` / `x-token` request headers or the
//!   `MOODLE` / `TOKEN` environment variables
//! - Discovery asks `tool_wsdiscovery`, falling back to
//!   `core_webservice_get_site_info`, and fetches schemas from a lookup service
//! - Calls are flattened into Moodle's bracketed form encoding and results are
//!   repaired where PHP sent `[]` for an empty object
//!
//! ```rust,ignore
//! use moodle_mcp_core::{AdapterConfig, ConsoleLogger, ProxyDispatcher, RecordingHostContext};
//! use std::sync::Arc;
//!
//! let config = AdapterConfig::default().with_env_overrides()?;
//! let dispatcher = ProxyDispatcher::from_config(&config, Arc::new(ConsoleLogger::new()))?;
//!
//! let ctx = RecordingHostContext::new()
//!     .with_header("x-moodle", "https://lms.example")
//!     .with_header("x-token", token);
//!
//! let tools = dispatcher.list_capabilities(&ctx, vec![]).await?;
//! let result = dispatcher
//!     .invoke_capability(&ctx, "core_webservice_get_site_info", json!({}))
//!     .await?;
//! ```

pub mod error;
pub mod logging;
pub mod config;
pub mod credentials;
pub mod codec;
pub mod types;
pub mod remote;
pub mod catalog;
pub mod dispatcher;
pub mod mcp;

// Re-export commonly used types
pub use error::{AdapterError, AdapterResult};

pub use logging::{Logger, LogLevel, NoOpLogger, ConsoleLogger, MemoryLogger};

pub use config::{AdapterConfig, FileConfigLoader, ConfigError};

pub use credentials::{
    Credentials, CredentialSource, CredentialResolver,
    HeaderCredentialSource, EnvCredentialSource, MemoryCredentialSource,
};

pub use codec::{encode_params, repair, repair_all};

pub use types::{CapabilityDescriptor, CapabilityIcon, CallResult, DownloadedFile};

pub use remote::{HttpTransport, ReqwestTransport, MockTransport, RemoteExecutor};

pub use catalog::{Catalog, DiscoveryTier, OperationDescriptor, OperationRegistry, RegisteredOperation, ShapeIdentity};

pub use dispatcher::{HostContext, ProxyDispatcher, RecordingHostContext, UPLOAD_FILES, DOWNLOAD_FILE};

// MCP model types from the official rmcp SDK
pub use mcp::{McpTool, McpToolResult, error_result, tools_from};
