//! Adapter error types

use thiserror::Error;

/// Message shown when no usable site URL or token could be resolved
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Moodle site URL or web service token not provided. \
Please provide them using 'x-moodle' and 'x-token' HTTP headers or environment variables 'MOODLE' and 'TOKEN'.";

/// Errors that can occur while discovering or proxying Moodle web services
#[derive(Error, Debug)]
pub enum AdapterError {
    /// No site URL or token available for this request
    #[error("{}", MISSING_CREDENTIALS_MESSAGE)]
    MissingCredentials,

    /// Network failure, timeout, non-200 status or a body that is not JSON
    #[error("Request to {url} returned {}: {body}", format_status(.status))]
    Transport {
        url: String,
        status: Option<u16>,
        body: String,
    },

    /// Moodle answered 200 but reported an exception in the body
    #[error("{message}")]
    RemoteOperation { message: String },

    /// Neither discovery tier produced a function list
    #[error(
        "Unable to load available external functions from your Moodle site. \
         Make sure that you either installed tool_wsdiscovery plugin or \
         enabled function core_webservice_get_site_info. \n\n\
         More details about the error:\n{}",
        format_tier_errors(.tier_errors)
    )]
    Discovery { tier_errors: Vec<String> },

    /// The capability is unknown to the registry, the caller must re-list
    #[error("Something went wrong, there is a possible cache issue in the MCP server. Please repeat the request. (unknown tool: {name})")]
    StaleCapability { name: String },

    /// Malformed caller input
    #[error("{0}")]
    InvalidArgument(String),

    /// JSON error while shaping results for the host
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

fn format_tier_errors(errors: &[String]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {}", i + 1, e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl AdapterError {
    /// Create a transport error for a response that came back
    pub fn transport(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            status: Some(status),
            body: body.into(),
        }
    }

    /// Create a transport error for a request that never got a response
    pub fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            status: None,
            body: message.into(),
        }
    }

    /// Create a remote operation error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteOperation {
            message: message.into(),
        }
    }

    /// Create a stale capability error
    pub fn stale(name: impl Into<String>) -> Self {
        Self::StaleCapability { name: name.into() }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether a failed discovery tier should fall through to the next one
    pub fn is_tier_fallthrough(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RemoteOperation { .. })
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;
