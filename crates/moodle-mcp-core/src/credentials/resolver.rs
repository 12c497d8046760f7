//! Chained credential resolution
//!
//! Sources are consulted in priority order and each field is resolved on its
//! own: the token may come from a header while the site URL comes from the
//! environment.

use std::sync::Arc;

use reqwest::Url;

use super::env_source::EnvCredentialSource;
use super::header_source::HeaderCredentialSource;
use super::traits::{CredentialSource, Credentials};
use crate::error::{AdapterError, AdapterResult};

/// Trim, drop trailing slashes and lower-case a site URL
pub fn clean_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_lowercase()
}

/// Whether `url` is an absolute http(s) URL with a host
pub fn is_valid_base_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Resolves credentials from an ordered list of sources
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use moodle_mcp_core::credentials::{CredentialResolver, MemoryCredentialSource};
///
/// let resolver = CredentialResolver::new(vec![
///     Arc::new(MemoryCredentialSource::with_values("https://LMS.example/", "tok")),
/// ]);
/// let creds = resolver.verify_resolve().unwrap();
/// assert_eq!(creds.base_url, "https://lms.example");
/// ```
#[derive(Clone)]
pub struct CredentialResolver {
    sources: Vec<Arc<dyn CredentialSource>>,
}

impl CredentialResolver {
    /// Create a resolver over `sources`, highest priority first
    pub fn new(sources: Vec<Arc<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Request headers first, then `fallback` sources in order
    pub fn for_request(headers: HeaderCredentialSource, fallback: &[Arc<dyn CredentialSource>]) -> Self {
        let mut sources: Vec<Arc<dyn CredentialSource>> = Vec::with_capacity(fallback.len() + 1);
        sources.push(Arc::new(headers));
        sources.extend(fallback.iter().cloned());
        Self::new(sources)
    }

    /// Environment-only resolver (stdio transport has no headers)
    pub fn from_env() -> Self {
        Self::new(vec![Arc::new(EnvCredentialSource::new())])
    }

    /// Names of the configured sources, in priority order
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Resolve both fields; either may come back empty
    ///
    /// An invalid site URL is discarded and the next source is tried.
    pub fn resolve(&self) -> Credentials {
        let base_url = self
            .sources
            .iter()
            .filter_map(|s| s.base_url())
            .map(|raw| clean_base_url(&raw))
            .find(|url| is_valid_base_url(url))
            .unwrap_or_default();

        let token = self
            .sources
            .iter()
            .filter_map(|s| s.token())
            .map(|raw| raw.trim().to_string())
            .find(|t| !t.is_empty())
            .unwrap_or_default();

        Credentials { base_url, token }
    }

    /// Resolve and require both fields
    ///
    /// Must pass before any remote interaction.
    pub fn verify_resolve(&self) -> AdapterResult<Credentials> {
        let credentials = self.resolve();
        if credentials.is_complete() {
            Ok(credentials)
        } else {
            Err(AdapterError::MissingCredentials)
        }
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("sources", &self.source_names())
            .finish()
    }
}
