//! In-memory credential source

use parking_lot::RwLock;

use super::traits::CredentialSource;

/// Credential source backed by plain values
///
/// Used by embedders that already know the site (e.g. a per-user session
/// store) and by tests in place of the process environment.
#[derive(Debug, Default)]
pub struct MemoryCredentialSource {
    base_url: RwLock<Option<String>>,
    token: RwLock<Option<String>>,
}

impl MemoryCredentialSource {
    /// An empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// A source holding both values
    pub fn with_values(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: RwLock::new(Some(base_url.into())),
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn set_base_url(&self, base_url: Option<String>) {
        *self.base_url.write() = base_url;
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}

impl CredentialSource for MemoryCredentialSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn base_url(&self) -> Option<String> {
        self.base_url.read().clone()
    }

    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}
