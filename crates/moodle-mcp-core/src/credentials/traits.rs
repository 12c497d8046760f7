//! Core traits and types for credential sources

use std::fmt;

/// Site URL and web service token for one request
///
/// The base URL is already cleaned (no trailing slash, lower-case) and
/// validated; either field may be empty when nothing usable was found.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub base_url: String,
    pub token: String,
}

impl Credentials {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Both fields present
    pub fn is_complete(&self) -> bool {
        !self.base_url.is_empty() && !self.token.is_empty()
    }

    /// Absolute URL for a site-relative path such as `/webservice/upload.php`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// Tokens must never show up in logs or panic messages
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("token", &if self.token.is_empty() { "<empty>" } else { "<redacted>" })
            .finish()
    }
}

/// A place credentials can be read from
///
/// Values are returned raw; cleaning and validation happen in
/// `CredentialResolver` so every source is treated the same.
pub trait CredentialSource: Send + Sync {
    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Raw site URL, if this source has one
    fn base_url(&self) -> Option<String>;

    /// Raw web service token, if this source has one
    fn token(&self) -> Option<String>;
}
