//! Environment variable credential source

use std::env;

use super::traits::CredentialSource;

/// Environment variable carrying the Moodle site URL
pub const BASE_URL_ENV: &str = "MOODLE";
/// Environment variable carrying the web service token
pub const TOKEN_ENV: &str = "TOKEN";

/// Credentials read from `MOODLE` and `TOKEN`
///
/// Read-only and read on every call, so a changed environment is picked up
/// without restarting.
#[derive(Debug, Default)]
pub struct EnvCredentialSource {
    _private: (),
}

impl EnvCredentialSource {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn var(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl CredentialSource for EnvCredentialSource {
    fn name(&self) -> &str {
        "env"
    }

    fn base_url(&self) -> Option<String> {
        Self::var(BASE_URL_ENV)
    }

    fn token(&self) -> Option<String> {
        Self::var(TOKEN_ENV)
    }
}
