//! Credential resolution for Moodle requests
//!
//! Every remote interaction needs a site URL and a web service token. They
//! come from the inbound request (`x-moodle` / `x-token` headers) and fall
//! back to the process environment (`MOODLE` / `TOKEN`).
//!
//! - `CredentialSource` trait for pluggable sources
//! - Built-in sources: `HeaderCredentialSource`, `EnvCredentialSource`, `MemoryCredentialSource`
//! - `CredentialResolver` chains sources and validates the result

mod traits;
mod header_source;
mod env_source;
mod memory_source;
mod resolver;

pub use traits::{Credentials, CredentialSource};
pub use header_source::{HeaderCredentialSource, BASE_URL_HEADER, TOKEN_HEADER};
pub use env_source::{EnvCredentialSource, BASE_URL_ENV, TOKEN_ENV};
pub use memory_source::MemoryCredentialSource;
pub use resolver::{clean_base_url, is_valid_base_url, CredentialResolver};
