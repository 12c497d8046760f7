//! Request header credential source

use std::collections::HashMap;

use super::traits::CredentialSource;

/// Header carrying the Moodle site URL
pub const BASE_URL_HEADER: &str = "x-moodle";
/// Header carrying the web service token
pub const TOKEN_HEADER: &str = "x-token";

/// Credentials taken from the headers of the inbound request
///
/// Header names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct HeaderCredentialSource {
    headers: HashMap<String, String>,
}

impl HeaderCredentialSource {
    /// Build from header name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            headers: pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Build from a header lookup function, e.g. one backed by the host request
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_pairs(
            [BASE_URL_HEADER, TOKEN_HEADER]
                .into_iter()
                .filter_map(|name| lookup(name).map(|value| (name, value))),
        )
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).filter(|v| !v.trim().is_empty()).cloned()
    }
}

impl CredentialSource for HeaderCredentialSource {
    fn name(&self) -> &str {
        "headers"
    }

    fn base_url(&self) -> Option<String> {
        self.header(BASE_URL_HEADER)
    }

    fn token(&self) -> Option<String> {
        self.header(TOKEN_HEADER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_case_insensitive() {
        let source = HeaderCredentialSource::from_pairs([
            ("X-Moodle", "https://lms.example/"),
            ("X-TOKEN", "tok"),
        ]);
        assert_eq!(source.base_url(), Some("https://lms.example/".to_string()));
        assert_eq!(source.token(), Some("tok".to_string()));
    }

    #[test]
    fn test_blank_headers_are_absent() {
        let source = HeaderCredentialSource::from_pairs([("x-moodle", "  "), ("x-token", "")]);
        assert_eq!(source.base_url(), None);
        assert_eq!(source.token(), None);
    }

    #[test]
    fn test_from_lookup() {
        let source = HeaderCredentialSource::from_lookup(|name| {
            (name == "x-token").then(|| "from-host".to_string())
        });
        assert_eq!(source.token(), Some("from-host".to_string()));
        assert_eq!(source.base_url(), None);
    }
}
