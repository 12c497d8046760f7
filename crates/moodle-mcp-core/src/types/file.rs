//! Files downloaded from Moodle

use std::collections::HashMap;

/// A file fetched through `download_file`
///
/// Name, extension and MIME type are derived from the response headers:
/// `Content-Disposition` decides the name and extension, `Content-Type`
/// the MIME type and, when the name has no extension, the extension too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub data: Vec<u8>,
    pub name: Option<String>,
    pub extension: Option<String>,
    pub mime_type: Option<String>,
}

impl DownloadedFile {
    /// Build from a body and lower-cased response headers
    pub fn from_response(data: Vec<u8>, headers: &HashMap<String, String>) -> Self {
        let filename = headers
            .get("content-disposition")
            .and_then(|cd| Self::extract_filename(cd));
        let (name, mut extension) = match filename {
            Some(filename) => Self::split_filename(&filename),
            None => (None, None),
        };
        let mime_type = headers.get("content-type").and_then(|ct| Self::extract_mime_type(ct));

        if extension.is_none() {
            extension = mime_type
                .as_deref()
                .and_then(|mime| mime.rsplit('/').next())
                .filter(|sub| !sub.is_empty())
                .map(str::to_string);
        }

        Self {
            data,
            name,
            extension,
            mime_type,
        }
    }

    /// `filename=` parameter of a Content-Disposition value, quotes stripped
    pub fn extract_filename(content_disposition: &str) -> Option<String> {
        content_disposition
            .split(';')
            .map(str::trim)
            .find_map(|part| {
                let (key, value) = part.split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("filename")
                    .then(|| value.trim().trim_matches('"').to_string())
            })
    }

    /// Split at the last dot into name and extension
    pub fn split_filename(filename: &str) -> (Option<String>, Option<String>) {
        match filename.rsplit_once('.') {
            Some((name, ext)) => (Some(name.to_string()), Some(ext.to_string())),
            None => (Some(filename.to_string()), None),
        }
    }

    /// MIME type without parameters
    pub fn extract_mime_type(content_type: &str) -> Option<String> {
        content_type
            .split(';')
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    /// Full file name, e.g. `report.pdf`
    pub fn file_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or("file");
        match &self.extension {
            Some(ext) => format!("{}.{}", name, ext),
            None => name.to_string(),
        }
    }

    /// MIME type, defaulting to octet-stream
    pub fn mime_type_or_default(&self) -> &str {
        self.mime_type.as_deref().unwrap_or("application/octet-stream")
    }
}
