//! Built-in capabilities: draft file upload and authenticated download
//!
//! These two are served by the adapter itself and never go through the
//! operation registry.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::try_join_all;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::credentials::Credentials;
use crate::error::{AdapterError, AdapterResult};
use crate::remote::RemoteExecutor;
use crate::types::{CapabilityDescriptor, DownloadedFile};

pub const UPLOAD_FILES: &str = "upload_files";
pub const DOWNLOAD_FILE: &str = "download_file";

const DEFAULT_FILEPATH: &str = "/";

static UPLOAD_INPUT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "itemid": {
                "type": "integer",
                "description": "Draft item id to add the files to. Omit to create a new draft area."
            },
            "filepath": {
                "type": "string",
                "description": "Directory inside the draft area",
                "default": DEFAULT_FILEPATH
            },
            "files": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "filename": {"type": "string"},
                        "content": {
                            "type": "string",
                            "description": "File contents, base64 data or a URL depending on uploadtype"
                        },
                        "uploadtype": {
                            "type": "string",
                            "enum": ["plaintext", "base64", "url"],
                            "default": "base64"
                        }
                    },
                    "required": ["filename", "content"]
                }
            }
        },
        "required": ["files"]
    })
});

static UPLOAD_OUTPUT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "itemid": {"type": "integer"},
            "filepath": {"type": "string"},
            "files": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "filename": {"type": "string"},
                        "success": {"type": "boolean"},
                        "filesize": {"type": "integer"},
                        "errortype": {"type": "string"},
                        "errormessage": {"type": "string"}
                    }
                }
            }
        }
    })
});

static DOWNLOAD_INPUT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "url": {
                "type": "string",
                "description": "pluginfile.php URL on the Moodle site, absolute or starting with '/'"
            }
        },
        "required": ["url"]
    })
});

/// Whether `name` is served by the adapter itself
pub fn is_builtin(name: &str) -> bool {
    name == UPLOAD_FILES || name == DOWNLOAD_FILE
}

/// Descriptors of the built-in capabilities
pub fn builtin_descriptors() -> Vec<CapabilityDescriptor> {
    vec![
        CapabilityDescriptor::new(
            UPLOAD_FILES,
            "Uploads one or more files to the Moodle draft file area. \
             Returns the draft item id to pass to functions that accept files.",
        )
        .with_input_schema(UPLOAD_INPUT_SCHEMA.clone())
        .with_output_schema(UPLOAD_OUTPUT_SCHEMA.clone()),
        CapabilityDescriptor::new(
            DOWNLOAD_FILE,
            "Downloads a file from the Moodle site given its pluginfile.php URL.",
        )
        .with_input_schema(DOWNLOAD_INPUT_SCHEMA.clone()),
    ]
}

/// How the `content` of an upload entry is to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadType {
    Plaintext,
    #[default]
    Base64,
    Url,
}

impl FromStr for UploadType {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plaintext" => Ok(UploadType::Plaintext),
            "base64" => Ok(UploadType::Base64),
            "url" => Ok(UploadType::Url),
            other => Err(AdapterError::invalid_argument(format!(
                "Unsupported uploadtype '{}', expected plaintext, base64 or url",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadArguments {
    #[serde(default)]
    itemid: Option<Value>,
    #[serde(default)]
    filepath: Option<String>,
    #[serde(default)]
    files: Vec<UploadFileSpec>,
}

#[derive(Debug, Deserialize)]
struct UploadFileSpec {
    filename: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    uploadtype: Option<String>,
}

impl UploadFileSpec {
    fn upload_type(&self) -> AdapterResult<UploadType> {
        self.uploadtype
            .as_deref()
            .map(UploadType::from_str)
            .unwrap_or(Ok(UploadType::default()))
    }
}

/// Materialize every file, upload them and reshape Moodle's answer
pub async fn upload_files(
    executor: &RemoteExecutor,
    credentials: &Credentials,
    arguments: Value,
) -> AdapterResult<Value> {
    let arguments: UploadArguments = serde_json::from_value(arguments)
        .map_err(|e| AdapterError::invalid_argument(format!("Invalid {} arguments: {}", UPLOAD_FILES, e)))?;

    let files = try_join_all(
        arguments
            .files
            .into_iter()
            .map(|spec| materialize(executor, spec)),
    )
    .await?;

    let filepath = arguments.filepath.as_deref().unwrap_or(DEFAULT_FILEPATH);
    let response = executor
        .upload(credentials, arguments.itemid.as_ref(), filepath, files)
        .await?;
    Ok(parse_upload_response(&response))
}

async fn materialize(executor: &RemoteExecutor, spec: UploadFileSpec) -> AdapterResult<(String, Vec<u8>)> {
    let data = match spec.upload_type()? {
        UploadType::Plaintext => spec.content.into_bytes(),
        UploadType::Base64 => {
            let compact: String = spec.content.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD.decode(compact).map_err(|e| {
                AdapterError::invalid_argument(format!("Content of {} is not valid base64: {}", spec.filename, e))
            })?
        }
        UploadType::Url => executor.fetch(&spec.content).await?,
    };
    Ok((spec.filename, data))
}

/// Reshape the mixed success/error list returned by `upload.php`
///
/// `itemid` and `filepath` come from the first success record; Moodle uses
/// the same values for every file of one upload.
pub fn parse_upload_response(response: &Value) -> Value {
    let mut structured = Map::new();
    let mut files = Vec::new();

    for element in response.as_array().map(Vec::as_slice).unwrap_or_default() {
        let field = |key: &str, default: Value| element.get(key).filter(|v| !v.is_null()).cloned().unwrap_or(default);

        if element.get("errortype").map_or(false, |t| !t.is_null()) {
            files.push(json!({
                "filename": field("filename", json!("")),
                "success": false,
                "errortype": field("errortype", Value::Null),
                "errormessage": field("error", json!("")),
                "filesize": field("size", json!(0)),
            }));
        } else {
            if !structured.contains_key("itemid") {
                structured.insert("itemid".to_string(), field("itemid", Value::Null));
                structured.insert("filepath".to_string(), field("filepath", json!("")));
            }
            files.push(json!({
                "filename": field("filename", json!("")),
                "success": true,
                "filesize": field("filesize", json!(0)),
            }));
        }
    }

    structured.insert("files".to_string(), Value::Array(files));
    Value::Object(structured)
}

/// Turn a caller supplied URL into the token-authenticated pluginfile URL
///
/// Accepts absolute URLs on the site and root-relative paths. Plain
/// `/pluginfile.php/...` paths move under `/webservice`.
pub fn authenticated_download_url(base_url: &str, url: &str) -> AdapterResult<String> {
    let path = match url.strip_prefix(base_url).filter(|rest| rest.starts_with('/')) {
        Some(rest) => rest,
        None if url.starts_with('/') => url,
        None => {
            return Err(AdapterError::invalid_argument(format!(
                "The URL must either start with a '/' or be a valid Moodle file URL starting with {}/",
                base_url
            )))
        }
    };

    if path.starts_with("/pluginfile.php") {
        Ok(format!("{}/webservice{}", base_url, path))
    } else if path.starts_with("/webservice/pluginfile.php") {
        Ok(format!("{}{}", base_url, path))
    } else {
        Err(AdapterError::invalid_argument(
            "The provided URL is not a valid Moodle pluginfile URL. \
             It is possible that you can download the file directly without authentication.",
        ))
    }
}

/// Fetch a site file with the caller's token
pub async fn download_file(
    executor: &RemoteExecutor,
    credentials: &Credentials,
    arguments: &Value,
) -> AdapterResult<DownloadedFile> {
    let url = arguments.get("url").and_then(Value::as_str).unwrap_or_default();
    let url = authenticated_download_url(&credentials.base_url, url)?;
    executor.download(&url, &credentials.token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::logging::NoOpLogger;
    use crate::remote::{HttpResponse, MockTransport, RequestBody, UPLOAD_PATH};

    const BASE: &str = "https://lms.example";

    fn executor(mock: MockTransport) -> (RemoteExecutor, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        (RemoteExecutor::new(mock.clone(), Arc::new(NoOpLogger::new())), mock)
    }

    fn creds() -> Credentials {
        Credentials::new(BASE, "tok")
    }

    fn upload_url() -> String {
        format!("{}{}", BASE, UPLOAD_PATH)
    }

    #[test]
    fn test_builtin_descriptors() {
        let descriptors = builtin_descriptors();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec![UPLOAD_FILES, DOWNLOAD_FILE]);
        assert!(descriptors.iter().all(|d| d.input_schema["type"] == "object"));
        assert!(is_builtin("download_file"));
        assert!(!is_builtin("core_webservice_get_site_info"));
    }

    #[test]
    fn test_upload_type_parsing() {
        assert_eq!("url".parse::<UploadType>().unwrap(), UploadType::Url);
        assert_eq!(UploadType::default(), UploadType::Base64);
        assert!(matches!(
            "ftp".parse::<UploadType>().unwrap_err(),
            AdapterError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_parse_mixed_upload_response() {
        let response = json!([
            {"itemid": 5, "filepath": "/", "filename": "a.png", "filesize": 100},
            {"filename": "b.png", "errortype": "file_exists", "error": "File exists", "size": 0}
        ]);
        assert_eq!(
            parse_upload_response(&response),
            json!({
                "itemid": 5,
                "filepath": "/",
                "files": [
                    {"filename": "a.png", "success": true, "filesize": 100},
                    {"filename": "b.png", "success": false, "errortype": "file_exists", "errormessage": "File exists", "filesize": 0}
                ]
            })
        );
    }

    #[test]
    fn test_parse_upload_response_without_successes() {
        let response = json!([{"filename": "b.png", "errortype": "quota", "error": "Quota exceeded", "size": 9}]);
        let parsed = parse_upload_response(&response);
        assert!(parsed.get("itemid").is_none());
        assert_eq!(parsed["files"][0]["errormessage"], "Quota exceeded");
        assert_eq!(parse_upload_response(&json!({"odd": true})), json!({"files": []}));
    }

    #[test]
    fn test_download_url_rules() {
        assert_eq!(
            authenticated_download_url(BASE, "https://lms.example/pluginfile.php/123/mod_resource/content/0/x.pdf").unwrap(),
            "https://lms.example/webservice/pluginfile.php/123/mod_resource/content/0/x.pdf"
        );
        assert_eq!(
            authenticated_download_url(BASE, "/webservice/pluginfile.php/1/a.txt").unwrap(),
            "https://lms.example/webservice/pluginfile.php/1/a.txt"
        );
        assert_eq!(
            authenticated_download_url(BASE, "/pluginfile.php/1/a.txt").unwrap(),
            "https://lms.example/webservice/pluginfile.php/1/a.txt"
        );
    }

    #[test]
    fn test_download_url_rejections() {
        let foreign = authenticated_download_url(BASE, "https://other.example/pluginfile.php/1/a.txt").unwrap_err();
        assert_eq!(
            foreign.to_string(),
            "The URL must either start with a '/' or be a valid Moodle file URL starting with https://lms.example/"
        );

        let lookalike = authenticated_download_url(BASE, "https://lms.example.evil/pluginfile.php/1").unwrap_err();
        assert!(matches!(lookalike, AdapterError::InvalidArgument(_)));

        let not_a_file = authenticated_download_url(BASE, "/course/view.php?id=2").unwrap_err();
        assert!(not_a_file.to_string().contains("not a valid Moodle pluginfile URL"));
    }

    #[tokio::test]
    async fn test_upload_materializes_each_type() {
        let (exec, mock) = executor(
            MockTransport::new()
                .route("https://files.example/logo.png", HttpResponse::new(200, b"PNG".to_vec()))
                .route_json(
                    &upload_url(),
                    200,
                    json!([
                        {"itemid": 7, "filepath": "/docs/", "filename": "a.txt", "filesize": 2},
                        {"itemid": 7, "filepath": "/docs/", "filename": "b.bin", "filesize": 3},
                        {"itemid": 7, "filepath": "/docs/", "filename": "logo.png", "filesize": 3}
                    ]),
                ),
        );

        let result = upload_files(
            &exec,
            &creds(),
            json!({
                "filepath": "/docs/",
                "files": [
                    {"filename": "a.txt", "content": "hi", "uploadtype": "plaintext"},
                    {"filename": "b.bin", "content": "AQI\nD"},
                    {"filename": "logo.png", "content": "https://files.example/logo.png", "uploadtype": "url"}
                ]
            }),
        )
        .await
        .unwrap();
        assert_eq!(result["itemid"], 7);
        assert_eq!(result["files"].as_array().unwrap().len(), 3);

        let upload = &mock.requests_to(&upload_url())[0];
        match &upload.body {
            RequestBody::Multipart { fields, files } => {
                assert!(fields.contains(&("filepath".to_string(), "/docs/".to_string())));
                assert!(!fields.iter().any(|(k, _)| k == "itemid"));
                assert_eq!(files[0].data, b"hi".to_vec());
                assert_eq!(files[1].data, vec![1u8, 2, 3]);
                assert_eq!(files[2].data, b"PNG".to_vec());
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_default_filepath_and_itemid() {
        let (exec, mock) = executor(MockTransport::new().route_json(&upload_url(), 200, json!([])));
        upload_files(&exec, &creds(), json!({"itemid": 42, "files": []})).await.unwrap();

        match &mock.requests()[0].body {
            RequestBody::Multipart { fields, .. } => {
                assert!(fields.contains(&("filepath".to_string(), "/".to_string())));
                assert!(fields.contains(&("itemid".to_string(), "42".to_string())));
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_url_fetch_failure_is_transport_error() {
        let (exec, mock) = executor(
            MockTransport::new()
                .route("https://files.example/", HttpResponse::new(404, "missing"))
                .route_json(&upload_url(), 200, json!([])),
        );
        let err = upload_files(
            &exec,
            &creds(),
            json!({"files": [{"filename": "x", "content": "https://files.example/x", "uploadtype": "url"}]}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AdapterError::Transport { status: Some(404), .. }));
        assert!(mock.requests_to(&upload_url()).is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_input() {
        let (exec, mock) = executor(MockTransport::new().route_json(&upload_url(), 200, json!([])));

        let bad_type = upload_files(
            &exec,
            &creds(),
            json!({"files": [{"filename": "x", "content": "x", "uploadtype": "ftp"}]}),
        )
        .await
        .unwrap_err();
        assert!(matches!(bad_type, AdapterError::InvalidArgument(_)));

        let bad_base64 = upload_files(&exec, &creds(), json!({"files": [{"filename": "x", "content": "***"}]}))
            .await
            .unwrap_err();
        assert!(bad_base64.to_string().contains("not valid base64"));

        let missing_name = upload_files(&exec, &creds(), json!({"files": [{"content": "x"}]}))
            .await
            .unwrap_err();
        assert!(matches!(missing_name, AdapterError::InvalidArgument(_)));

        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_download_file_fetches_rewritten_url() {
        let (exec, mock) = executor(MockTransport::new().route(
            "https://lms.example/webservice/pluginfile.php",
            HttpResponse::new(200, b"%PDF".to_vec())
                .with_header("Content-Disposition", "inline; filename=\"x.pdf\"")
                .with_header("Content-Type", "application/pdf"),
        ));
        let file = download_file(
            &exec,
            &creds(),
            &json!({"url": "https://lms.example/pluginfile.php/123/mod_resource/content/0/x.pdf"}),
        )
        .await
        .unwrap();

        assert_eq!(file.name.as_deref(), Some("x"));
        assert_eq!(file.extension.as_deref(), Some("pdf"));
        let request = &mock.requests()[0];
        assert_eq!(request.url, "https://lms.example/webservice/pluginfile.php/123/mod_resource/content/0/x.pdf");
        assert_eq!(request.query_param("token"), Some("tok"));
    }

    #[tokio::test]
    async fn test_download_missing_url() {
        let (exec, mock) = executor(MockTransport::new());
        let err = download_file(&exec, &creds(), &json!({})).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidArgument(_)));
        assert!(mock.requests().is_empty());
    }
}
