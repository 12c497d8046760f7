//! Moodle web service executor
//!
//! Moodle answers 200 even when a function fails and reports the failure as
//! `{"exception": ..., "message": ...}` in the body. The executor turns that
//! into `AdapterError::RemoteOperation`, separate from transport failures.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::transport::{FilePart, HttpRequest, HttpResponse, HttpTransport, RequestBody};
use crate::codec::{encode_params, scalar_to_wire};
use crate::credentials::Credentials;
use crate::error::{AdapterError, AdapterResult};
use crate::logging::Logger;
use crate::types::DownloadedFile;

/// REST server endpoint, relative to the site URL
pub const REST_PATH: &str = "/webservice/rest/server.php";
/// Draft file upload endpoint
pub const UPLOAD_PATH: &str = "/webservice/upload.php";
/// Endpoint of the tool_wsdiscovery admin plugin
pub const WSDISCOVERY_PATH: &str = "/admin/tool/wsdiscovery/moodle.php";
/// Built-in function that lists the functions enabled for the token
pub const SITE_INFO_FUNCTION: &str = "core_webservice_get_site_info";

/// Executes requests against a Moodle site
pub struct RemoteExecutor {
    transport: Arc<dyn HttpTransport>,
    logger: Arc<dyn Logger>,
}

impl RemoteExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>, logger: Arc<dyn Logger>) -> Self {
        Self { transport, logger }
    }

    async fn send(&self, request: HttpRequest) -> AdapterResult<HttpResponse> {
        let url = request.url.clone();
        self.logger.debug(&format!("[RemoteExecutor] {:?} {}", request.method, url));

        let response = self.transport.send(request).await.map_err(|e| {
            self.logger.error(&format!("[RemoteExecutor] Request to {} failed: {}", url, e));
            e
        })?;

        if response.status != 200 {
            self.logger.warn(&format!(
                "[RemoteExecutor] Request to {} returned status {}",
                url, response.status
            ));
            return Err(AdapterError::transport(url, response.status, response.text()));
        }
        Ok(response)
    }

    /// Send a request and decode its JSON body
    pub async fn request_json(&self, request: HttpRequest) -> AdapterResult<Value> {
        let url = request.url.clone();
        let response = self.send(request.with_header("Accept", "application/json")).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            self.logger.warn(&format!("[RemoteExecutor] Invalid JSON from {}: {}", url, e));
            AdapterError::transport(url, response.status, response.text())
        })
    }

    /// Like `request_json`, but a body carrying `exception` is an error
    pub async fn request_json_moodle(&self, request: HttpRequest) -> AdapterResult<Value> {
        let value = self.request_json(request).await?;
        match remote_exception(&value) {
            Some(message) => {
                self.logger.warn(&format!("[RemoteExecutor] Moodle reported: {}", message));
                Err(AdapterError::remote(message))
            }
            None => Ok(value),
        }
    }

    /// Call a web service function with nested arguments
    pub async fn call(
        &self,
        credentials: &Credentials,
        function: &str,
        arguments: &Map<String, Value>,
    ) -> AdapterResult<Value> {
        self.logger.info(&format!("[RemoteExecutor] Calling {}", function));

        let mut params = arguments.clone();
        params.insert("wstoken".to_string(), Value::String(credentials.token.clone()));
        params.insert("wsfunction".to_string(), Value::String(function.to_string()));

        let request = HttpRequest::post(
            credentials.endpoint(REST_PATH),
            RequestBody::Form(encode_params(&params)),
        )
        .with_query("moodlewsrestformat", "json");

        self.request_json_moodle(request).await
    }

    /// Upload files into a draft area
    ///
    /// Returns the raw response list; success and error records are told
    /// apart by the presence of `errortype`.
    pub async fn upload(
        &self,
        credentials: &Credentials,
        item_id: Option<&Value>,
        file_path: &str,
        files: Vec<(String, Vec<u8>)>,
    ) -> AdapterResult<Value> {
        self.logger.info(&format!("[RemoteExecutor] Uploading {} file(s) to {}", files.len(), file_path));

        let mut fields = vec![("token".to_string(), credentials.token.clone())];
        if let Some(item_id) = item_id.filter(|v| !v.is_null()) {
            fields.push(("itemid".to_string(), scalar_to_wire(item_id)));
        }
        fields.push(("filepath".to_string(), file_path.to_string()));

        let files = files
            .into_iter()
            .map(|(filename, data)| FilePart {
                field: filename.clone(),
                filename,
                data,
            })
            .collect();

        let request = HttpRequest::post(
            credentials.endpoint(UPLOAD_PATH),
            RequestBody::Multipart { fields, files },
        );
        self.request_json_moodle(request).await
    }

    /// Ask the tool_wsdiscovery plugin for every function with its schemas
    pub async fn discover_functions(&self, credentials: &Credentials) -> AdapterResult<Value> {
        let request = HttpRequest::post(credentials.endpoint(WSDISCOVERY_PATH), RequestBody::Empty)
            .with_header("Authorization", format!("Bearer {}", credentials.token));
        self.request_json_moodle(request).await
    }

    /// POST a JSON payload to an unauthenticated service
    pub async fn post_json(&self, url: &str, payload: Value) -> AdapterResult<Value> {
        self.request_json(HttpRequest::post(url, RequestBody::Json(payload))).await
    }

    /// Fetch raw bytes from an arbitrary URL
    pub async fn fetch(&self, url: &str) -> AdapterResult<Vec<u8>> {
        Ok(self.send(HttpRequest::get(url)).await?.body)
    }

    /// Fetch a pluginfile URL with the token as query parameter
    pub async fn download(&self, url: &str, token: &str) -> AdapterResult<DownloadedFile> {
        self.logger.info(&format!("[RemoteExecutor] Downloading {}", url));
        let response = self.send(HttpRequest::get(url).with_query("token", token)).await?;
        Ok(DownloadedFile::from_response(response.body, &response.headers))
    }
}

/// Error message carried by a Moodle exception body, if any
fn remote_exception(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    let exception = map.get("exception").filter(|e| !e.is_null())?;
    let message = map
        .get("message")
        .filter(|m| !m.is_null())
        .unwrap_or(exception);
    Some(match message {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
