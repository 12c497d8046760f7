//! Production transport on reqwest

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};

use super::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody};
use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterResult};

/// `HttpTransport` backed by a shared `reqwest::Client`
///
/// The client carries the configured timeout; a timed out request surfaces
/// as a transport error with no status.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client from the adapter configuration
    pub fn new(config: &AdapterConfig) -> AdapterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AdapterError::connection("http-client", e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Error text without the request URL, whose query may carry the token
    fn describe(err: reqwest::Error) -> String {
        let err = err.without_url();
        if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> AdapterResult<HttpResponse> {
        let HttpRequest {
            method,
            url,
            query,
            headers,
            body,
        } = request;

        let mut builder = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Form(encoded) => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encoded),
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart { fields, files } => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                for file in files {
                    form = form.part(file.field, Part::bytes(file.data).file_name(file.filename));
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| AdapterError::connection(&url, Self::describe(e)))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| AdapterError::connection(&url, Self::describe(e)))?
            .to_vec();

        Ok(HttpResponse { status, headers, body })
    }
}
