//! Mock transport for testing
//!
//! Provides scripted responses without network access. Routes match on a
//! URL prefix and, optionally, on a fragment of the form body, so several
//! REST functions can share the single `server.php` endpoint.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, RequestBody};
use crate::error::{AdapterError, AdapterResult};

/// What a matched route produces
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return this response
    Respond(HttpResponse),
    /// Fail as if the host were unreachable
    Unreachable,
}

#[derive(Debug, Clone)]
struct MockRoute {
    url_prefix: String,
    body_contains: Option<String>,
    outcome: MockOutcome,
}

impl MockRoute {
    fn matches(&self, request: &HttpRequest) -> bool {
        if !request.url.starts_with(&self.url_prefix) {
            return false;
        }
        match (&self.body_contains, &request.body) {
            (None, _) => true,
            (Some(fragment), RequestBody::Form(body)) => body.contains(fragment.as_str()),
            (Some(fragment), RequestBody::Json(value)) => value.to_string().contains(fragment.as_str()),
            (Some(_), _) => false,
        }
    }
}

/// Scripted `HttpTransport`
///
/// Later routes win over earlier ones. Every request is recorded.
///
/// ```
/// use moodle_mcp_core::remote::MockTransport;
/// use serde_json::json;
///
/// let mock = MockTransport::new()
///     .route_json("https://lms.example/webservice/rest/server.php", 200, json!({"sitename": "LMS"}));
/// assert_eq!(mock.requests().len(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, url_prefix: &str, body_contains: Option<String>, outcome: MockOutcome) -> Self {
        self.routes.lock().push(MockRoute {
            url_prefix: url_prefix.to_string(),
            body_contains,
            outcome,
        });
        self
    }

    /// Any request under `url_prefix` gets `response`
    pub fn route(self, url_prefix: &str, response: HttpResponse) -> Self {
        self.push(url_prefix, None, MockOutcome::Respond(response))
    }

    /// Any request under `url_prefix` gets a JSON body
    pub fn route_json(self, url_prefix: &str, status: u16, body: Value) -> Self {
        self.route(url_prefix, HttpResponse::json(status, &body))
    }

    /// Requests under `url_prefix` whose body contains `fragment`
    pub fn route_matching(self, url_prefix: &str, fragment: &str, response: HttpResponse) -> Self {
        self.push(url_prefix, Some(fragment.to_string()), MockOutcome::Respond(response))
    }

    /// A REST call to `function` on the site at `base_url`
    ///
    /// Form keys are encoded sorted, so `wstoken` always follows `wsfunction`.
    pub fn route_function(self, base_url: &str, function: &str, body: Value) -> Self {
        let url = format!("{}{}", base_url, super::executor::REST_PATH);
        let fragment = format!("wsfunction={}&", function);
        self.route_matching(&url, &fragment, HttpResponse::json(200, &body))
    }

    /// Requests under `url_prefix` fail without a response
    pub fn route_unreachable(self, url_prefix: &str) -> Self {
        self.push(url_prefix, None, MockOutcome::Unreachable)
    }

    /// Add a route after construction (e.g. between two list events)
    pub fn add_route_json(&self, url_prefix: &str, status: u16, body: Value) {
        self.routes.lock().push(MockRoute {
            url_prefix: url_prefix.to_string(),
            body_contains: None,
            outcome: MockOutcome::Respond(HttpResponse::json(status, &body)),
        });
    }

    /// Every request seen so far, oldest first
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose URL starts with `url_prefix`
    pub fn requests_to(&self, url_prefix: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.starts_with(url_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> AdapterResult<HttpResponse> {
        self.requests.lock().push(request.clone());

        let outcome = self
            .routes
            .lock()
            .iter()
            .rev()
            .find(|route| route.matches(&request))
            .map(|route| route.outcome.clone());

        match outcome {
            Some(MockOutcome::Respond(response)) => Ok(response),
            Some(MockOutcome::Unreachable) => Err(AdapterError::connection(&request.url, "mock: host unreachable")),
            None => Err(AdapterError::connection(&request.url, "mock: no route")),
        }
    }
}
