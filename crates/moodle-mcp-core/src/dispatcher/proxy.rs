//! Proxy dispatcher
//!
//! Handles the two host events. Both resolve credentials first and fail with
//! `MissingCredentials` before touching the network.
//!
//! - list: discover, register, and return the new batch with the built-ins
//!   and the host's own capabilities appended
//! - invoke: serve built-ins directly, otherwise call the Moodle function and
//!   repair its result against every shape registered for the name

use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::builtin::{self, builtin_descriptors, DOWNLOAD_FILE, UPLOAD_FILES};
use super::context::HostContext;
use crate::catalog::{Catalog, OperationRegistry};
use crate::codec::repair_all;
use crate::config::AdapterConfig;
use crate::credentials::{CredentialResolver, CredentialSource, Credentials, EnvCredentialSource, HeaderCredentialSource};
use crate::error::{AdapterError, AdapterResult};
use crate::logging::Logger;
use crate::remote::{HttpTransport, RemoteExecutor, ReqwestTransport};
use crate::types::{CallResult, CapabilityDescriptor};

/// Entry point for the host framework
///
/// One dispatcher is shared by every request of a server; the registry it
/// holds grows additively across list events.
pub struct ProxyDispatcher {
    executor: Arc<RemoteExecutor>,
    catalog: Catalog,
    credential_fallback: Vec<Arc<dyn CredentialSource>>,
    logger: Arc<dyn Logger>,
}

impl ProxyDispatcher {
    /// Create a dispatcher over `transport`
    ///
    /// Credentials missing from request headers fall back to the `MOODLE`
    /// and `TOKEN` environment variables.
    pub fn new(transport: Arc<dyn HttpTransport>, config: &AdapterConfig, logger: Arc<dyn Logger>) -> Self {
        let executor = Arc::new(RemoteExecutor::new(transport, logger.clone()));
        let catalog = Catalog::new(executor.clone(), config.lookup_url.clone(), logger.clone());
        Self {
            executor,
            catalog,
            credential_fallback: vec![Arc::new(EnvCredentialSource::new())],
            logger,
        }
    }

    /// Create a dispatcher on the production HTTP client
    pub fn from_config(config: &AdapterConfig, logger: Arc<dyn Logger>) -> AdapterResult<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config, logger))
    }

    /// Replace the sources consulted after the request headers
    pub fn with_credential_fallback(mut self, sources: Vec<Arc<dyn CredentialSource>>) -> Self {
        self.credential_fallback = sources;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        self.catalog.registry()
    }

    fn credentials(&self, ctx: &dyn HostContext) -> AdapterResult<Credentials> {
        let headers = HeaderCredentialSource::from_lookup(|name| ctx.header(name));
        CredentialResolver::for_request(headers, &self.credential_fallback)
            .verify_resolve()
            .map_err(|e| {
                self.logger.warn("[ProxyDispatcher] Request without usable credentials");
                e
            })
    }

    /// Handle a list-capabilities event
    pub async fn list_capabilities(
        &self,
        ctx: &dyn HostContext,
        host_capabilities: Vec<CapabilityDescriptor>,
    ) -> AdapterResult<Vec<CapabilityDescriptor>> {
        let credentials = self.credentials(ctx)?;
        let batch = self.catalog.refresh(&credentials).await?;

        // Invocation of a built-in name never reaches the site.
        let mut capabilities: Vec<CapabilityDescriptor> = batch
            .iter()
            .filter(|op| {
                let shadowed = builtin::is_builtin(op.name());
                if shadowed {
                    self.logger.debug(&format!(
                        "[ProxyDispatcher] Discovered {} is shadowed by the built-in",
                        op.name()
                    ));
                }
                !shadowed
            })
            .map(CapabilityDescriptor::from)
            .collect();
        capabilities.extend(builtin_descriptors());
        capabilities.extend(host_capabilities);

        self.logger.info(&format!(
            "[ProxyDispatcher] Listing {} capabilities ({} discovered)",
            capabilities.len(),
            batch.len()
        ));
        Ok(capabilities)
    }

    /// Handle an invoke-capability event
    pub async fn invoke_capability(
        &self,
        ctx: &dyn HostContext,
        name: &str,
        arguments: Value,
    ) -> AdapterResult<CallResult> {
        let credentials = self.credentials(ctx)?;

        match name {
            UPLOAD_FILES => {
                let structured = builtin::upload_files(&self.executor, &credentials, arguments).await?;
                return Ok(CallResult::Structured(structured));
            }
            DOWNLOAD_FILE => {
                let file = builtin::download_file(&self.executor, &credentials, &arguments).await?;
                return Ok(CallResult::File(file));
            }
            _ => {}
        }

        // A miss means the registry was rebuilt since the caller listed.
        let Some(shapes) = self.catalog.registry().shapes_for(name) else {
            self.logger.warn(&format!(
                "[ProxyDispatcher] Unknown capability {}, asking the client to re-list",
                name
            ));
            ctx.notify_capability_list_changed().await;
            return Err(AdapterError::stale(name));
        };

        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(AdapterError::invalid_argument(format!(
                    "Arguments for {} must be an object, got {}",
                    name, other
                )))
            }
        };

        let result = self.executor.call(&credentials, name, &arguments).await?;
        let repaired = repair_all(
            json!({ "result": result }),
            shapes.iter().map(|op| op.descriptor.output_schema.as_ref()),
        );
        Ok(CallResult::Structured(repaired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialSource;
    use crate::dispatcher::RecordingHostContext;
    use crate::logging::{LogLevel, MemoryLogger};
    use crate::remote::{HttpResponse, MockTransport, WSDISCOVERY_PATH, UPLOAD_PATH};

    const BASE: &str = "https://lms.example";
    const LOOKUP: &str = "https://lookup.example/noauth/lookup";

    fn dispatcher(mock: MockTransport) -> (ProxyDispatcher, Arc<MockTransport>, Arc<MemoryLogger>) {
        let mock = Arc::new(mock);
        let logger = Arc::new(MemoryLogger::new());
        let config = AdapterConfig::default().with_lookup_url(LOOKUP);
        let dispatcher = ProxyDispatcher::new(mock.clone(), &config, logger.clone())
            .with_credential_fallback(vec![Arc::new(MemoryCredentialSource::new())]);
        (dispatcher, mock, logger)
    }

    fn ctx() -> RecordingHostContext {
        RecordingHostContext::new()
            .with_header("x-moodle", "https://LMS.example/")
            .with_header("x-token", "tok")
    }

    fn wsdiscovery_url() -> String {
        format!("{}{}", BASE, WSDISCOVERY_PATH)
    }

    fn lookup_returns(mock: MockTransport, functions: Value) -> MockTransport {
        mock.route_json(&wsdiscovery_url(), 200, json!({"functions": []}))
            .route_json(LOOKUP, 200, json!({ "functions": functions }))
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_both_events() {
        let (dispatcher, mock, _) = dispatcher(MockTransport::new());
        let empty = RecordingHostContext::new();

        let err = dispatcher.list_capabilities(&empty, vec![]).await.unwrap_err();
        assert!(matches!(err, AdapterError::MissingCredentials));
        assert!(err.to_string().contains("'x-moodle' and 'x-token'"));

        let err = dispatcher
            .invoke_capability(&empty, "download_file", json!({"url": "/pluginfile.php/1/a"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::MissingCredentials));

        let invalid_url = RecordingHostContext::new()
            .with_header("x-moodle", "lms.example")
            .with_header("x-token", "tok");
        let err = dispatcher.list_capabilities(&invalid_url, vec![]).await.unwrap_err();
        assert!(matches!(err, AdapterError::MissingCredentials));

        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_source_supplies_credentials() {
        let (dispatcher, mock, _) = dispatcher(
            MockTransport::new()
                .route_json("https://env.example/admin/tool/wsdiscovery/moodle.php", 200, json!({"functions": []}))
                .route_json(LOOKUP, 200, json!({"functions": []})),
        );
        let dispatcher = dispatcher.with_credential_fallback(vec![Arc::new(MemoryCredentialSource::with_values(
            "https://env.example",
            "env-token",
        ))]);

        let listed = dispatcher.list_capabilities(&RecordingHostContext::new(), vec![]).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(mock.requests()[0].header("authorization"), Some("Bearer env-token"));
    }

    #[tokio::test]
    async fn test_list_appends_builtins_and_host_capabilities() {
        let (dispatcher, _, _) = dispatcher(lookup_returns(
            MockTransport::new(),
            json!([
                {"name": "core_get_courses", "description": "Courses", "inputSchema": {}, "outputSchema": {"type": "object"}},
                {"name": "download_file", "description": "Site provided", "inputSchema": {"type": "object"}}
            ]),
        ));
        let host = vec![CapabilityDescriptor::new("ping", "Host tool")];

        let listed = dispatcher.list_capabilities(&ctx(), host).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["core_get_courses", "upload_files", "download_file", "ping"]);
        assert_eq!(listed[0].input_schema, json!({}));
        assert_ne!(listed[2].description, "Site provided");
        assert_eq!(listed[2].input_schema, builtin_descriptors()[1].input_schema);
    }

    #[tokio::test]
    async fn test_list_surfaces_discovery_error() {
        let (dispatcher, _, _) = dispatcher(
            MockTransport::new()
                .route(&wsdiscovery_url(), HttpResponse::new(404, "not installed"))
                .route_function(BASE, "core_webservice_get_site_info", json!({"exception": "x", "message": "disabled"})),
        );
        let err = dispatcher.list_capabilities(&ctx(), vec![]).await.unwrap_err();
        assert!(matches!(err, AdapterError::Discovery { .. }));
        assert!(dispatcher.registry().names().is_empty());
    }

    #[tokio::test]
    async fn test_courses_scenario() {
        let (dispatcher, mock, _) = dispatcher(
            lookup_returns(
                MockTransport::new(),
                json!([{"name": "core_get_courses", "inputSchema": {}, "outputSchema": {"type": "array", "items": {"type": "object"}}}]),
            )
            .route_function(BASE, "core_get_courses", json!([])),
        );
        let ctx = ctx();

        dispatcher.list_capabilities(&ctx, vec![]).await.unwrap();
        assert_eq!(dispatcher.registry().shapes_for("core_get_courses").unwrap().len(), 1);

        let result = dispatcher
            .invoke_capability(&ctx, "core_get_courses", json!({"options": {"ids": [1]}}))
            .await
            .unwrap();
        assert_eq!(result.structured(), Some(&json!({"result": []})));

        let call = mock.requests_to(&format!("{}/webservice/rest/server.php", BASE));
        assert_eq!(call.len(), 1);
        assert_eq!(call[0].query_param("moodlewsrestformat"), Some("json"));
    }

    #[tokio::test]
    async fn test_result_repaired_against_every_shape() {
        let mock = Arc::new(
            MockTransport::new()
                .route_json(&wsdiscovery_url(), 200, json!({"functions": []}))
                .route_json(
                    LOOKUP,
                    200,
                    json!({"functions": [{"name": "core_user_get_prefs", "outputSchema": {
                        "type": "object",
                        "properties": {"result": {"type": "object", "properties": {"a": {"type": "object"}}}}
                    }}]}),
                )
                .route_function(BASE, "core_user_get_prefs", json!({"a": [], "b": [], "c": []})),
        );
        let logger = Arc::new(MemoryLogger::new());
        let dispatcher = ProxyDispatcher::new(mock.clone(), &AdapterConfig::default().with_lookup_url(LOOKUP), logger)
            .with_credential_fallback(vec![]);
        let ctx = ctx();

        dispatcher.list_capabilities(&ctx, vec![]).await.unwrap();
        mock.add_route_json(
            LOOKUP,
            200,
            json!({"functions": [{"name": "core_user_get_prefs", "outputSchema": {
                "type": "object",
                "properties": {"result": {"type": "object", "properties": {"b": {"type": "object"}}}}
            }}]}),
        );
        dispatcher.list_capabilities(&ctx, vec![]).await.unwrap();
        assert_eq!(dispatcher.registry().shapes_for("core_user_get_prefs").unwrap().len(), 2);

        let result = dispatcher
            .invoke_capability(&ctx, "core_user_get_prefs", json!({}))
            .await
            .unwrap();
        assert_eq!(result.structured(), Some(&json!({"result": {"a": {}, "b": {}, "c": []}})));
    }

    #[tokio::test]
    async fn test_unknown_capability_is_stale() {
        let (dispatcher, mock, logger) = dispatcher(MockTransport::new());
        let ctx = ctx();

        let err = dispatcher
            .invoke_capability(&ctx, "core_get_courses", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::StaleCapability { ref name } if name == "core_get_courses"));
        assert!(err.to_string().contains("Please repeat the request"));
        assert_eq!(ctx.notification_count(), 1);

        dispatcher.invoke_capability(&ctx, "core_get_courses", json!({})).await.unwrap_err();
        assert_eq!(ctx.notification_count(), 2);

        assert!(mock.requests().is_empty());
        assert!(logger.contains(LogLevel::Warn, "re-list"));
    }

    #[tokio::test]
    async fn test_remote_exception_surfaces() {
        let (dispatcher, _, _) = dispatcher(
            lookup_returns(MockTransport::new(), json!([{"name": "core_x"}]))
                .route_function(BASE, "core_x", json!({"exception": "invalid_parameter_exception", "message": "Invalid parameter value detected"})),
        );
        let ctx = ctx();
        dispatcher.list_capabilities(&ctx, vec![]).await.unwrap();

        let err = dispatcher.invoke_capability(&ctx, "core_x", json!({})).await.unwrap_err();
        assert!(matches!(err, AdapterError::RemoteOperation { .. }));
        assert_eq!(ctx.notification_count(), 0);
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let (dispatcher, mock, _) = dispatcher(lookup_returns(MockTransport::new(), json!([{"name": "core_x"}])));
        let ctx = ctx();
        dispatcher.list_capabilities(&ctx, vec![]).await.unwrap();
        let before = mock.requests().len();

        let err = dispatcher.invoke_capability(&ctx, "core_x", json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidArgument(_)));
        assert_eq!(mock.requests().len(), before);
    }

    #[tokio::test]
    async fn test_upload_scenario() {
        let (dispatcher, mock, _) = dispatcher(MockTransport::new().route_json(
            &format!("{}{}", BASE, UPLOAD_PATH),
            200,
            json!([
                {"itemid": 5, "filepath": "/", "filename": "a.png", "filesize": 100},
                {"filename": "b.png", "errortype": "file_exists", "error": "File exists", "size": 0}
            ]),
        ));

        let result = dispatcher
            .invoke_capability(
                &ctx(),
                "upload_files",
                json!({"files": [
                    {"filename": "a.png", "content": "aGk="},
                    {"filename": "b.png", "content": "aGk="}
                ]}),
            )
            .await
            .unwrap();
        assert_eq!(
            result.structured(),
            Some(&json!({
                "itemid": 5,
                "filepath": "/",
                "files": [
                    {"filename": "a.png", "success": true, "filesize": 100},
                    {"filename": "b.png", "success": false, "errortype": "file_exists", "errormessage": "File exists", "filesize": 0}
                ]
            }))
        );
        // built-ins never consult discovery
        assert!(mock.requests_to(LOOKUP).is_empty());
    }

    #[tokio::test]
    async fn test_download_scenario() {
        let (dispatcher, mock, _) = dispatcher(MockTransport::new().route(
            "https://lms.example/webservice/pluginfile.php",
            HttpResponse::new(200, b"%PDF-1.7".to_vec()).with_header("Content-Type", "application/pdf"),
        ));

        let result = dispatcher
            .invoke_capability(
                &ctx(),
                "download_file",
                json!({"url": "https://lms.example/pluginfile.php/123/mod_resource/content/0/x.pdf"}),
            )
            .await
            .unwrap();

        let file = result.file().unwrap();
        assert_eq!(file.data, b"%PDF-1.7".to_vec());
        assert_eq!(file.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(file.extension.as_deref(), Some("pdf"));
        assert_eq!(
            mock.requests()[0].url,
            "https://lms.example/webservice/pluginfile.php/123/mod_resource/content/0/x.pdf"
        );
    }

    #[tokio::test]
    async fn test_download_rejects_foreign_url() {
        let (dispatcher, mock, _) = dispatcher(MockTransport::new());
        let err = dispatcher
            .invoke_capability(&ctx(), "download_file", json!({"url": "https://other.example/pluginfile.php/1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidArgument(_)));
        assert!(mock.requests().is_empty());
    }
}
