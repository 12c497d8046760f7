//! Capability discovery
//!
//! Two strategies are tried in order; the first that succeeds wins:
//!
//! 1. [`DiscoveryTier::WsDiscovery`] asks the `tool_wsdiscovery` plugin for
//!    the full function list.
//! 2. [`DiscoveryTier::SiteInfo`] calls `core_webservice_get_site_info` for
//!    the names of the enabled functions.
//!
//! Either way the list goes to the shape lookup service, which answers with
//! descriptors carrying input and output schemas. The lookup service is
//! unauthenticated and never sees the token.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::descriptor::{OperationDescriptor, RegisteredOperation};
use super::registry::OperationRegistry;
use crate::credentials::Credentials;
use crate::error::{AdapterError, AdapterResult};
use crate::logging::Logger;
use crate::remote::{RemoteExecutor, SITE_INFO_FUNCTION};

/// One strategy for listing the functions available to a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryTier {
    /// The site-local `tool_wsdiscovery` endpoint
    WsDiscovery,
    /// Function names from `core_webservice_get_site_info`
    SiteInfo,
}

impl DiscoveryTier {
    /// Tiers in the order they are attempted
    pub const ORDER: [DiscoveryTier; 2] = [DiscoveryTier::WsDiscovery, DiscoveryTier::SiteInfo];

    pub fn label(&self) -> &'static str {
        match self {
            DiscoveryTier::WsDiscovery => "tool_wsdiscovery",
            DiscoveryTier::SiteInfo => "site_info",
        }
    }

    /// Key under which the function list is sent to the lookup service
    fn lookup_key(&self) -> &'static str {
        match self {
            DiscoveryTier::WsDiscovery => "functions",
            DiscoveryTier::SiteInfo => "functionnames",
        }
    }
}

impl fmt::Display for DiscoveryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Discovers operations and records them in an [`OperationRegistry`]
pub struct Catalog {
    executor: Arc<RemoteExecutor>,
    registry: Arc<OperationRegistry>,
    lookup_url: String,
    logger: Arc<dyn Logger>,
}

impl Catalog {
    pub fn new(executor: Arc<RemoteExecutor>, lookup_url: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_registry(executor, Arc::new(OperationRegistry::new()), lookup_url, logger)
    }

    /// Share an existing registry (e.g. one per long-lived session)
    pub fn with_registry(
        executor: Arc<RemoteExecutor>,
        registry: Arc<OperationRegistry>,
        lookup_url: impl Into<String>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            executor,
            registry,
            lookup_url: lookup_url.into(),
            logger,
        }
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    pub fn lookup_url(&self) -> &str {
        &self.lookup_url
    }

    /// List the operations callable with `credentials`
    ///
    /// Transport and remote failures move on to the next tier. When every
    /// tier fails the error carries each tier's message, in order.
    pub async fn discover(&self, credentials: &Credentials) -> AdapterResult<Vec<OperationDescriptor>> {
        let mut tier_errors = Vec::new();

        for tier in DiscoveryTier::ORDER {
            match self.discover_with(tier, credentials).await {
                Ok(descriptors) => {
                    self.logger.info(&format!(
                        "[Catalog] Discovered {} operation(s) via {}",
                        descriptors.len(),
                        tier
                    ));
                    return Ok(descriptors);
                }
                Err(e) if e.is_tier_fallthrough() => {
                    self.logger.warn(&format!("[Catalog] Discovery via {} failed: {}", tier, e));
                    tier_errors.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        self.logger.error("[Catalog] No discovery tier succeeded");
        Err(AdapterError::Discovery { tier_errors })
    }

    /// Run a single tier
    pub async fn discover_with(
        &self,
        tier: DiscoveryTier,
        credentials: &Credentials,
    ) -> AdapterResult<Vec<OperationDescriptor>> {
        let listing = match tier {
            DiscoveryTier::WsDiscovery => self.executor.discover_functions(credentials).await?,
            DiscoveryTier::SiteInfo => {
                self.executor
                    .call(credentials, SITE_INFO_FUNCTION, &Map::new())
                    .await?
            }
        };
        let functions = listing.get("functions").cloned().unwrap_or_else(|| json!([]));

        let mut payload = Map::new();
        payload.insert(tier.lookup_key().to_string(), functions);
        self.lookup(Value::Object(payload)).await
    }

    async fn lookup(&self, payload: Value) -> AdapterResult<Vec<OperationDescriptor>> {
        let response = self.executor.post_json(&self.lookup_url, payload).await?;
        Ok(self.parse_lookup_response(response))
    }

    /// `functions` of a lookup response; anything malformed counts as empty
    fn parse_lookup_response(&self, response: Value) -> Vec<OperationDescriptor> {
        let entries = match response {
            Value::Object(mut map) => match map.remove("functions") {
                Some(Value::Array(entries)) => entries,
                _ => Vec::new(),
            },
            _ => {
                self.logger.warn("[Catalog] Lookup service returned a non-object response");
                Vec::new()
            }
        };

        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<OperationDescriptor>(entry) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    self.logger.warn(&format!("[Catalog] Skipping malformed descriptor: {}", e));
                    None
                }
            })
            .collect()
    }

    /// Record a discovery batch; returns the batch, not the whole registry
    pub fn register(&self, descriptors: Vec<OperationDescriptor>) -> Vec<RegisteredOperation> {
        let batch = self.registry.register(descriptors);
        self.logger.debug(&format!(
            "[Catalog] Registered {} operation(s), {} shape(s) known",
            batch.len(),
            self.registry.shape_count()
        ));
        batch
    }

    /// `discover` followed by `register`
    pub async fn refresh(&self, credentials: &Credentials) -> AdapterResult<Vec<RegisteredOperation>> {
        let descriptors = self.discover(credentials).await?;
        Ok(self.register(descriptors))
    }
}
