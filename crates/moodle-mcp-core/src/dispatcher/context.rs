//! The host framework as seen from the dispatcher

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

/// Per-request view of the host framework
///
/// Provides the inbound request headers (empty for stdio) and a way to tell
/// connected clients that the capability list has changed.
#[async_trait]
pub trait HostContext: Send + Sync {
    /// Value of a request header, matched case-insensitively
    fn header(&self, name: &str) -> Option<String>;

    /// Signal that previously listed capabilities may be gone
    async fn notify_capability_list_changed(&self);
}

/// `HostContext` backed by a header map that counts notifications
///
/// Used by tests and by hosts without a notification channel.
#[derive(Debug, Default)]
pub struct RecordingHostContext {
    headers: HashMap<String, String>,
    notifications: AtomicUsize,
}

impl RecordingHostContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// How many list-changed notifications were sent
    pub fn notification_count(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostContext for RecordingHostContext {
    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_lowercase()).cloned()
    }

    async fn notify_capability_list_changed(&self) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}
