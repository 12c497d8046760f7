//! Proxy dispatcher
//!
//! The surface the host framework talks to:
//!
//! ```text
//! host ── list_capabilities ──▶ ProxyDispatcher ── Catalog (discover + register)
//!      ── invoke_capability ──▶       │
//!                                     ├── upload_files / download_file (built-in)
//!                                     └── RemoteExecutor::call + repair_all
//! ```

mod context;
mod builtin;
mod proxy;

pub use context::{HostContext, RecordingHostContext};
pub use builtin::{
    authenticated_download_url, builtin_descriptors, is_builtin, parse_upload_response,
    UploadType, DOWNLOAD_FILE, UPLOAD_FILES,
};
pub use proxy::ProxyDispatcher;
