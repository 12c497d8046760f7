//! Remote Moodle communication
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  RemoteExecutor              │  REST calls, uploads, downloads,
//! │                              │  exception-in-200 detection
//! └──────────────────────────────┘
//!           │ HttpRequest / HttpResponse
//!           ▼
//! ┌──────────────────────────────┐
//! │  HttpTransport               │  ReqwestTransport (bounded timeout)
//! │                              │  MockTransport (tests)
//! └──────────────────────────────┘
//! ```

mod transport;
mod reqwest_transport;
mod mock;
mod executor;

pub use transport::{FilePart, HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody};
pub use reqwest_transport::ReqwestTransport;
pub use mock::{MockOutcome, MockTransport};
pub use executor::{RemoteExecutor, REST_PATH, SITE_INFO_FUNCTION, UPLOAD_PATH, WSDISCOVERY_PATH};
