//! Capability catalog
//!
//! Discovers which Moodle functions the token may call and keeps a registry
//! of them keyed by (function name, output shape identity).
//!
//! ```text
//! discover()                         register()
//!   tier 1: tool_wsdiscovery  ─┐       name ─┬─ shape A ─ RegisteredOperation
//!   tier 2: site info names   ─┼─ lookup     └─ shape B ─ RegisteredOperation
//!   (first success wins)      ─┘  service
//! ```

mod descriptor;
mod registry;
mod discovery;

pub use descriptor::{OperationDescriptor, RegisteredOperation, ShapeIdentity};
pub use registry::OperationRegistry;
pub use discovery::{Catalog, DiscoveryTier};
