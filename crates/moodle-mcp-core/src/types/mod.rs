//! Core types for the Moodle MCP adapter

mod capability;
mod file;

pub use capability::{CapabilityDescriptor, CapabilityIcon, CallResult};
pub use file::DownloadedFile;
