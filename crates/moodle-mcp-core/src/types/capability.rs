//! Capability (tool) descriptors and call results exchanged with the host

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::file::DownloadedFile;

/// A callable capability as shown to the host framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Capability name (Moodle function name or built-in name)
    pub name: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema of the arguments
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
    /// JSON Schema of the structured result
    #[serde(rename = "outputSchema", default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Icons shown next to the capability
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icons: Vec<CapabilityIcon>,
}

/// Icon reference, usually a `data:` URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityIcon {
    pub src: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl CapabilityIcon {
    pub fn new(src: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            mime_type: Some(mime_type.into()),
        }
    }
}

fn empty_object_schema() -> Value {
    json!({"type": "object"})
}

impl CapabilityDescriptor {
    /// Create a descriptor that takes no arguments
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
            output_schema: None,
            icons: Vec::new(),
        }
    }

    /// Set the input schema
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Set the output schema
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_icon(mut self, icon: CapabilityIcon) -> Self {
        self.icons.push(icon);
        self
    }
}

/// Result of invoking a capability
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    /// JSON result, already repaired against the known output shapes
    Structured(Value),
    /// Binary file from `download_file`
    File(DownloadedFile),
}

impl CallResult {
    /// Structured content, if this is a JSON result
    pub fn structured(&self) -> Option<&Value> {
        match self {
            CallResult::Structured(value) => Some(value),
            CallResult::File(_) => None,
        }
    }

    /// Downloaded file, if this is a binary result
    pub fn file(&self) -> Option<&DownloadedFile> {
        match self {
            CallResult::File(file) => Some(file),
            CallResult::Structured(_) => None,
        }
    }
}
