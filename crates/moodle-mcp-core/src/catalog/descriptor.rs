//! Discovered operations and their shape identities

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::types::{CapabilityDescriptor, CapabilityIcon};

const MOODLE_LOGO_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24">
    <path d="M 14 3 L 6 4 L 0 8 L 1 8 L 1 18 L 2 18 L 2 8 L 4.0117188 8 C 4.0095011 8.0674642 4 8.1234456 4 8.1933594 C 4 9.3773594 4.3222656 10.197266 4.3222656 10.197266 L 8.765625 11.261719 L 12.013672 7.5878906 C 12.013672 7.5878906 11.719624 6.3603845 11.048828 5.4589844 L 14 3 z M 18.5 7 C 16.929012 7 15.507649 7.6748712 14.501953 8.7441406 C 14.243588 8.469398 13.961651 8.2154569 13.652344 7.9980469 L 11.632812 10.283203 C 12.440812 10.698203 13 11.531 13 12.5 L 13 20 L 16 20 L 16 12.5 C 16 11.101774 17.101774 10 18.5 10 C 19.898226 10 21 11.101774 21 12.5 L 21 20 L 24 20 L 24 12.5 C 24 9.4802259 21.519774 7 18.5 7 z M 5.0332031 11.910156 C 5.0122031 12.104156 5 12.301 5 12.5 L 5 20 L 8 20 L 8 12.621094 L 5.0332031 11.910156 z"/>
</svg>"#;

/// Moodle logo as a `data:` URI, attached to every discovered capability
static MOODLE_ICON: Lazy<CapabilityIcon> = Lazy::new(|| {
    CapabilityIcon::new(
        format!("data:image/svg+xml;base64,{}", STANDARD.encode(MOODLE_LOGO_SVG)),
        "image/svg+xml",
    )
});

/// A Moodle function as returned by the lookup service
///
/// Created fresh on every discovery pass and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(rename = "inputSchema", default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(rename = "outputSchema", default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: None,
            output_schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

/// SHA-256 (hex) of an output schema's canonical JSON
///
/// Object keys are sorted at every level before hashing, so equal schemas
/// hash equally regardless of the key order they arrived in. A missing
/// schema hashes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeIdentity(String);

impl ShapeIdentity {
    pub fn of(schema: Option<&Value>) -> Self {
        let canonical = canonicalize(schema.unwrap_or(&Value::Null)).to_string();
        Self(format!("{:x}", Sha256::digest(canonical.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rebuild `value` with object keys inserted in sorted order
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|key| (key.clone(), canonicalize(&map[key])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

impl fmt::Display for ShapeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A descriptor together with the identity of its output shape
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredOperation {
    pub descriptor: OperationDescriptor,
    pub identity: ShapeIdentity,
}

impl RegisteredOperation {
    pub fn new(descriptor: OperationDescriptor) -> Self {
        let identity = ShapeIdentity::of(descriptor.output_schema.as_ref());
        Self { descriptor, identity }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

impl From<&RegisteredOperation> for CapabilityDescriptor {
    fn from(op: &RegisteredOperation) -> Self {
        let descriptor = &op.descriptor;
        let mut capability =
            CapabilityDescriptor::new(&descriptor.name, &descriptor.description).with_icon(MOODLE_ICON.clone());
        if let Some(input) = descriptor.input_schema.as_ref().filter(|s| s.is_object()) {
            capability = capability.with_input_schema(input.clone());
        }
        if let Some(output) = &descriptor.output_schema {
            capability = capability.with_output_schema(output.clone());
        }
        capability
    }
}
