//! Conversions between adapter types and rmcp model types

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rmcp::model::{CallToolResult, Content, Tool};
use serde_json::json;

use crate::error::{AdapterError, AdapterResult};
use crate::types::{CallResult, CapabilityDescriptor, DownloadedFile};

impl CapabilityDescriptor {
    /// As an rmcp `Tool`
    pub fn to_mcp_tool(&self) -> AdapterResult<Tool> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }

    /// From an rmcp `Tool`, e.g. one of the host's own tools
    pub fn from_mcp_tool(tool: &Tool) -> AdapterResult<Self> {
        Ok(serde_json::from_value(serde_json::to_value(tool)?)?)
    }
}

impl CallResult {
    /// As an rmcp `CallToolResult`
    ///
    /// Structured results carry both `structuredContent` and a JSON text
    /// block. Files become an embedded blob resource.
    pub fn to_mcp_result(&self) -> AdapterResult<CallToolResult> {
        match self {
            CallResult::Structured(value) => Ok(CallToolResult::structured(value.clone())),
            CallResult::File(file) => Ok(CallToolResult::success(vec![blob_content(file)?])),
        }
    }
}

fn blob_content(file: &DownloadedFile) -> AdapterResult<Content> {
    let content = json!({
        "type": "resource",
        "resource": {
            "uri": format!("file:///{}", file.file_name()),
            "mimeType": file.mime_type_or_default(),
            "blob": STANDARD.encode(&file.data),
        }
    });
    Ok(serde_json::from_value(content)?)
}

/// Convert a capability list for a `tools/list` response
pub fn tools_from(descriptors: &[CapabilityDescriptor]) -> AdapterResult<Vec<Tool>> {
    descriptors.iter().map(CapabilityDescriptor::to_mcp_tool).collect()
}

/// A failed call as an `isError` result
pub fn error_result(error: &AdapterError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(error.to_string())])
}
