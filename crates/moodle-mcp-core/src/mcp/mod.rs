//! MCP (Model Context Protocol) model conversions
//!
//! The host framework speaks MCP through the official rmcp SDK. This module
//! turns capability descriptors into rmcp `Tool`s and call results into
//! `CallToolResult`s, going through the MCP wire JSON.
//!
//! # Example
//!
//! ```rust,ignore
//! use moodle_mcp_core::mcp::{error_result, tools_from};
//!
//! let listed = dispatcher.list_capabilities(&ctx, vec![]).await?;
//! let tools = tools_from(&listed)?;
//!
//! let result = match dispatcher.invoke_capability(&ctx, &name, args).await {
//!     Ok(result) => result.to_mcp_result()?,
//!     Err(e) => error_result(&e),
//! };
//! ```

mod convert;

pub use convert::{error_result, tools_from};

// Re-export rmcp types that hosts need
pub use rmcp::model::{CallToolResult as McpToolResult, Tool as McpTool};
