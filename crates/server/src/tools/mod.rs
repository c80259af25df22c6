//! MCP tool implementations.
//!
//! This module contains all tools exposed by the expedition server.

pub mod cache;
pub mod expedition;
pub mod mode;
pub mod status;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use expedition_core::Error;

/// Wrap a serializable output as a pretty-printed JSON text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
