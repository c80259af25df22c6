//! cache_sync tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use expedition_client::CacheManager;
use expedition_client::worker::{SYNC_TAG, SyncReport};

use crate::tools::json_result;

fn default_tag() -> String {
    SYNC_TAG.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSyncParams {
    /// Sync tag (default: "background-sync"). Other tags are ignored.
    #[serde(default = "default_tag")]
    pub tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheSyncOutput {
    pub tag: String,
    /// Whether the tag was recognised and a refresh ran.
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
}

pub async fn sync_impl(manager: &CacheManager, params: CacheSyncParams) -> Result<CallToolResult, McpError> {
    let report = manager.sync(&params.tag).await;
    json_result(&CacheSyncOutput { tag: params.tag, handled: report.is_some(), report })
}
