//! Message protocol between pages and the cache manager.
//!
//! Wire names follow the page script: `{"type": "GET_VERSION"}` in,
//! `{"type": "VERSION_INFO", "version": ..., "cacheName": ...}` out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Commands a page can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    SkipWaiting,
    GetVersion,
    ClearCache,
}

/// Direct replies to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    #[serde(rename_all = "camelCase")]
    VersionInfo { version: String, cache_name: String, timestamp: DateTime<Utc> },
    CacheCleared { success: bool },
}

/// Notifications broadcast to every connected page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerEvent {
    #[serde(rename = "SW_ACTIVATED", rename_all = "camelCase")]
    Activated { version: String, cache_name: String },
    #[serde(rename = "BACKGROUND_SYNC_COMPLETE")]
    SyncComplete { timestamp: DateTime<Utc> },
}
