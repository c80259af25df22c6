//! worker_message tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use expedition_client::{CacheManager, Command, Reply, WorkerState};
use expedition_core::Error;

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// `SKIP_WAITING`, `GET_VERSION` or `CLEAR_CACHE`.
    pub command: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerMessageOutput {
    pub state: WorkerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Reply>,
}

fn parse_command(raw: &str) -> Result<Command, Error> {
    let name = raw.trim().to_ascii_uppercase();
    serde_json::from_value(serde_json::json!({ "type": name }))
        .map_err(|_| Error::InvalidInput(format!("unknown command: {raw}")))
}

pub async fn message_impl(manager: &CacheManager, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let command = parse_command(&params.command)?;
    let reply = manager.handle_message(command).await?;
    json_result(&WorkerMessageOutput { state: manager.state().await, reply })
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::tools::testing::output;

    fn msg(command: &str) -> WorkerMessageParams {
        WorkerMessageParams { command: command.into() }
    }

    #[test]
    fn test_parse_command_case_insensitive() {
        assert_eq!(parse_command("get_version").unwrap(), Command::GetVersion);
        assert!(parse_command("RELOAD").is_err());
    }

    #[tokio::test]
    async fn test_get_version() {
        let (_, manager) = offline_manager().await;
        let out = output(&message_impl(&manager, msg("GET_VERSION")).await.unwrap());
        assert_eq!(out["reply"]["type"], "VERSION_INFO");
        assert_eq!(out["reply"]["version"], "1.0.0");
        assert_eq!(out["reply"]["cacheName"], "countdown-app-1.0.0");
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let (db, manager) = offline_manager().await;
        db.open_cache("countdown-app-1.0.0").await.unwrap();
        let out = output(&message_impl(&manager, msg("CLEAR_CACHE")).await.unwrap());
        assert_eq!(out["reply"]["type"], "CACHE_CLEARED");
        assert_eq!(out["reply"]["success"], true);
        assert!(!db.has_cache("countdown-app-1.0.0").await.unwrap());
    }

    #[tokio::test]
    async fn test_skip_waiting_has_no_reply() {
        let (_, manager) = offline_manager().await;
        let out = output(&message_impl(&manager, msg("SKIP_WAITING")).await.unwrap());
        assert!(out.get("reply").is_none());
    }

    #[tokio::test]
    async fn test_unknown_command_rejected() {
        let (_, manager) = offline_manager().await;
        let err = message_impl(&manager, msg("NOPE")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
