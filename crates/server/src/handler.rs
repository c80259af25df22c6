//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use tokio::sync::Mutex;

use expedition_client::CacheManager;
use expedition_core::ExpeditionApp;

use crate::tools::{
    cache::{CacheFetchParams, CacheSyncParams, WorkerMessageParams, fetch_impl, message_impl, sync_impl},
    expedition::{ExpeditionDatesParams, ExpeditionImportParams, import_impl, reset_impl, settings_impl, submit_impl},
    mode::{ModeSetParams, OptimisticSupplyParams, mode_set_impl, optimistic_cancel_impl, optimistic_supply_impl},
    status::status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for expedition-countdown.
#[derive(Clone)]
pub struct ExpeditionServer {
    tool_router: ToolRouter<Self>,
    app: Arc<Mutex<ExpeditionApp>>,
    manager: Arc<CacheManager>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ExpeditionServer {
    /// Create a new server handler over a started app and cache manager.
    pub fn new(app: Arc<Mutex<ExpeditionApp>>, manager: Arc<CacheManager>) -> Self {
        Self { tool_router: Self::tool_router(), app, manager }
    }

    #[tool(
        description = "Create an expedition from start and end dates (optional optimistic end). Validates, saves and switches to the countdown."
    )]
    async fn expedition_submit(&self, params: Parameters<ExpeditionDatesParams>) -> Result<CallToolResult, McpError> {
        submit_impl(&self.app, params.0).await
    }

    #[tool(
        description = "Import an expedition from a page URL with start, end and optional optimistic query parameters. Returns the cleaned URL."
    )]
    async fn expedition_import(&self, params: Parameters<ExpeditionImportParams>) -> Result<CallToolResult, McpError> {
        import_impl(&self.app, params.0).await
    }

    #[tool(description = "Edit the dates of the current expedition. Requires an existing expedition.")]
    async fn expedition_settings(&self, params: Parameters<ExpeditionDatesParams>) -> Result<CallToolResult, McpError> {
        settings_impl(&self.app, params.0).await
    }

    #[tool(description = "Delete the saved expedition and mode, and return to the input form.")]
    async fn expedition_reset(&self) -> Result<CallToolResult, McpError> {
        reset_impl(&self.app).await
    }

    /// Switch display mode.
    ///
    /// Optimistic mode without an optimistic end date opens a prompt instead of switching.
    #[tool(
        description = "Switch countdown mode (realistic or optimistic). Optimistic without a date returns a suggested date to supply."
    )]
    async fn mode_set(&self, params: Parameters<ModeSetParams>) -> Result<CallToolResult, McpError> {
        mode_set_impl(&self.app, params.0).await
    }

    #[tool(description = "Answer the optimistic date prompt. Saves the date and switches to optimistic mode.")]
    async fn optimistic_supply(&self, params: Parameters<OptimisticSupplyParams>) -> Result<CallToolResult, McpError> {
        optimistic_supply_impl(&self.app, params.0).await
    }

    #[tool(description = "Dismiss the optimistic date prompt. The mode stays realistic.")]
    async fn optimistic_cancel(&self) -> Result<CallToolResult, McpError> {
        optimistic_cancel_impl(&self.app).await
    }

    #[tool(
        description = "Current view, mode, countdown frame (elapsed, remaining, progress, warning) or completion message, and quote."
    )]
    async fn countdown_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.app).await
    }

    /// Fetch through the offline cache manager.
    ///
    /// Navigations are network-first with a timeout; static assets are cache-first.
    #[tool(
        description = "Fetch a URL through the offline cache manager. Reports whether network, cache or fallback answered."
    )]
    async fn cache_fetch(&self, params: Parameters<CacheFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.manager, params.0).await
    }

    #[tool(description = "Send a command to the cache manager: SKIP_WAITING, GET_VERSION or CLEAR_CACHE.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.manager, params.0).await
    }

    #[tool(description = "Run a background sync that refreshes the critical URLs in the cache.")]
    async fn cache_sync(&self, params: Parameters<CacheSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.manager, params.0).await
    }
}

impl ServerHandler for ExpeditionServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "expedition-countdown".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::cache::testing::offline_manager;
    use crate::tools::testing::app;

    #[tokio::test]
    async fn test_lists_every_tool() {
        let (_, app) = app().await;
        let (_, manager) = offline_manager().await;
        let server = ExpeditionServer::new(Arc::new(app), Arc::new(manager));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_fetch",
                "cache_sync",
                "countdown_status",
                "expedition_import",
                "expedition_reset",
                "expedition_settings",
                "expedition_submit",
                "mode_set",
                "optimistic_cancel",
                "optimistic_supply",
                "worker_message",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (_, app) = app().await;
        let (_, manager) = offline_manager().await;
        let info = ExpeditionServer::new(Arc::new(app), Arc::new(manager)).get_info();
        assert_eq!(info.server_info.name, "expedition-countdown");
        assert!(info.capabilities.tools.is_some());
    }
}
