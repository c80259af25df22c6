//! Expedition record tools: create, import, edit and reset.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use expedition_core::{ExpeditionApp, ExpeditionRecord, expedition::View};

use super::json_result;

/// Dates for a new or edited expedition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExpeditionDatesParams {
    /// Start, e.g. `2025-01-01T09:00` or `2025-01-01T09:00:00Z`.
    pub start: String,

    /// Realistic end.
    pub end: String,

    /// Optional optimistic end, strictly between start and end.
    #[serde(default)]
    pub optimistic_end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExpeditionImportParams {
    /// Page address carrying `start`, `end` and optional `optimistic` query parameters.
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpeditionOutput {
    pub record: ExpeditionRecord,
    pub view: View,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutput {
    /// Whether the address carried a complete parameter set.
    pub imported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ExpeditionRecord>,
    /// Address to show with the query removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_url: Option<String>,
}

pub async fn submit_impl(app: &Mutex<ExpeditionApp>, params: ExpeditionDatesParams) -> Result<CallToolResult, McpError> {
    let now = Utc::now();
    let mut app = app.lock().await;
    let record = app.submit(&params.start, &params.end, params.optimistic_end.as_deref(), now).await?;
    json_result(&ExpeditionOutput { record, view: app.view(now) })
}

pub async fn import_impl(app: &Mutex<ExpeditionApp>, params: ExpeditionImportParams) -> Result<CallToolResult, McpError> {
    let mut app = app.lock().await;
    let clean_url = app.import(&params.url, Utc::now()).await?;
    let record = clean_url.as_ref().and_then(|_| app.controller().record().copied());
    json_result(&ImportOutput { imported: clean_url.is_some(), record, clean_url })
}

pub async fn settings_impl(
    app: &Mutex<ExpeditionApp>, params: ExpeditionDatesParams,
) -> Result<CallToolResult, McpError> {
    let now = Utc::now();
    let mut app = app.lock().await;
    let record = app
        .update_settings(&params.start, &params.end, params.optimistic_end.as_deref(), now)
        .await?;
    json_result(&ExpeditionOutput { record, view: app.view(now) })
}

pub async fn reset_impl(app: &Mutex<ExpeditionApp>) -> Result<CallToolResult, McpError> {
    let mut app = app.lock().await;
    app.reset().await?;
    json_result(&app.view(Utc::now()))
}
