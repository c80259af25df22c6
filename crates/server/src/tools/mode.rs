//! Display mode tools and the optimistic date prompt.

use chrono::{DateTime, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use expedition_core::{ExpeditionApp, ExpeditionRecord, Mode, expedition::ModeChange};

use super::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModeSetParams {
    /// `realistic` or `optimistic`.
    pub mode: Mode,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OptimisticSupplyParams {
    /// Optimistic end date, strictly between start and end and in the future.
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ModeSetOutput {
    Applied { mode: Mode },
    /// Optimistic mode needs a date; call `optimistic_supply` or `optimistic_cancel`.
    NeedsOptimisticDate { suggested: DateTime<Utc> },
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimisticOutput {
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ExpeditionRecord>,
}

pub async fn mode_set_impl(app: &Mutex<ExpeditionApp>, params: ModeSetParams) -> Result<CallToolResult, McpError> {
    let mut app = app.lock().await;
    let output = match app.request_mode(params.mode, Utc::now()).await? {
        ModeChange::Applied(mode) => ModeSetOutput::Applied { mode },
        ModeChange::NeedsOptimisticDate { suggested } => ModeSetOutput::NeedsOptimisticDate { suggested },
    };
    json_result(&output)
}

pub async fn optimistic_supply_impl(
    app: &Mutex<ExpeditionApp>, params: OptimisticSupplyParams,
) -> Result<CallToolResult, McpError> {
    let mut app = app.lock().await;
    let record = app.supply_optimistic_end(&params.date, Utc::now()).await?;
    json_result(&OptimisticOutput { mode: app.controller().mode(), record: Some(record) })
}

pub async fn optimistic_cancel_impl(app: &Mutex<ExpeditionApp>) -> Result<CallToolResult, McpError> {
    let mut app = app.lock().await;
    app.cancel_optimistic_prompt();
    json_result(&OptimisticOutput { mode: app.controller().mode(), record: None })
}
