//! countdown_status tool implementation.
//!
//! Runs one tick and reports everything the page would display.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use tokio::sync::Mutex;

use expedition_core::ExpeditionApp;

use super::json_result;

pub async fn status_impl(app: &Mutex<ExpeditionApp>) -> Result<CallToolResult, McpError> {
    let now = Utc::now();
    let mut app = app.lock().await;
    app.tick(now)?;
    json_result(&app.status(now))
}
