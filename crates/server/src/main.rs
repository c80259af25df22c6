//! expedition-countdown server entry point.
//!
//! Boots the countdown app and the offline cache manager, then serves MCP on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use expedition_client::{CacheManager, Command, FetchClient, FetchConfig, ManagerConfig};
use expedition_core::{AppConfig, CacheDb, ExpeditionApp, ExpeditionStore};

mod background;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db = %config.db_path.display(), origin = %config.origin, "Starting expedition-countdown on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;

    let fetcher = FetchClient::new(FetchConfig::from_app_config(&config))?;
    let manager = Arc::new(CacheManager::new(db.clone(), Arc::new(fetcher), ManagerConfig::from_app_config(&config)?));
    background::spawn_event_log(&manager);
    manager.handle_message(Command::SkipWaiting).await?;
    background::spawn_install(Arc::clone(&manager));

    let mut app = ExpeditionApp::new(ExpeditionStore::new(db.clone()), config.min_tick_interval());
    let outcome = app.start(None, Utc::now()).await?;
    if let Some(notice) = &outcome.notice {
        tracing::warn!(notice = %notice, "startup notice");
    }
    tracing::info!(view = ?outcome.view, "expedition app started");

    let app = Arc::new(Mutex::new(app));
    background::spawn_ticker(Arc::clone(&app), config.tick_interval());
    background::spawn_quotes(Arc::clone(&app), config.quote_interval());

    let handler = handler::ExpeditionServer::new(app, manager);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    db.close().await?;
    tracing::info!("storage closed");

    Ok(())
}
