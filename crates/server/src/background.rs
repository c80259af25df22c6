//! Periodic tasks that run alongside the stdio server.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast};
use tokio::time::MissedTickBehavior;

use expedition_client::{CacheManager, WorkerEvent};
use expedition_core::ExpeditionApp;
use expedition_core::expedition::TickOutcome;

/// Log every page broadcast from the cache manager.
pub fn spawn_event_log(manager: &CacheManager) {
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(WorkerEvent::Activated { version, cache_name }) => {
                    tracing::info!(%version, cache = %cache_name, "cache generation activated");
                }
                Ok(WorkerEvent::SyncComplete { timestamp }) => {
                    tracing::info!(%timestamp, "background sync complete");
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event log lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Install the cache generation; skip-waiting is already requested so it
/// activates as soon as install finishes.
pub fn spawn_install(manager: Arc<CacheManager>) {
    tokio::spawn(async move {
        match manager.install().await {
            Ok(state) => tracing::info!(?state, cache = %manager.cache_name(), "install finished"),
            Err(e) => tracing::error!(error = %e, "install failed"),
        }
    });
}

/// Drive the countdown clock.
pub fn spawn_ticker(app: Arc<Mutex<ExpeditionApp>>, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let mut app = app.lock().await;
            match app.tick(Utc::now()) {
                Ok(TickOutcome::Completed) => {
                    tracing::debug!(frame = ?app.frame(), "completion frame rendered");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "countdown tick failed"),
            }
        }
    });
}

/// Rotate the motivational quote.
pub fn spawn_quotes(app: Arc<Mutex<ExpeditionApp>>, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // the first tick completes immediately; the initial quote stays up for a full period
        interval.tick().await;
        loop {
            interval.tick().await;
            let quote = app.lock().await.rotate_quote();
            tracing::debug!(quote, "quote rotated");
        }
    });
}
