//! Application state: which view is shown, and every mutation that persists.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::Error;

use super::countdown::{CountdownController, Frame, LastFrame, Mode, ModeChange, TickOutcome};
use super::import::import_from_url;
use super::quotes::QuoteRotator;
use super::record::{ExpeditionRecord, parse_datetime};
use super::store::ExpeditionStore;

/// Default expedition length offered by the input form.
const DEFAULT_FORM_DAYS: i64 = 7;

/// The view is always one of these two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    InputForm { default_start: DateTime<Utc>, default_end: DateTime<Utc> },
    Countdown,
}

impl View {
    fn input_form(now: DateTime<Utc>) -> Self {
        View::InputForm { default_start: now, default_end: now + TimeDelta::days(DEFAULT_FORM_DAYS) }
    }
}

/// Result of application startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
    pub view: View,
    /// Address to display once imported URL parameters are consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_url: Option<String>,
    /// User-facing notice, e.g. why URL parameters were ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Snapshot of everything a page would display.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub view: View,
    pub mode: Mode,
    pub record: Option<ExpeditionRecord>,
    pub frame: Option<Frame>,
    pub quote: &'static str,
    pub awaiting_optimistic_date: bool,
    pub completed: bool,
}

pub struct ExpeditionApp {
    controller: CountdownController,
    store: ExpeditionStore,
    quotes: QuoteRotator,
    surface: LastFrame,
}

impl ExpeditionApp {
    pub fn new(store: ExpeditionStore, min_tick_interval: Duration) -> Self {
        Self {
            controller: CountdownController::new(min_tick_interval),
            store,
            quotes: QuoteRotator::default(),
            surface: LastFrame::default(),
        }
    }

    pub fn controller(&self) -> &CountdownController {
        &self.controller
    }

    /// Current view at `now`.
    pub fn view(&self, now: DateTime<Utc>) -> View {
        if self.controller.record().is_some() { View::Countdown } else { View::input_form(now) }
    }

    /// Bring the application up: URL parameters, then storage, then the input form.
    pub async fn start(&mut self, address: Option<&str>, now: DateTime<Utc>) -> Result<StartOutcome, Error> {
        let mut notice = None;

        if let Some(address) = address {
            match import_from_url(address, now) {
                Ok(Some(import)) => {
                    self.controller.load(import.record, Mode::Realistic);
                    self.persist().await?;
                    self.render_now(now);
                    return Ok(StartOutcome { view: View::Countdown, clean_url: Some(import.clean_url), notice: None });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring URL parameters");
                    notice = Some(format!("Invalid URL parameters: {e}. Using other data."));
                }
            }
        }

        match self.store.load().await {
            Ok(stored) => {
                if let Some(record) = stored.record {
                    self.controller.load(record, stored.mode);
                    self.render_now(now);
                }
            }
            Err(Error::StorageCorrupt(reason)) => {
                tracing::warn!(%reason, "stored expedition is corrupt; resetting");
                self.reset().await?;
            }
            Err(e) => return Err(e),
        }

        Ok(StartOutcome { view: self.view(now), clean_url: None, notice })
    }

    /// Create an expedition from the input form.
    pub async fn submit(
        &mut self, start: &str, end: &str, optimistic_end: Option<&str>, now: DateTime<Utc>,
    ) -> Result<ExpeditionRecord, Error> {
        let record = ExpeditionRecord::from_form(start, end, optimistic_end, now)?;
        self.controller.load(record, self.controller.mode());
        self.persist().await?;
        self.render_now(now);
        tracing::info!(start = %record.start, end = %record.end, "expedition created");
        Ok(record)
    }

    /// Import from a page address, overwriting any stored expedition.
    pub async fn import(&mut self, address: &str, now: DateTime<Utc>) -> Result<Option<String>, Error> {
        let Some(import) = import_from_url(address, now)? else {
            return Ok(None);
        };
        self.controller.load(import.record, Mode::Realistic);
        self.persist().await?;
        self.render_now(now);
        Ok(Some(import.clean_url))
    }

    /// Edit the running expedition's dates.
    pub async fn update_settings(
        &mut self, start: &str, end: &str, optimistic_end: Option<&str>, now: DateTime<Utc>,
    ) -> Result<ExpeditionRecord, Error> {
        if self.controller.record().is_none() {
            return Err(Error::InvalidInput("no expedition configured".to_string()));
        }
        let record = ExpeditionRecord::from_settings(start, end, optimistic_end)?;
        self.controller.load(record, self.controller.mode());
        self.persist().await?;
        self.render_now(now);
        Ok(record)
    }

    /// Forget everything and return to the input form.
    pub async fn reset(&mut self) -> Result<(), Error> {
        self.controller.clear();
        self.surface = LastFrame::default();
        self.store.clear().await
    }

    pub async fn request_mode(&mut self, mode: Mode, now: DateTime<Utc>) -> Result<ModeChange, Error> {
        let change = self.controller.request_mode(mode);
        if let ModeChange::Applied(applied) = change {
            self.store.save_mode(applied).await?;
            self.render_now(now);
        }
        Ok(change)
    }

    pub async fn supply_optimistic_end(&mut self, value: &str, now: DateTime<Utc>) -> Result<ExpeditionRecord, Error> {
        let optimistic = parse_datetime("optimistic", value)?;
        let record = self.controller.supply_optimistic_end(optimistic, now)?;
        self.persist().await?;
        self.render_now(now);
        Ok(record)
    }

    pub fn cancel_optimistic_prompt(&mut self) {
        self.controller.cancel_prompt();
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, Error> {
        Ok(self.controller.tick_at(now, &mut self.surface)?)
    }

    pub fn rotate_quote(&mut self) -> &'static str {
        self.quotes.advance()
    }

    pub fn quote(&self) -> &'static str {
        self.quotes.current()
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.surface.0.as_ref()
    }

    pub fn status(&self, now: DateTime<Utc>) -> Status {
        Status {
            view: self.view(now),
            mode: self.controller.mode(),
            record: self.controller.record().copied(),
            frame: self.surface.0.clone(),
            quote: self.quote(),
            awaiting_optimistic_date: self.controller.awaiting_optimistic_date(),
            completed: self.controller.is_completed(),
        }
    }

    async fn persist(&self) -> Result<(), Error> {
        if let Some(record) = self.controller.record() {
            self.store.save_record(record).await?;
        }
        self.store.save_mode(self.controller.mode()).await
    }

    /// Render immediately after a mutation, as the page would.
    fn render_now(&mut self, now: DateTime<Utc>) {
        if let Err(e) = self.controller.tick_at(now, &mut self.surface) {
            tracing::warn!(error = %e, "countdown cannot be rendered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDb;
    use crate::expedition::record::ValidationError;
    use crate::expedition::store::{MODE_KEY, RECORD_KEY};

    fn at(s: &str) -> DateTime<Utc> {
        parse_datetime("test", s).unwrap()
    }

    async fn app() -> (CacheDb, ExpeditionApp) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let app = ExpeditionApp::new(ExpeditionStore::new(db.clone()), Duration::from_millis(100));
        (db, app)
    }

    #[tokio::test]
    async fn test_start_empty_shows_form() {
        let (_, mut app) = app().await;
        let now = at("2025-01-01T00:00:00");
        let outcome = app.start(None, now).await.unwrap();
        assert_eq!(outcome.view, View::InputForm { default_start: now, default_end: at("2025-01-08T00:00:00") });
    }

    #[tokio::test]
    async fn test_start_prefers_url() {
        let (db, mut app) = app().await;
        let now = at("2024-12-01T00:00:00");
        app.submit("2025-02-01T00:00", "2025-02-08T00:00", None, now).await.unwrap();

        let mut fresh = ExpeditionApp::new(ExpeditionStore::new(db.clone()), Duration::from_millis(100));
        let address = "https://example.com/?start=2025-01-01T00:00:00&end=2025-01-08T00:00:00";
        let outcome = fresh.start(Some(address), now).await.unwrap();

        assert_eq!(outcome.view, View::Countdown);
        assert_eq!(outcome.clean_url.as_deref(), Some("/"));
        assert_eq!(fresh.controller().record().unwrap().start, at("2025-01-01T00:00:00"));
        let raw = db.kv_get(RECORD_KEY).await.unwrap().unwrap();
        assert!(raw.contains("2025-01-01"));
    }

    #[tokio::test]
    async fn test_invalid_url_falls_back_to_storage() {
        let (db, mut app) = app().await;
        let now = at("2024-12-01T00:00:00");
        app.submit("2025-02-01T00:00", "2025-02-08T00:00", None, now).await.unwrap();

        let mut fresh = ExpeditionApp::new(ExpeditionStore::new(db), Duration::from_millis(100));
        let address = "https://example.com/?start=2025-01-08T00:00:00&end=2025-01-01T00:00:00";
        let outcome = fresh.start(Some(address), now).await.unwrap();

        assert_eq!(outcome.view, View::Countdown);
        assert!(outcome.notice.unwrap().contains("later than the start"));
        assert_eq!(fresh.controller().record().unwrap().start, at("2025-02-01T00:00:00"));
    }

    #[tokio::test]
    async fn test_corrupt_storage_resets() {
        let (db, mut app) = app().await;
        db.kv_set(RECORD_KEY, "garbage").await.unwrap();
        db.kv_set(MODE_KEY, "true").await.unwrap();

        let outcome = app.start(None, at("2025-01-01T00:00:00")).await.unwrap();
        assert!(matches!(outcome.view, View::InputForm { .. }));
        assert!(db.kv_get(RECORD_KEY).await.unwrap().is_none());
        assert!(db.kv_get(MODE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_submit_invalid_not_persisted() {
        let (db, mut app) = app().await;
        let err = app
            .submit("2025-01-08T00:00", "2025-01-01T00:00", None, at("2024-12-01T00:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EndNotAfterStart)));
        assert!(db.kv_get(RECORD_KEY).await.unwrap().is_none());
        assert!(matches!(app.view(at("2024-12-01T00:00:00")), View::InputForm { .. }));
    }

    #[tokio::test]
    async fn test_settings_edit_allows_past_start() {
        let (_, mut app) = app().await;
        let now = at("2025-01-03T00:00:00");
        app.submit("2025-01-01T00:00", "2025-01-08T00:00", None, at("2024-12-01T00:00:00")).await.unwrap();

        let record = app.update_settings("2024-12-25T00:00", "2025-01-04T00:00", None, now).await.unwrap();
        assert_eq!(record.start, at("2024-12-25T00:00:00"));
    }

    #[tokio::test]
    async fn test_settings_without_record() {
        let (_, mut app) = app().await;
        let err = app
            .update_settings("2025-01-01T00:00", "2025-01-08T00:00", None, at("2025-01-02T00:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_mode_toggle_flow_persists() {
        let (db, mut app) = app().await;
        let now = at("2025-01-02T00:00:00");
        app.submit("2025-01-01T00:00", "2025-01-08T00:00", None, at("2024-12-01T00:00:00")).await.unwrap();

        let change = app.request_mode(Mode::Optimistic, now).await.unwrap();
        assert!(matches!(change, ModeChange::NeedsOptimisticDate { .. }));
        assert_eq!(db.kv_get(MODE_KEY).await.unwrap().as_deref(), Some("false"));

        app.supply_optimistic_end("2025-01-05T00:00", now).await.unwrap();
        assert_eq!(db.kv_get(MODE_KEY).await.unwrap().as_deref(), Some("true"));
        assert!(db.kv_get(RECORD_KEY).await.unwrap().unwrap().contains("optimistic_end_date"));

        match app.frame() {
            Some(Frame::Countdown(frame)) => assert_eq!(frame.target, at("2025-01-05T00:00:00")),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_prompt() {
        let (_, mut app) = app().await;
        let now = at("2025-01-02T00:00:00");
        app.submit("2025-01-01T00:00", "2025-01-08T00:00", None, at("2024-12-01T00:00:00")).await.unwrap();
        app.request_mode(Mode::Optimistic, now).await.unwrap();
        app.cancel_optimistic_prompt();
        let status = app.status(now);
        assert_eq!(status.mode, Mode::Realistic);
        assert!(!status.awaiting_optimistic_date);
    }

    #[tokio::test]
    async fn test_reset_returns_to_form() {
        let (db, mut app) = app().await;
        let now = at("2025-01-02T00:00:00");
        app.submit("2025-01-01T00:00", "2025-01-08T00:00", None, at("2024-12-01T00:00:00")).await.unwrap();
        app.reset().await.unwrap();

        assert!(matches!(app.view(now), View::InputForm { .. }));
        assert!(app.frame().is_none());
        assert!(db.kv_get(RECORD_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_quote_rotation() {
        let (_, mut app) = app().await;
        let first = app.quote();
        let second = app.rotate_quote();
        assert_ne!(first, second);
        assert_eq!(app.quote(), second);
    }
}
