//! Core types and shared functionality for the expedition countdown.
//!
//! This crate provides:
//! - Expedition record validation and the countdown controller
//! - SQLite-backed local key/value storage and named response caches
//! - Unified error types
//! - Configuration structures
//! - A deferred install prompt holder for embedders (not used by the server)

pub mod cache;
pub mod config;
pub mod error;
pub mod expedition;
pub mod install;

pub use cache::{CacheDb, CacheEntry, EntryStamp, StoredResponse, format_http_date, parse_http_date};
pub use config::AppConfig;
pub use error::Error;
pub use expedition::{ExpeditionApp, ExpeditionRecord, ExpeditionStore, Mode};
