//! SQLite-backed local storage.
//!
//! This module provides persistent storage using SQLite with async access
//! via tokio-rusqlite. It holds two things:
//!
//! - A key/value store for small pieces of application state
//! - Named, versioned caches of request/response pairs keyed by a
//!   SHA-256 of the request identity
//!
//! Schema changes are applied by versioned migrations on open.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod kv;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntry, EntryStamp, StoredResponse, format_http_date, parse_http_date};
