//! Unified error types for the expedition workspace.
//!
//! Every variant renders as `CODE: message` so tool callers can match on the
//! prefix without parsing the rest.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

use crate::expedition::{CountdownError, ValidationError};

/// Unified error types for the expedition server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Expedition dates rejected by validation.
    #[error("VALIDATION_FAILED: {0}")]
    Validation(#[from] ValidationError),

    /// Countdown cannot be computed from the stored record.
    #[error("INVALID_CONFIGURATION: {0}")]
    Countdown(#[from] CountdownError),

    /// Persisted state could not be decoded.
    #[error("STORAGE_CORRUPT: {0}")]
    StorageCorrupt(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Network fetch did not settle in time.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Network-level failure or unusable HTTP response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::StorageCorrupt(err.to_string())
    }
}

impl Error {
    /// JSON-RPC error code reported to tool callers.
    ///
    /// Caller mistakes use the standard invalid-params code; everything else
    /// sits in the server-defined range.
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) | Error::Validation(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::FetchTimeout(_) => -32006,
            Error::HttpError(_) => -32008,
            Error::Countdown(_) => -32013,
            Error::StorageCorrupt(_) => -32014,
        }
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = ErrorCode(err.code());
        let message = match err {
            Error::Validation(e) => e.to_string(),
            Error::Countdown(e) => e.to_string(),
            Error::Database(e) => e.to_string(),
            Error::InvalidInput(msg)
            | Error::StorageCorrupt(msg)
            | Error::MigrationFailed(msg)
            | Error::InvalidUrl(msg)
            | Error::FetchTimeout(msg)
            | Error::HttpError(msg) => msg,
        };
        McpError { code, message: message.into(), data: None }
    }
}
