//! Error types shared across the core.
//!
//! Every error here is recoverable: a failed import leaves the store as it
//! was, a failed sync leaves the store untouched, and a malformed record is
//! dropped rather than stored.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A record that cannot become a quote.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Quote text is required")]
    EmptyText,

    #[error("Field '{0}' must be a string")]
    InvalidField(&'static str),

    #[error("Expected a string or an object, got {0}")]
    UnsupportedShape(&'static str),
}

/// Failure talking to the remote collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server returned status {0}")]
    Status(u16),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// Malformed JSON in a persisted blob or an import file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(String),

    #[error("Invalid JSON: expected an array")]
    NotAnArray,
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Json(e.to_string())
    }
}

/// Key-value backend failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error for {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] io::Error),

    #[error("Failed to encode quotes: {0}")]
    Encode(String),
}

/// Errors from local store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Quote not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from importing a batch of quotes.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Read(PathBuf, #[source] io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("No valid quotes found")]
    NoValidQuotes,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors that abort a sync cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from resolving a pending conflict.
#[derive(Error, Debug)]
pub enum ConflictError {
    #[error("No pending conflict for id {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
