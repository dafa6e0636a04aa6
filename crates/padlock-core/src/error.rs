//! Error types for padlock-core

use thiserror::Error;

/// Result type alias using padlock-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in padlock-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown secure item type tag
    #[error(transparent)]
    UnknownItemType(#[from] crate::models::UnknownItemType),

    /// Remote store error, already classified by the transport layer
    #[error("Remote store error: {0}")]
    Remote(#[from] crate::remote::WebDavError),

    /// WebDAV backup is not configured
    #[error("WebDAV backup is not configured")]
    NotConfigured,

    /// Another backup is already running
    #[error("A backup is already in progress")]
    BackupInProgress,
}
