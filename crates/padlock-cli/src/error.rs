use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] padlock_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Entry title cannot be empty")]
    EmptyTitle,
    #[error("Backup file name cannot be empty")]
    EmptyBackupName,
    #[error("At least one backup category must stay enabled")]
    NoCategoriesEnabled,
    #[error("WebDAV backup is not configured. Run `padlock configure` first.")]
    NotConfigured,
}
