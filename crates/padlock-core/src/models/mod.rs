//! Data models for Padlock

mod password;
mod preferences;
mod secure_item;

pub use password::PasswordEntry;
pub use preferences::BackupPreferences;
pub use secure_item::{SecureItem, SecureItemType, UnknownItemType};

/// Sentinel id for records the local store has not assigned identity yet.
///
/// Records restored from a backup carry this id until inserted; the store
/// hands out a fresh autoincrement id on insert.
pub const UNASSIGNED_ID: i64 = 0;
