//! Backup payload format.
//!
//! A backup is one flat JSON snapshot: password entries plus detached
//! secure-item export records. The payload written by [`render_backup_json`]
//! must always stay readable by [`parse_backup_json`]; there is no
//! cross-version schema negotiation.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::models::{BackupPreferences, PasswordEntry, SecureItem};

const BACKUP_FILE_PREFIX: &str = "padlock-backup-";
const BACKUP_FILE_EXTENSION: &str = "json";

/// Detached export record for a secure item.
///
/// `item_type` is carried as its wire-string tag so a payload stays
/// parseable record-by-record even when one tag is unknown to the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureItemExport {
    pub item_type: String,
    pub title: String,
    pub item_data: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub image_paths: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Transportable backup snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupContent {
    #[serde(default)]
    pub passwords: Vec<PasswordEntry>,
    #[serde(default)]
    pub secure_items: Vec<SecureItemExport>,
}

impl BackupContent {
    /// Total record count across both categories.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.passwords.len() + self.secure_items.len()
    }

    /// True when the snapshot carries no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty() && self.secure_items.is_empty()
    }
}

/// Convert a secure item into its detached export record.
#[must_use]
pub fn secure_item_to_export(item: &SecureItem) -> SecureItemExport {
    SecureItemExport {
        item_type: item.item_type.to_string(),
        title: item.title.clone(),
        item_data: item.item_data.clone(),
        notes: item.notes.clone(),
        is_favorite: item.is_favorite,
        image_paths: item.image_paths.clone(),
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

/// Build a snapshot of the given records, filtered by content preferences.
#[must_use]
pub fn build_backup_content(
    passwords: &[PasswordEntry],
    items: &[SecureItem],
    prefs: &BackupPreferences,
) -> BackupContent {
    let passwords = if prefs.include_passwords {
        passwords.to_vec()
    } else {
        Vec::new()
    };

    let secure_items = items
        .iter()
        .filter(|item| prefs.includes(item.item_type))
        .map(secure_item_to_export)
        .collect();

    BackupContent {
        passwords,
        secure_items,
    }
}

/// Render a snapshot as pretty-printed JSON.
pub fn render_backup_json(content: &BackupContent) -> serde_json::Result<String> {
    serde_json::to_string_pretty(content)
}

/// Parse a downloaded payload back into a snapshot.
pub fn parse_backup_json(bytes: &[u8]) -> serde_json::Result<BackupContent> {
    serde_json::from_slice(bytes)
}

/// Build the remote file name for a backup taken at the given instant.
///
/// Scheme: `padlock-backup-YYYYMMDD-HHMMSS.json`, UTC, second resolution.
#[must_use]
pub fn backup_file_name(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || format!("{BACKUP_FILE_PREFIX}{timestamp_ms}.{BACKUP_FILE_EXTENSION}"),
        |moment| {
            format!(
                "{BACKUP_FILE_PREFIX}{}.{BACKUP_FILE_EXTENSION}",
                moment.format("%Y%m%d-%H%M%S")
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::SecureItemType;

    fn sample_items() -> Vec<SecureItem> {
        vec![
            SecureItem::new(SecureItemType::Totp, "Mail OTP", "otpauth://x"),
            SecureItem::new(SecureItemType::Document, "Lease", "{}"),
            SecureItem::new(SecureItemType::BankCard, "Visa", "{}"),
            SecureItem::new(SecureItemType::Note, "Wifi", "hunter2"),
        ]
    }

    #[test]
    fn build_backup_content_filters_by_preferences() {
        let passwords = vec![PasswordEntry::new("Bank", "bank.com", "alice", "pw")];
        let items = sample_items();

        let prefs = BackupPreferences {
            include_passwords: false,
            include_authenticators: true,
            include_documents: false,
            include_bank_cards: true,
        };

        let content = build_backup_content(&passwords, &items, &prefs);
        assert!(content.passwords.is_empty());

        let tags: Vec<&str> = content
            .secure_items
            .iter()
            .map(|item| item.item_type.as_str())
            .collect();
        assert_eq!(tags, vec!["TOTP", "BANK_CARD"]);
    }

    #[test]
    fn build_backup_content_with_all_enabled_keeps_everything() {
        let passwords = vec![PasswordEntry::new("Bank", "bank.com", "alice", "pw")];
        let items = sample_items();

        let content = build_backup_content(&passwords, &items, &BackupPreferences::default());
        assert_eq!(content.passwords.len(), 1);
        assert_eq!(content.secure_items.len(), 4);
        assert_eq!(content.record_count(), 5);
        assert!(!content.is_empty());
    }

    #[test]
    fn rendered_payload_parses_back_unchanged() {
        let passwords = vec![PasswordEntry::new("Bank", "bank.com", "alice", "pw")];
        let items = sample_items();
        let content = build_backup_content(&passwords, &items, &BackupPreferences::default());

        let rendered = render_backup_json(&content).unwrap();
        let parsed = parse_backup_json(rendered.as_bytes()).unwrap();

        assert_eq!(parsed, content);
    }

    #[test]
    fn export_record_keeps_item_fields_and_timestamps() {
        let mut item = SecureItem::new(SecureItemType::Document, "Lease", "{\"p\":1}");
        item.notes = "signed copy".to_string();
        item.is_favorite = true;
        item.image_paths = vec!["scans/lease.jpg".to_string()];
        item.created_at = 1_700_000_000_000;
        item.updated_at = 1_700_000_100_000;

        let export = secure_item_to_export(&item);
        assert_eq!(export.item_type, "DOCUMENT");
        assert_eq!(export.notes, "signed copy");
        assert!(export.is_favorite);
        assert_eq!(export.image_paths, vec!["scans/lease.jpg"]);
        assert_eq!(export.created_at, 1_700_000_000_000);
        assert_eq!(export.updated_at, 1_700_000_100_000);
    }

    #[test]
    fn parse_accepts_payloads_with_missing_optional_fields() {
        let payload = br#"{
            "passwords": [
                {"title": "Bank", "website": "bank.com", "username": "alice", "password": "pw"}
            ],
            "secure_items": [
                {"item_type": "TOTP", "title": "Mail", "item_data": "x",
                 "created_at": 1, "updated_at": 2}
            ]
        }"#;

        let content = parse_backup_json(payload).unwrap();
        assert_eq!(content.passwords[0].id, 0);
        assert_eq!(content.passwords[0].notes, "");
        assert!(content.secure_items[0].image_paths.is_empty());
    }

    #[test]
    fn backup_file_name_uses_utc_second_resolution() {
        // 2025-08-01 09:00:00 UTC
        assert_eq!(
            backup_file_name(1_754_038_800_000),
            "padlock-backup-20250801-090000.json"
        );
    }
}
