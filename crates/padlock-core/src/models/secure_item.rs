//! Generic secure item model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::UNASSIGNED_ID;

/// Category tag of a [`SecureItem`].
///
/// The string form is the wire tag used in backup payloads; parsing an
/// unknown tag is a typed error so a single malformed record can be counted
/// and skipped during restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecureItemType {
    /// Time-based one-time-password authenticator
    Totp,
    /// Free-form document
    Document,
    /// Payment card
    BankCard,
    /// Secure note
    Note,
}

impl SecureItemType {
    /// Wire tag used in backup payloads and the database column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Totp => "TOTP",
            Self::Document => "DOCUMENT",
            Self::BankCard => "BANK_CARD",
            Self::Note => "NOTE",
        }
    }
}

impl fmt::Display for SecureItemType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error for a secure item tag with no known category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown secure item type tag: {0}")]
pub struct UnknownItemType(pub String);

impl FromStr for SecureItemType {
    type Err = UnknownItemType;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim() {
            "TOTP" => Ok(Self::Totp),
            "DOCUMENT" => Ok(Self::Document),
            "BANK_CARD" => Ok(Self::BankCard),
            "NOTE" => Ok(Self::Note),
            other => Err(UnknownItemType(other.to_string())),
        }
    }
}

/// A non-password credential record (authenticator, document, bank card...).
///
/// `item_data` is an opaque serialized payload owned by whatever produced
/// the item; this crate stores and transports it without interpreting it.
/// Duplicate detection during restore uses `(item_type, title)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureItem {
    /// Local store id, [`UNASSIGNED_ID`] until inserted
    #[serde(default)]
    pub id: i64,
    /// Category tag
    pub item_type: SecureItemType,
    /// Display title
    pub title: String,
    /// Opaque serialized payload
    pub item_data: String,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
    /// Pinned in list views
    #[serde(default)]
    pub is_favorite: bool,
    /// Attached image paths, carried through backup untouched
    #[serde(default)]
    pub image_paths: Vec<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl SecureItem {
    /// Create a new, not-yet-persisted item stamped with the current time.
    #[must_use]
    pub fn new(
        item_type: SecureItemType,
        title: impl Into<String>,
        item_data: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: UNASSIGNED_ID,
            item_type,
            title: title.into(),
            item_data: item_data.into(),
            notes: String::new(),
            is_favorite: false,
            image_paths: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl fmt::Debug for SecureItem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SecureItem")
            .field("id", &self.id)
            .field("item_type", &self.item_type)
            .field("title", &self.title)
            .field("item_data", &"[REDACTED]")
            .field("is_favorite", &self.is_favorite)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}
