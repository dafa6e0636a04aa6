//! Password entry model

use serde::{Deserialize, Serialize};

use super::UNASSIGNED_ID;

/// A stored website/service credential.
///
/// Identity is the local autoincrement `id`; duplicate detection during
/// restore uses the `(title, username, website)` triple instead, so the same
/// credential imported from a backup never creates a second row.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordEntry {
    /// Local store id, [`UNASSIGNED_ID`] until inserted
    #[serde(default)]
    pub id: i64,
    /// Display title
    pub title: String,
    /// Website or service address
    pub website: String,
    /// Account username
    pub username: String,
    /// Account password
    pub password: String,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
    /// Pinned in list views
    #[serde(default)]
    pub is_favorite: bool,
}

impl PasswordEntry {
    /// Create a new, not-yet-persisted entry.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        website: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: UNASSIGNED_ID,
            title: title.into(),
            website: website.into(),
            username: username.into(),
            password: password.into(),
            notes: String::new(),
            is_favorite: false,
        }
    }

    /// Check whether this entry matches the given dedup key.
    #[must_use]
    pub fn matches_key(&self, title: &str, username: &str, website: &str) -> bool {
        self.title == title && self.username == username && self.website == website
    }
}

impl std::fmt::Debug for PasswordEntry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PasswordEntry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("website", &self.website)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("is_favorite", &self.is_favorite)
            .finish_non_exhaustive()
    }
}
