//! Backup content preferences

use serde::{Deserialize, Serialize};

use super::SecureItemType;

/// Flag set selecting which content categories a backup includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPreferences {
    /// Include password entries
    pub include_passwords: bool,
    /// Include TOTP authenticator items
    pub include_authenticators: bool,
    /// Include document items
    pub include_documents: bool,
    /// Include bank card items
    pub include_bank_cards: bool,
}

impl BackupPreferences {
    /// True when at least one category is selected.
    ///
    /// Backup creation is rejected when this is false.
    #[must_use]
    pub const fn has_any_enabled(self) -> bool {
        self.include_passwords
            || self.include_authenticators
            || self.include_documents
            || self.include_bank_cards
    }

    /// Whether items of the given category belong in the backup.
    ///
    /// `Note` items follow the documents flag: the flag set names only the
    /// three original categories and documents are the free-text catch-all.
    #[must_use]
    pub const fn includes(self, item_type: SecureItemType) -> bool {
        match item_type {
            SecureItemType::Totp => self.include_authenticators,
            SecureItemType::BankCard => self.include_bank_cards,
            SecureItemType::Document | SecureItemType::Note => self.include_documents,
        }
    }
}

impl Default for BackupPreferences {
    fn default() -> Self {
        Self {
            include_passwords: true,
            include_authenticators: true,
            include_documents: true,
            include_bank_cards: true,
        }
    }
}
