//! WebDAV and backup configuration.
//!
//! All persisted flags live in the local `settings` table behind
//! [`ConfigService`], the single source of truth for remote credentials,
//! the auto-backup switch, the last-backup timestamp, and the backup
//! content preferences. Screens and background tasks read through this
//! service instead of sharing ambient global state.

use std::sync::Arc;

use crate::db::{Database, SettingsRepository, SqliteSettingsRepository};
use crate::error::{Error, Result};
use crate::models::BackupPreferences;

const KEY_SERVER_URL: &str = "webdav.server_url";
const KEY_USERNAME: &str = "webdav.username";
const KEY_PASSWORD: &str = "webdav.password";
const KEY_AUTO_BACKUP: &str = "backup.auto_enabled";
const KEY_LAST_BACKUP_MS: &str = "backup.last_time_ms";
const KEY_INCLUDE_PASSWORDS: &str = "backup.include_passwords";
const KEY_INCLUDE_AUTHENTICATORS: &str = "backup.include_authenticators";
const KEY_INCLUDE_DOCUMENTS: &str = "backup.include_documents";
const KEY_INCLUDE_BANK_CARDS: &str = "backup.include_bank_cards";

/// Remote store credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct WebDavConfig {
    /// Server base URL, normalized without a trailing slash
    pub server_url: String,
    /// Basic auth username
    pub username: String,
    /// Basic auth password
    pub password: String,
}

impl WebDavConfig {
    /// Build a validated config.
    ///
    /// The server URL must carry an http/https scheme; a trailing slash is
    /// trimmed so path building stays uniform. Empty fields are rejected.
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let server_url = normalize_server_url(server_url.into())?;

        let username = username.into().trim().to_string();
        if username.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".to_string()));
        }

        let password = password.into();
        if password.is_empty() {
            return Err(Error::InvalidInput("password must not be empty".to_string()));
        }

        Ok(Self {
            server_url,
            username,
            password,
        })
    }
}

impl std::fmt::Debug for WebDavConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("WebDavConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Persisted configuration API over the shared database.
#[derive(Clone)]
pub struct ConfigService {
    db: Arc<Database>,
}

impl ConfigService {
    /// Create a service over the shared database handle
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Read the stored WebDAV credentials, `None` when unconfigured
    pub fn webdav_config(&self) -> Result<Option<WebDavConfig>> {
        let conn = self.db.lock()?;
        let settings = SqliteSettingsRepository::new(&conn);

        let (Some(server_url), Some(username), Some(password)) = (
            settings.get(KEY_SERVER_URL)?,
            settings.get(KEY_USERNAME)?,
            settings.get(KEY_PASSWORD)?,
        ) else {
            return Ok(None);
        };

        if server_url.is_empty() || username.is_empty() {
            return Ok(None);
        }

        Ok(Some(WebDavConfig {
            server_url,
            username,
            password,
        }))
    }

    /// Store WebDAV credentials (already validated by [`WebDavConfig::new`])
    pub fn set_webdav_config(&self, config: &WebDavConfig) -> Result<()> {
        let conn = self.db.lock()?;
        let settings = SqliteSettingsRepository::new(&conn);

        settings.set(KEY_SERVER_URL, &config.server_url)?;
        settings.set(KEY_USERNAME, &config.username)?;
        settings.set(KEY_PASSWORD, &config.password)?;
        Ok(())
    }

    /// Remove stored credentials and the auto-backup switch that depends on them
    pub fn clear_webdav_config(&self) -> Result<()> {
        let conn = self.db.lock()?;
        let settings = SqliteSettingsRepository::new(&conn);

        settings.delete(KEY_SERVER_URL)?;
        settings.delete(KEY_USERNAME)?;
        settings.delete(KEY_PASSWORD)?;
        settings.delete(KEY_AUTO_BACKUP)?;
        Ok(())
    }

    /// Whether WebDAV credentials are stored
    pub fn is_configured(&self) -> Result<bool> {
        Ok(self.webdav_config()?.is_some())
    }

    /// Whether scheduled backups are switched on
    pub fn auto_backup_enabled(&self) -> Result<bool> {
        let conn = self.db.lock()?;
        let settings = SqliteSettingsRepository::new(&conn);
        Ok(settings
            .get(KEY_AUTO_BACKUP)?
            .is_some_and(|value| parse_bool(&value)))
    }

    /// Switch scheduled backups on or off
    pub fn set_auto_backup_enabled(&self, enabled: bool) -> Result<()> {
        let conn = self.db.lock()?;
        let settings = SqliteSettingsRepository::new(&conn);
        settings.set(KEY_AUTO_BACKUP, if enabled { "true" } else { "false" })
    }

    /// When the last successful backup finished (Unix ms)
    pub fn last_backup_time(&self) -> Result<Option<i64>> {
        let conn = self.db.lock()?;
        let settings = SqliteSettingsRepository::new(&conn);
        Ok(settings
            .get(KEY_LAST_BACKUP_MS)?
            .and_then(|value| value.parse().ok()))
    }

    /// Record a successful backup timestamp (Unix ms)
    pub fn set_last_backup_time(&self, timestamp_ms: i64) -> Result<()> {
        let conn = self.db.lock()?;
        let settings = SqliteSettingsRepository::new(&conn);
        settings.set(KEY_LAST_BACKUP_MS, &timestamp_ms.to_string())
    }

    /// Read the persisted content preferences, all-enabled when unset
    pub fn backup_preferences(&self) -> Result<BackupPreferences> {
        let conn = self.db.lock()?;
        let settings = SqliteSettingsRepository::new(&conn);
        let defaults = BackupPreferences::default();

        Ok(BackupPreferences {
            include_passwords: read_flag(
                &settings,
                KEY_INCLUDE_PASSWORDS,
                defaults.include_passwords,
            )?,
            include_authenticators: read_flag(
                &settings,
                KEY_INCLUDE_AUTHENTICATORS,
                defaults.include_authenticators,
            )?,
            include_documents: read_flag(
                &settings,
                KEY_INCLUDE_DOCUMENTS,
                defaults.include_documents,
            )?,
            include_bank_cards: read_flag(
                &settings,
                KEY_INCLUDE_BANK_CARDS,
                defaults.include_bank_cards,
            )?,
        })
    }

    /// Persist content preferences
    pub fn save_backup_preferences(&self, prefs: &BackupPreferences) -> Result<()> {
        let conn = self.db.lock()?;
        let settings = SqliteSettingsRepository::new(&conn);

        write_flag(&settings, KEY_INCLUDE_PASSWORDS, prefs.include_passwords)?;
        write_flag(
            &settings,
            KEY_INCLUDE_AUTHENTICATORS,
            prefs.include_authenticators,
        )?;
        write_flag(&settings, KEY_INCLUDE_DOCUMENTS, prefs.include_documents)?;
        write_flag(&settings, KEY_INCLUDE_BANK_CARDS, prefs.include_bank_cards)?;
        Ok(())
    }
}

fn read_flag(
    settings: &SqliteSettingsRepository<'_>,
    key: &str,
    default: bool,
) -> Result<bool> {
    Ok(settings
        .get(key)?
        .map_or(default, |value| parse_bool(&value)))
}

fn write_flag(settings: &SqliteSettingsRepository<'_>, key: &str, value: bool) -> Result<()> {
    settings.set(key, if value { "true" } else { "false" })
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn normalize_server_url(raw: String) -> Result<String> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(Error::InvalidInput("server URL must not be empty".to_string()));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "server URL must include http:// or https://".to_string(),
        ))
    }
}
