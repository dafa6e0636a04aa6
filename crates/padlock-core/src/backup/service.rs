//! Backup orchestration facade.
//!
//! Ties the configuration service, the local repositories, and the WebDAV
//! client together. The database lock is held only while snapshotting or
//! merging records, never across network I/O. Manual and scheduled backups
//! go through one single-flight guard: the loser is rejected with
//! [`Error::BackupInProgress`] instead of racing the same remote path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::backup::merge::{merge_backup, RestoreSummary};
use crate::backup::payload::{
    backup_file_name, build_backup_content, parse_backup_json, render_backup_json, BackupContent,
};
use crate::config::{ConfigService, WebDavConfig};
use crate::db::{
    Database, PasswordRepository, SecureItemRepository, SqlitePasswordRepository,
    SqliteSecureItemRepository,
};
use crate::error::{Error, Result};
use crate::remote::{BackupFile, WebDavClient};

/// Backup/restore entry point shared by the CLI and the auto-backup trigger.
pub struct BackupService {
    db: Arc<Database>,
    config: ConfigService,
    backup_in_flight: AtomicBool,
}

impl BackupService {
    /// Create a service over the shared database handle.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        let config = ConfigService::new(Arc::clone(&db));
        Self {
            db,
            config,
            backup_in_flight: AtomicBool::new(false),
        }
    }

    /// The configuration service backing this instance.
    #[must_use]
    pub const fn config(&self) -> &ConfigService {
        &self.config
    }

    /// Verify credentials with a round-trip, then persist them.
    ///
    /// Nothing is stored when the connection test fails.
    pub async fn test_and_save_config(&self, config: WebDavConfig) -> Result<()> {
        let client = WebDavClient::new(config.clone())?;
        client.test_connection().await?;
        self.config.set_webdav_config(&config)
    }

    /// Test the stored configuration against the server.
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.client()?;
        client.test_connection().await?;
        Ok(())
    }

    /// Snapshot local records per the stored preferences and upload the
    /// payload under a timestamped name. Returns the remote file name.
    pub async fn create_and_upload_backup(&self) -> Result<String> {
        let _guard = self.begin_backup()?;

        let client = self.client()?;
        let prefs = self.config.backup_preferences()?;
        if !prefs.has_any_enabled() {
            return Err(Error::InvalidInput(
                "at least one backup category must be enabled".to_string(),
            ));
        }

        // Snapshot under a short lock, released before any network I/O.
        let content = {
            let conn = self.db.lock()?;
            let passwords = SqlitePasswordRepository::new(&conn).list()?;
            let items = SqliteSecureItemRepository::new(&conn).list()?;
            build_backup_content(&passwords, &items, &prefs)
        };

        let now_ms = Utc::now().timestamp_millis();
        let name = backup_file_name(now_ms);
        let payload = render_backup_json(&content)?;

        client.upload(&name, payload.into_bytes()).await?;
        self.config.set_last_backup_time(now_ms)?;

        tracing::info!(
            "uploaded backup {name} ({} records)",
            content.record_count()
        );
        Ok(name)
    }

    /// List remote backups, newest first.
    pub async fn list_backups(&self) -> Result<Vec<BackupFile>> {
        let client = self.client()?;
        Ok(client.list().await?)
    }

    /// Download and parse a remote backup without touching the local store.
    pub async fn download_backup(&self, name: &str) -> Result<BackupContent> {
        let client = self.client()?;
        let bytes = client.download(name).await?;
        Ok(parse_backup_json(&bytes)?)
    }

    /// Download a remote backup and merge it into the local store.
    pub async fn restore_backup(&self, name: &str) -> Result<RestoreSummary> {
        let content = self.download_backup(name).await?;

        let conn = self.db.lock()?;
        let passwords = SqlitePasswordRepository::new(&conn);
        let items = SqliteSecureItemRepository::new(&conn);
        let summary = merge_backup(&passwords, &items, &content);

        tracing::info!("restored backup {name}: {summary}");
        Ok(summary)
    }

    /// Delete a remote backup file.
    pub async fn delete_backup(&self, name: &str) -> Result<()> {
        let client = self.client()?;
        client.delete(name).await?;
        Ok(())
    }

    fn client(&self) -> Result<WebDavClient> {
        let config = self.config.webdav_config()?.ok_or(Error::NotConfigured)?;
        Ok(WebDavClient::new(config)?)
    }

    fn begin_backup(&self) -> Result<BackupGuard<'_>> {
        if self
            .backup_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::BackupInProgress);
        }
        Ok(BackupGuard {
            flag: &self.backup_in_flight,
        })
    }
}

/// Releases the single-flight flag when a backup finishes, on any path.
struct BackupGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BackupGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{BackupPreferences, PasswordEntry};

    fn service() -> BackupService {
        BackupService::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn configured_service() -> BackupService {
        let service = service();
        let config = WebDavConfig::new("http://127.0.0.1:9", "alice", "pw").unwrap();
        service.config().set_webdav_config(&config).unwrap();
        service
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn operations_require_configuration() {
        let service = service();

        assert!(matches!(
            service.create_and_upload_backup().await.unwrap_err(),
            Error::NotConfigured
        ));
        assert!(matches!(
            service.list_backups().await.unwrap_err(),
            Error::NotConfigured
        ));
        assert!(matches!(
            service.test_connection().await.unwrap_err(),
            Error::NotConfigured
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn backup_is_rejected_when_every_category_is_disabled() {
        let service = configured_service();
        service
            .config()
            .save_backup_preferences(&BackupPreferences {
                include_passwords: false,
                include_authenticators: false,
                include_documents: false,
                include_bank_cards: false,
            })
            .unwrap();

        let error = service.create_and_upload_backup().await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)), "{error:?}");
        assert_eq!(service.config().last_backup_time().unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_backup_is_rejected_while_one_is_in_flight() {
        let service = configured_service();

        let guard = service.begin_backup().unwrap();
        let error = service.create_and_upload_backup().await.unwrap_err();
        assert!(matches!(error, Error::BackupInProgress));
        drop(guard);

        // The flag is released on drop; the next attempt proceeds past the
        // guard (and fails later against the unreachable test endpoint).
        let error = service.create_and_upload_backup().await.unwrap_err();
        assert!(!matches!(error, Error::BackupInProgress), "{error:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_backup_releases_the_single_flight_guard() {
        let service = configured_service();

        // Unreachable endpoint: the upload fails after the guard is taken.
        let error = service.create_and_upload_backup().await.unwrap_err();
        assert!(matches!(error, Error::Remote(_)), "{error:?}");
        assert_eq!(service.config().last_backup_time().unwrap(), None);

        // Guard must be free again.
        let guard = service.begin_backup();
        assert!(guard.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_and_save_config_keeps_nothing_on_failure() {
        let service = service();
        let config = WebDavConfig::new("http://127.0.0.1:9", "alice", "pw").unwrap();

        let error = service.test_and_save_config(config).await.unwrap_err();
        assert!(matches!(error, Error::Remote(_)), "{error:?}");
        assert!(!service.config().is_configured().unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_server_surfaces_classified_remote_error() {
        let service = configured_service();
        {
            let conn = service.db.lock().unwrap();
            SqlitePasswordRepository::new(&conn)
                .insert(&PasswordEntry::new("Bank", "bank.com", "alice", "pw"))
                .unwrap();
        }

        let error = service.create_and_upload_backup().await.unwrap_err();
        match error {
            Error::Remote(remote) => {
                assert!(matches!(
                    remote,
                    crate::remote::WebDavError::Unreachable(_)
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
