//! Background auto-backup trigger.
//!
//! Periodically drives the same upload path as a manual backup, honoring
//! the stored preferences and the single-flight guard. Tick errors are
//! logged and the loop keeps running.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::backup::BackupService;
use crate::error::{Error, Result};

/// Default cadence between scheduled backups.
pub const DEFAULT_AUTO_BACKUP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Whether a scheduled backup should run now.
///
/// A vault that has never been backed up is always due.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // periods are far below i64::MAX ms
pub const fn is_due(last_backup_ms: Option<i64>, now_ms: i64, period: Duration) -> bool {
    match last_backup_ms {
        None => true,
        Some(last) => now_ms.saturating_sub(last) >= period.as_millis() as i64,
    }
}

/// Run one scheduled-backup check: upload when enabled, configured, and due.
///
/// Returns the uploaded file name, or `None` when nothing was due.
pub async fn run_scheduled_backup(
    service: &BackupService,
    period: Duration,
) -> Result<Option<String>> {
    let config = service.config();
    if !config.auto_backup_enabled()? || !config.is_configured()? {
        return Ok(None);
    }

    let now_ms = Utc::now().timestamp_millis();
    if !is_due(config.last_backup_time()?, now_ms, period) {
        return Ok(None);
    }

    let name = service.create_and_upload_backup().await?;
    Ok(Some(name))
}

/// Spawn the auto-backup loop on the current runtime.
///
/// The first tick fires immediately, so a vault that is already due gets
/// backed up at startup rather than one full period later.
pub fn spawn_auto_backup(service: Arc<BackupService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match run_scheduled_backup(&service, period).await {
                Ok(Some(name)) => tracing::info!("auto backup uploaded as {name}"),
                Ok(None) => tracing::debug!("auto backup tick: nothing due"),
                Err(Error::BackupInProgress) => {
                    tracing::debug!("auto backup tick skipped: backup already running");
                }
                Err(error) => tracing::error!("auto backup failed: {error}"),
            }
        }
    })
}

/// On-demand escape hatch used by the "backup now" action.
///
/// Same path, same preferences, same single-flight guard as the scheduled
/// trigger.
pub async fn trigger_backup_now(service: &BackupService) -> Result<String> {
    service.create_and_upload_backup().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebDavConfig;
    use crate::db::Database;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    #[test]
    fn never_backed_up_is_always_due() {
        assert!(is_due(None, 0, HOUR));
        assert!(is_due(None, i64::MAX, DEFAULT_AUTO_BACKUP_PERIOD));
    }

    #[test]
    fn due_exactly_at_the_period_boundary() {
        let hour_ms = 60 * 60 * 1000;
        assert!(!is_due(Some(0), hour_ms - 1, HOUR));
        assert!(is_due(Some(0), hour_ms, HOUR));
        assert!(is_due(Some(0), hour_ms + 1, HOUR));
    }

    #[test]
    fn clock_regressions_do_not_trigger_a_backup() {
        // last_backup in the future (clock moved backwards): not due.
        assert!(!is_due(Some(10_000), 5_000, Duration::from_millis(1)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduled_run_is_a_no_op_when_disabled_or_unconfigured() {
        let service = BackupService::new(Arc::new(Database::open_in_memory().unwrap()));

        // Neither enabled nor configured.
        assert_eq!(run_scheduled_backup(&service, HOUR).await.unwrap(), None);

        // Enabled but unconfigured: still nothing to do, and no error.
        service.config().set_auto_backup_enabled(true).unwrap();
        assert_eq!(run_scheduled_backup(&service, HOUR).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduled_run_is_a_no_op_when_not_due() {
        let service = BackupService::new(Arc::new(Database::open_in_memory().unwrap()));
        service.config().set_auto_backup_enabled(true).unwrap();
        service
            .config()
            .set_webdav_config(&WebDavConfig::new("http://127.0.0.1:9", "alice", "pw").unwrap())
            .unwrap();

        let now_ms = Utc::now().timestamp_millis();
        service.config().set_last_backup_time(now_ms).unwrap();

        // Due check short-circuits before any network access.
        assert_eq!(run_scheduled_backup(&service, HOUR).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduled_run_attempts_upload_when_due() {
        let service = BackupService::new(Arc::new(Database::open_in_memory().unwrap()));
        service.config().set_auto_backup_enabled(true).unwrap();
        service
            .config()
            .set_webdav_config(&WebDavConfig::new("http://127.0.0.1:9", "alice", "pw").unwrap())
            .unwrap();

        // Never backed up: due, so the upload path runs and fails against
        // the unreachable test endpoint.
        let error = run_scheduled_backup(&service, HOUR).await.unwrap_err();
        assert!(matches!(error, Error::Remote(_)), "{error:?}");
    }
}
