//! Backups and retention of message logs.

use crate::adapters::persistence::date_key;
use crate::domain::{BackupSet, DomainError};
use crate::ports::{BackupRepo, MessageLogRepo, SnapshotRepo};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Message logs older than this are purged.
pub const DEFAULT_RETENTION_DAYS: u64 = 30;

/// `backup_<RFC3339 UTC>` with `:` and `.` replaced so the name is filesystem-safe.
pub fn backup_dir_name(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("backup_{}", stamp)
}

pub struct RetentionService {
    snapshots: Arc<dyn SnapshotRepo>,
    messages: Arc<dyn MessageLogRepo>,
    backups: Arc<dyn BackupRepo>,
    retention: Duration,
    /// Scheduled and on-demand backups never run at the same time.
    backup_lock: Mutex<()>,
}

impl RetentionService {
    pub fn new(
        snapshots: Arc<dyn SnapshotRepo>,
        messages: Arc<dyn MessageLogRepo>,
        backups: Arc<dyn BackupRepo>,
        retention_days: u64,
    ) -> Self {
        Self {
            snapshots,
            messages,
            backups,
            retention: Duration::from_secs(retention_days * 24 * 60 * 60),
            backup_lock: Mutex::new(()),
        }
    }

    /// Copy every snapshot file and today's message logs into a new backup directory.
    /// Unreadable source directories and failed copies are logged; the backup still succeeds.
    pub async fn create_backup(&self) -> Result<BackupSet, DomainError> {
        let _guard = self.backup_lock.lock().await;
        let now = Utc::now();

        let mut files = self.snapshots.snapshot_files().await.unwrap_or_else(|e| {
            warn!(error = %e, "cannot list snapshot files for backup");
            Vec::new()
        });
        let today = date_key(now);
        match self.messages.day_files(&today).await {
            Ok(day_files) => files.extend(day_files),
            Err(e) => warn!(error = %e, date = %today, "cannot list message logs for backup"),
        }

        let set = self
            .backups
            .create_backup_set(&backup_dir_name(now), &files)
            .await?;
        if set.failed > 0 {
            warn!(path = %set.path.display(), failed = set.failed, "backup is partial");
        }
        Ok(set)
    }

    /// Delete message logs older than the retention window, measured from now.
    pub async fn purge_old(&self) -> Result<usize, DomainError> {
        self.purge_older_than(SystemTime::now()).await
    }

    pub async fn purge_older_than(&self, now: SystemTime) -> Result<usize, DomainError> {
        let cutoff = now
            .checked_sub(self.retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let deleted = self.messages.purge_modified_before(cutoff).await?;
        info!(
            deleted,
            retention_days = self.retention.as_secs() / 86_400,
            "retention purge finished"
        );
        Ok(deleted)
    }
}
