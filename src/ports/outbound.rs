//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{BackupSet, DomainError, GroupMetadata, GroupSnapshot, MessageRecord};
use std::path::PathBuf;
use std::time::SystemTime;

/// Messaging transport. Everything the core needs from the protocol client.
#[async_trait::async_trait]
pub trait GroupGateway: Send + Sync {
    /// Fetch live metadata (participants, settings) for a group.
    async fn fetch_group_metadata(&self, group_id: &str) -> Result<GroupMetadata, DomainError>;

    /// Send a text message to a group. Delivery is fire-and-forget for the caller.
    async fn send_message(&self, group_id: &str, text: &str) -> Result<(), DomainError>;

    /// The bot's own participant id, when the session knows it.
    fn own_id(&self) -> Option<String> {
        None
    }

    /// Remove a participant. Fails when the bot lacks permission.
    async fn remove_participant(
        &self,
        group_id: &str,
        participant_id: &str,
    ) -> Result<(), DomainError>;
}

/// One JSON file per group snapshot.
#[async_trait::async_trait]
pub trait SnapshotRepo: Send + Sync {
    /// Overwrite the group's snapshot file (last write wins).
    async fn save_snapshot(&self, snapshot: &GroupSnapshot) -> Result<(), DomainError>;

    /// Load a snapshot. `Ok(None)` when no file exists; `Err` when it cannot be parsed.
    async fn load_snapshot(&self, group_id: &str) -> Result<Option<GroupSnapshot>, DomainError>;

    /// All parseable snapshots. Corrupt files are skipped.
    async fn list_snapshots(&self) -> Result<Vec<GroupSnapshot>, DomainError>;

    /// Paths of every file in the snapshot directory (backup source).
    async fn snapshot_files(&self) -> Result<Vec<PathBuf>, DomainError>;
}

/// Per-group, per-day message logs.
#[async_trait::async_trait]
pub trait MessageLogRepo: Send + Sync {
    /// Merge `records` into the group's day-file: read existing (corrupt = empty), append,
    /// write the full array back. Returns the number of records now in the file.
    async fn append_day(
        &self,
        group_id: &str,
        date_key: &str,
        records: &[MessageRecord],
    ) -> Result<usize, DomainError>;

    /// Records of one day-file. Empty when the file does not exist; `Err` when corrupt.
    async fn read_day(
        &self,
        group_id: &str,
        date_key: &str,
    ) -> Result<Vec<MessageRecord>, DomainError>;

    /// Total records across all of the group's day-files. Corrupt files count as zero.
    async fn count_records(&self, group_id: &str) -> Result<usize, DomainError>;

    /// Paths of every day-file (any group) for `date_key`.
    async fn day_files(&self, date_key: &str) -> Result<Vec<PathBuf>, DomainError>;

    /// Delete message-log files last modified before `cutoff`. Returns the count removed.
    async fn purge_modified_before(&self, cutoff: SystemTime) -> Result<usize, DomainError>;
}

/// Point-in-time copies of the stores.
#[async_trait::async_trait]
pub trait BackupRepo: Send + Sync {
    /// Create `name` under the backup root and copy `files` into it (flat).
    /// Individual copy failures are counted, not returned.
    async fn create_backup_set(
        &self,
        name: &str,
        files: &[PathBuf],
    ) -> Result<BackupSet, DomainError>;
}
