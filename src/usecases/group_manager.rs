//! Group manager: the single state object behind event handlers, commands and the
//! maintenance scheduler. Constructed once at startup and shared via `Arc`.
//!
//! Nothing here returns an error into the event loop; failures are logged and turn
//! into a no-op or a default value.

use crate::domain::{BackupSet, GeneralStats, GroupSnapshot, MessageRecord};
use crate::usecases::message_buffer::MessageBuffer;
use crate::usecases::retention_service::RetentionService;
use crate::usecases::snapshot_cache::SnapshotCache;
use crate::usecases::stats_service::StatsService;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Membership change reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantsAction {
    Add,
    Remove,
    Promote,
    Demote,
}

impl ParticipantsAction {
    fn event_type(self) -> &'static str {
        match self {
            ParticipantsAction::Add => "member_added",
            ParticipantsAction::Remove => "member_removed",
            ParticipantsAction::Promote => "participants_promote",
            ParticipantsAction::Demote => "participants_demote",
        }
    }
}

pub struct GroupManager {
    snapshots: Arc<SnapshotCache>,
    buffer: Arc<MessageBuffer>,
    retention: Arc<RetentionService>,
    stats: Arc<StatsService>,
}

impl GroupManager {
    pub fn new(
        snapshots: Arc<SnapshotCache>,
        buffer: Arc<MessageBuffer>,
        retention: Arc<RetentionService>,
        stats: Arc<StatsService>,
    ) -> Self {
        Self {
            snapshots,
            buffer,
            retention,
            stats,
        }
    }

    /// Inbound group message: refresh the snapshot, then buffer the record. The record is
    /// buffered even when the transport cannot provide metadata.
    pub async fn on_group_message(&self, group_id: &str, record: MessageRecord) {
        self.refresh(group_id, "message_activity").await;
        self.buffer.append(group_id, record).await;
    }

    pub async fn on_participants_update(&self, group_id: &str, action: ParticipantsAction) {
        self.refresh(group_id, action.event_type()).await;
    }

    pub async fn on_settings_changed(&self, group_id: &str) {
        self.refresh(group_id, "settings_changed").await;
    }

    /// Refresh with an explicit event tag. `None` when the transport is unavailable.
    pub async fn refresh(&self, group_id: &str, event_type: &str) -> Option<GroupSnapshot> {
        match self.snapshots.refresh(group_id, event_type).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(group_id, event = event_type, error = %e, "group snapshot not refreshed");
                None
            }
        }
    }

    pub async fn snapshot(&self, group_id: &str) -> Option<GroupSnapshot> {
        self.snapshots.get(group_id).await
    }

    pub async fn buffer_len(&self, group_id: &str) -> usize {
        self.buffer.buffer_len(group_id).await
    }

    pub async fn message_count(&self, group_id: &str) -> usize {
        self.stats.message_count(group_id).await
    }

    pub async fn general_stats(&self) -> GeneralStats {
        let totals = self.stats.stored_totals().await;
        GeneralStats {
            total_groups: totals.groups,
            total_members: totals.members,
            total_messages: totals.messages,
            cache_size: self.snapshots.len().await,
            buffer_size: self.buffer.total_buffered().await,
        }
    }

    pub async fn flush_all(&self) -> usize {
        self.buffer.flush_all().await
    }

    /// Periodic autosave body.
    pub async fn autosave_tick(&self) {
        let written = self.buffer.flush_all().await;
        if written > 0 {
            info!(written, "autosave flushed buffers");
        }
    }

    /// Scheduled hourly backup body.
    pub async fn hourly_backup(&self) {
        self.buffer.flush_all().await;
        if let Err(e) = self.retention.create_backup().await {
            error!(error = %e, "scheduled backup failed");
        }
    }

    /// On-demand backup: flush everything first so today's logs are complete.
    pub async fn backup_now(&self) -> Option<BackupSet> {
        self.buffer.flush_all().await;
        match self.retention.create_backup().await {
            Ok(set) => Some(set),
            Err(e) => {
                error!(error = %e, "backup failed");
                None
            }
        }
    }

    pub async fn purge_old(&self) -> usize {
        match self.retention.purge_old().await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "retention purge failed");
                0
            }
        }
    }

    /// Final flush before the process exits or restarts.
    pub async fn shutdown(&self) {
        let written = self.buffer.flush_all().await;
        let left = self.buffer.total_buffered().await;
        if left > 0 {
            warn!(written, left, "shutdown with unflushed records");
        } else {
            info!(written, "buffers flushed on shutdown");
        }
    }
}
