//! Read-only roll-ups over the snapshot and message stores.
//!
//! Always recomputed on demand; nothing is cached here.

use crate::adapters::persistence::date_key;
use crate::domain::GroupStats;
use crate::ports::{MessageLogRepo, SnapshotRepo};
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sums read from snapshot files (stored stats, not recomputed).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoredTotals {
    pub groups: usize,
    pub members: usize,
    pub messages: usize,
}

pub struct StatsService {
    snapshots: Arc<dyn SnapshotRepo>,
    messages: Arc<dyn MessageLogRepo>,
}

impl StatsService {
    pub fn new(snapshots: Arc<dyn SnapshotRepo>, messages: Arc<dyn MessageLogRepo>) -> Self {
        Self {
            snapshots,
            messages,
        }
    }

    /// Records across every day-file of the group. Unreadable directory counts as zero.
    pub async fn message_count(&self, group_id: &str) -> usize {
        match self.messages.count_records(group_id).await {
            Ok(n) => n,
            Err(e) => {
                warn!(group_id, error = %e, "message count unavailable");
                0
            }
        }
    }

    /// Distinct senders in today's day-file within the last 24 hours.
    pub async fn active_members(&self, group_id: &str) -> usize {
        let now = Utc::now();
        let cutoff = (now - Duration::hours(24)).timestamp_millis();
        let records = match self.messages.read_day(group_id, &date_key(now)).await {
            Ok(records) => records,
            Err(e) => {
                debug!(group_id, error = %e, "today's day-file unreadable");
                return 0;
            }
        };
        records
            .iter()
            .filter(|r| r.timestamp > cutoff)
            .filter_map(|r| r.participant.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Stats block embedded in a fresh snapshot.
    pub async fn group_stats(&self, group_id: &str, now_ms: i64) -> GroupStats {
        GroupStats {
            total_messages: self.message_count(group_id).await,
            last_activity: now_ms,
            active_members: self.active_members(group_id).await,
        }
    }

    pub async fn stored_totals(&self) -> StoredTotals {
        let snapshots = match self.snapshots.list_snapshots().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "snapshot directory unreadable");
                return StoredTotals::default();
            }
        };
        StoredTotals {
            groups: snapshots.len(),
            members: snapshots.iter().map(|s| s.member_count).sum(),
            messages: snapshots.iter().map(|s| s.stats.total_messages).sum(),
        }
    }
}
