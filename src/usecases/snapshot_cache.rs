//! In-memory group-id → snapshot map, backed by one JSON file per group.
//!
//! The transport is the source of truth; cache and file are projections that can lag
//! behind real group state between events.

use crate::domain::{DomainError, GroupSnapshot};
use crate::ports::{GroupGateway, SnapshotRepo};
use crate::usecases::stats_service::StatsService;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct SnapshotCache {
    gateway: Arc<dyn GroupGateway>,
    repo: Arc<dyn SnapshotRepo>,
    stats: Arc<StatsService>,
    cache: RwLock<HashMap<String, GroupSnapshot>>,
}

impl SnapshotCache {
    pub fn new(
        gateway: Arc<dyn GroupGateway>,
        repo: Arc<dyn SnapshotRepo>,
        stats: Arc<StatsService>,
    ) -> Self {
        Self {
            gateway,
            repo,
            stats,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild the group's snapshot from live metadata and store it in memory and on disk.
    ///
    /// # Errors
    /// `DomainError::Transport` when metadata cannot be fetched; cache and file are left
    /// untouched. A failed file write is logged only; the fresh snapshot is still returned.
    pub async fn refresh(
        &self,
        group_id: &str,
        event_type: &str,
    ) -> Result<GroupSnapshot, DomainError> {
        let metadata = self.gateway.fetch_group_metadata(group_id).await?;
        let now_ms = Utc::now().timestamp_millis();
        let stats = self.stats.group_stats(group_id, now_ms).await;
        let snapshot = GroupSnapshot::from_metadata(group_id, metadata, event_type, stats, now_ms);

        self.cache
            .write()
            .await
            .insert(group_id.to_string(), snapshot.clone());

        if let Err(e) = self.repo.save_snapshot(&snapshot).await {
            warn!(group_id, error = %e, "snapshot write failed; keeping in-memory copy");
        }
        info!(
            group_id,
            name = %snapshot.name,
            members = snapshot.member_count,
            event = event_type,
            "group snapshot saved"
        );
        Ok(snapshot)
    }

    /// Cached snapshot, falling back to the file on disk. Missing or corrupt file → `None`.
    pub async fn get(&self, group_id: &str) -> Option<GroupSnapshot> {
        if let Some(snapshot) = self.cache.read().await.get(group_id) {
            return Some(snapshot.clone());
        }
        match self.repo.load_snapshot(group_id).await {
            Ok(Some(snapshot)) => {
                self.cache
                    .write()
                    .await
                    .insert(group_id.to_string(), snapshot.clone());
                Some(snapshot)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(group_id, error = %e, "stored snapshot unreadable, treating as absent");
                None
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}
