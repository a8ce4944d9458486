//! Implements SnapshotRepo using one pretty-printed JSON file per group.
//!
//! Saves for the same file are serialized, so the last save to take the lock is the one
//! left on disk.

use crate::adapters::persistence::layout::{
    StorageLayout, list_files, sanitize_key, write_atomic,
};
use crate::domain::{DomainError, GroupSnapshot};
use crate::ports::SnapshotRepo;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// JSON file-based snapshot storage under `groups/`.
pub struct FsSnapshotRepo {
    layout: StorageLayout,
    /// Keyed by sanitized key, since that is what names the file.
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FsSnapshotRepo {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn write_lock(&self, group_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().await;
        Arc::clone(locks.entry(sanitize_key(group_id)).or_default())
    }

    async fn read_snapshot(path: &Path) -> Result<Option<GroupSnapshot>, DomainError> {
        let content = match fs::read_to_string(path).await {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DomainError::Storage(format!("read {}: {}", path.display(), e))),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| DomainError::Storage(format!("parse {}: {}", path.display(), e)))
    }
}

#[async_trait::async_trait]
impl SnapshotRepo for FsSnapshotRepo {
    async fn save_snapshot(&self, snapshot: &GroupSnapshot) -> Result<(), DomainError> {
        fs::create_dir_all(self.layout.groups_dir())
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let path = self.layout.snapshot_path(&snapshot.id);
        let lock = self.write_lock(&snapshot.id).await;
        let _guard = lock.lock().await;
        write_atomic(&path, &json).await?;
        debug!(path = %path.display(), group_id = %snapshot.id, "snapshot written");
        Ok(())
    }

    async fn load_snapshot(&self, group_id: &str) -> Result<Option<GroupSnapshot>, DomainError> {
        Self::read_snapshot(&self.layout.snapshot_path(group_id)).await
    }

    async fn list_snapshots(&self) -> Result<Vec<GroupSnapshot>, DomainError> {
        let mut out = Vec::new();
        for path in self.snapshot_files().await? {
            match Self::read_snapshot(&path).await {
                Ok(Some(snapshot)) => out.push(snapshot),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping corrupt snapshot"),
            }
        }
        Ok(out)
    }

    async fn snapshot_files(&self) -> Result<Vec<PathBuf>, DomainError> {
        let files = list_files(&self.layout.groups_dir()).await?;
        Ok(files
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect())
    }
}
