//! Implements MessageLogRepo. One JSON array per group per UTC day:
//! `messages/<key>_<YYYY-MM-DD>.json`.
//!
//! Flushes rewrite the whole day-file (read all + append + write all). Callers must
//! serialize `append_day` per group; this adapter does no locking of its own.

use crate::adapters::persistence::layout::{
    StorageLayout, list_files, parse_day_file_name, sanitize_key, write_atomic,
};
use crate::domain::{DomainError, MessageRecord};
use crate::ports::MessageLogRepo;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info, warn};

/// File-system message log.
pub struct FsMessageLog {
    layout: StorageLayout,
}

impl FsMessageLog {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// `Ok(None)` when the file is absent.
    async fn read_records(path: &Path) -> Result<Option<Vec<MessageRecord>>, DomainError> {
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
impl MessageLogRepo for FsMessageLog {
    async fn append_day(
        &self,
        group_id: &str,
        date_key: &str,
        records: &[MessageRecord],
    ) -> Result<usize, DomainError> {
        let path = self.layout.day_file_path(group_id, date_key);
        if records.is_empty() {
            return Ok(Self::read_records(&path).await?.map_or(0, |r| r.len()));
        }
        fs::create_dir_all(self.layout.messages_dir())
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let mut existing = match Self::read_records(&path).await {
            Ok(found) => found.unwrap_or_default(),
            Err(e) => {
                // A corrupt day-file must not block new writes; it is replaced.
                warn!(path = %path.display(), error = %e, "existing day-file unreadable, overwriting");
                Vec::new()
            }
        };
        existing.extend_from_slice(records);

        let json = serde_json::to_string_pretty(&existing)
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        write_atomic(&path, &json).await?;
        debug!(
            path = %path.display(),
            group_id,
            appended = records.len(),
            total = existing.len(),
            "day-file written"
        );
        Ok(existing.len())
    }

    async fn read_day(
        &self,
        group_id: &str,
        date_key: &str,
    ) -> Result<Vec<MessageRecord>, DomainError> {
        let path = self.layout.day_file_path(group_id, date_key);
        Ok(Self::read_records(&path).await?.unwrap_or_default())
    }

    async fn count_records(&self, group_id: &str) -> Result<usize, DomainError> {
        let key = sanitize_key(group_id);
        let mut total = 0usize;
        for path in list_files(&self.layout.messages_dir()).await? {
            let belongs = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_day_file_name)
                .is_some_and(|(k, _)| k == key);
            if !belongs {
                continue;
            }
            if let Ok(Some(records)) = Self::read_records(&path).await {
                total += records.len();
            }
        }
        Ok(total)
    }

    async fn day_files(&self, date_key: &str) -> Result<Vec<PathBuf>, DomainError> {
        let files = list_files(&self.layout.messages_dir()).await?;
        Ok(files
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(parse_day_file_name)
                    .is_some_and(|(_, d)| d == date_key)
            })
            .collect())
    }

    async fn purge_modified_before(&self, cutoff: SystemTime) -> Result<usize, DomainError> {
        let mut deleted = 0usize;
        for path in list_files(&self.layout.messages_dir()).await? {
            let modified = match fs::metadata(&path).await.and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat message log");
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => {
                    deleted += 1;
                    debug!(path = %path.display(), "removed expired message log");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove message log"),
            }
        }
        if deleted > 0 {
            info!(deleted, "retention purge removed old message logs");
        }
        Ok(deleted)
    }
}
