//! Implements BackupRepo: flat copies into `backups/<name>/`.

use crate::adapters::persistence::layout::StorageLayout;
use crate::domain::{BackupSet, DomainError};
use crate::ports::BackupRepo;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

pub struct FsBackupRepo {
    layout: StorageLayout,
}

impl FsBackupRepo {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }
}

#[async_trait::async_trait]
impl BackupRepo for FsBackupRepo {
    async fn create_backup_set(
        &self,
        name: &str,
        files: &[PathBuf],
    ) -> Result<BackupSet, DomainError> {
        let dir = self.layout.backups_dir().join(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| DomainError::Storage(format!("create {}: {}", dir.display(), e)))?;

        let mut copied = 0usize;
        let mut failed = 0usize;
        for src in files {
            let Some(file_name) = src.file_name() else {
                continue;
            };
            match fs::copy(src, dir.join(file_name)).await {
                Ok(_) => copied += 1,
                Err(e) => {
                    failed += 1;
                    warn!(path = %src.display(), error = %e, "backup copy failed, skipping");
                }
            }
        }

        info!(path = %dir.display(), copied, failed, "backup created");
        Ok(BackupSet {
            path: dir,
            copied,
            failed,
        })
    }
}
