//! Storage roots and file naming.
//!
//! ```text
//! <base>/groups/<key>.json
//! <base>/messages/<key>_<YYYY-MM-DD>.json
//! <base>/backups/backup_<timestamp>/
//! ```

use crate::domain::DomainError;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const GROUPS_DIR: &str = "groups";
const MESSAGES_DIR: &str = "messages";
const BACKUPS_DIR: &str = "backups";

/// Length of `_YYYY-MM-DD.json`.
const DAY_SUFFIX_LEN: usize = 16;

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
///
/// Deterministic but not injective: `a.b` and `a@b` map to the same key. Transport
/// group ids differ in their alphanumeric part, so this is acceptable for them.
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// UTC calendar date, `YYYY-MM-DD`.
pub fn date_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Split a day-file name into `(key, date)`. `None` for anything else.
pub fn parse_day_file_name(file_name: &str) -> Option<(&str, &str)> {
    let stem = file_name.strip_suffix(".json")?;
    if file_name.len() < DAY_SUFFIX_LEN + 1 {
        return None;
    }
    let split = stem.len() - (DAY_SUFFIX_LEN - ".json".len());
    let key = stem.get(..split)?;
    let date = stem.get(split..)?.strip_prefix('_')?;
    let valid_date = date.len() == 10
        && date
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if key.is_empty() || !valid_date {
        return None;
    }
    Some((key, date))
}

/// The three storage roots under one base directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    base: PathBuf,
}

impl StorageLayout {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// Create the three roots if missing. Idempotent.
    pub async fn ensure(&self) -> Result<(), DomainError> {
        for dir in [self.groups_dir(), self.messages_dir(), self.backups_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| DomainError::Storage(format!("create {}: {}", dir.display(), e)))?;
            debug!(path = %dir.display(), "storage root ready");
        }
        Ok(())
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn groups_dir(&self) -> PathBuf {
        self.base.join(GROUPS_DIR)
    }

    pub fn messages_dir(&self) -> PathBuf {
        self.base.join(MESSAGES_DIR)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.base.join(BACKUPS_DIR)
    }

    pub fn snapshot_path(&self, group_id: &str) -> PathBuf {
        self.groups_dir()
            .join(format!("{}.json", sanitize_key(group_id)))
    }

    pub fn day_file_path(&self, group_id: &str, date_key: &str) -> PathBuf {
        self.messages_dir()
            .join(format!("{}_{}.json", sanitize_key(group_id), date_key))
    }
}

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sibling temp path unique to this process and call: `<name>.<pid>.<seq>.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.{}.{}.tmp", name, std::process::id(), seq))
}

/// Write-replace: temp file, sync_all, rename over the target.
/// Readers never observe a half-written file; concurrent writers never share a temp file.
pub(crate) async fn write_atomic(path: &Path, contents: &str) -> Result<(), DomainError> {
    let temp_path = temp_path_for(path);
    let mut f = fs::File::create(&temp_path)
        .await
        .map_err(|e| DomainError::Storage(format!("create temp file: {}", e)))?;
    f.write_all(contents.as_bytes())
        .await
        .map_err(|e| DomainError::Storage(format!("write temp file: {}", e)))?;
    f.sync_all()
        .await
        .map_err(|e| DomainError::Storage(format!("sync temp file: {}", e)))?;
    drop(f);

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(DomainError::Storage(format!("atomic rename failed: {}", e)));
    }
    Ok(())
}

/// Regular files directly inside `dir`. Missing directory yields an empty list.
pub(crate) async fn list_files(dir: &Path) -> Result<Vec<PathBuf>, DomainError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(DomainError::Storage(format!("read {}: {}", dir.display(), e))),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DomainError::Storage(e.to_string()))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_key_replaces_unsafe_chars() {
        assert_eq!(sanitize_key("120363@g.us"), "120363_g_us");
        assert_eq!(sanitize_key("a-b_C9"), "a-b_C9");
        assert_eq!(sanitize_key("ação/x"), "a__o_x");
    }

    #[test]
    fn test_sanitize_key_is_deterministic_and_safe() {
        let raw = "weird id:with.spaces and/slashes@g.us";
        let first = sanitize_key(raw);
        assert_eq!(first, sanitize_key(raw));
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        );
    }

    #[test]
    fn test_date_key_is_utc_calendar_date() {
        let at = Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 0).unwrap();
        assert_eq!(date_key(at), "2024-01-05");
    }

    #[test]
    fn test_parse_day_file_name() {
        assert_eq!(
            parse_day_file_name("120363_g_us_2024-01-05.json"),
            Some(("120363_g_us", "2024-01-05"))
        );
        assert_eq!(parse_day_file_name("g1.json"), None);
        assert_eq!(parse_day_file_name("_2024-01-05.json"), None);
        assert_eq!(parse_day_file_name("g1_2024-01-05.txt"), None);
        assert_eq!(parse_day_file_name("g1_2024x01-05.json"), None);
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure().await.unwrap();
        layout.ensure().await.unwrap();
        assert!(layout.groups_dir().is_dir());
        assert!(layout.messages_dir().is_dir());
        assert!(layout.backups_dir().is_dir());
    }

    #[test]
    fn test_temp_paths_are_unique_siblings() {
        let target = PathBuf::from("/data/groups/g1.json");
        let a = temp_path_for(&target);
        let b = temp_path_for(&target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        assert!(a.extension().is_some_and(|ext| ext == "tmp"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_atomic_writes_leave_one_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g1.json");
        let mut tasks = Vec::new();
        for i in 0..16 {
            let path = path.clone();
            tasks.push(tokio::spawn(async move {
                write_atomic(&path, &"x".repeat(10 + i * 50)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.chars().all(|c| c == 'x'));
        assert_eq!((content.len() - 10) % 50, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_paths_use_sanitized_key() {
        let layout = StorageLayout::new("/data");
        assert_eq!(
            layout.snapshot_path("1@g.us"),
            PathBuf::from("/data/groups/1_g_us.json")
        );
        assert_eq!(
            layout.day_file_path("1@g.us", "2024-01-05"),
            PathBuf::from("/data/messages/1_g_us_2024-01-05.json")
        );
    }
}
