//! Per-group in-memory message buffers with size-triggered flush to day-files.
//!
//! - `append` pushes and flushes synchronously once the threshold is reached
//! - `flush` swaps the buffer out under the map lock, so appends racing with a flush
//!   land either in this flush or in the next one, never in both and never nowhere
//! - flushes of the same group are serialized on a per-group lock because the day-file
//!   write is a read-modify-write spanning several await points

use crate::adapters::persistence::date_key;
use crate::domain::MessageRecord;
use crate::ports::MessageLogRepo;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Records per group that trigger an immediate flush.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 50;

pub struct MessageBuffer {
    log: Arc<dyn MessageLogRepo>,
    threshold: usize,
    buffers: Mutex<HashMap<String, Vec<MessageRecord>>>,
    flush_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MessageBuffer {
    pub fn new(log: Arc<dyn MessageLogRepo>, threshold: usize) -> Self {
        Self {
            log,
            threshold: threshold.max(1),
            buffers: Mutex::new(HashMap::new()),
            flush_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub async fn append(&self, group_id: &str, record: MessageRecord) {
        let len = {
            let mut buffers = self.buffers.lock().await;
            let buffer = buffers.entry(group_id.to_string()).or_default();
            buffer.push(record);
            buffer.len()
        };
        if len >= self.threshold {
            debug!(group_id, len, "buffer threshold reached");
            self.flush(group_id).await;
        }
    }

    /// Merge the group's buffer into today's day-file. Returns the number of records
    /// written; 0 when the buffer was empty or the write failed (records stay buffered).
    pub async fn flush(&self, group_id: &str) -> usize {
        let lock = self.flush_lock(group_id).await;
        let _guard = lock.lock().await;

        let pending = {
            let mut buffers = self.buffers.lock().await;
            match buffers.get_mut(group_id) {
                Some(buffer) if !buffer.is_empty() => std::mem::take(buffer),
                _ => Vec::new(),
            }
        };
        if pending.is_empty() {
            self.release(group_id, &lock).await;
            return 0;
        }

        let date = date_key(Utc::now());
        match self.log.append_day(group_id, &date, &pending).await {
            Ok(total) => {
                info!(
                    group_id,
                    count = pending.len(),
                    day_total = total,
                    date = %date,
                    "message buffer flushed"
                );
                self.release(group_id, &lock).await;
                pending.len()
            }
            Err(e) => {
                warn!(group_id, count = pending.len(), error = %e, "flush failed; records kept for next tick");
                let mut buffers = self.buffers.lock().await;
                let buffer = buffers.entry(group_id.to_string()).or_default();
                let newer = std::mem::replace(buffer, pending);
                buffer.extend(newer);
                0
            }
        }
    }

    /// Flush every group with pending records. Returns the total written.
    pub async fn flush_all(&self) -> usize {
        let groups: Vec<String> = {
            let buffers = self.buffers.lock().await;
            buffers
                .iter()
                .filter(|(_, records)| !records.is_empty())
                .map(|(id, _)| id.clone())
                .collect()
        };
        let mut written = 0;
        for group_id in groups {
            written += self.flush(&group_id).await;
        }
        written
    }

    pub async fn buffer_len(&self, group_id: &str) -> usize {
        self.buffers
            .lock()
            .await
            .get(group_id)
            .map_or(0, |b| b.len())
    }

    pub async fn total_buffered(&self) -> usize {
        self.buffers.lock().await.values().map(|b| b.len()).sum()
    }

    /// Drop the group's map entries once nothing is pending and no other flush is
    /// waiting on its lock. Keeps both maps bounded by the groups with live traffic.
    async fn release(&self, group_id: &str, lock: &Arc<Mutex<()>>) {
        {
            let mut buffers = self.buffers.lock().await;
            if buffers.get(group_id).is_some_and(|b| b.is_empty()) {
                buffers.remove(group_id);
            }
        }
        let mut locks = self.flush_locks.lock().await;
        // One reference in the map, one held by the caller.
        if Arc::strong_count(lock) == 2 {
            locks.remove(group_id);
        }
    }

    async fn flush_lock(&self, group_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.flush_locks.lock().await;
        Arc::clone(locks.entry(group_id.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::{FsMessageLog, StorageLayout};
    use crate::adapters::transport::mapper::message_to_record;
    use crate::adapters::transport::payload::RawMessage;
    use crate::domain::{DomainError, MessageKind};
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn record(id: &str) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            group_id: "g1".to_string(),
            participant: Some("p".to_string()),
            timestamp: Utc::now().timestamp_millis(),
            kind: MessageKind::Text,
            content: id.to_string(),
            quoted: false,
            mentions: vec![],
            from_me: false,
        }
    }

    /// Delegates to the file log after a pause, widening the read-modify-write window.
    struct SlowLog {
        inner: FsMessageLog,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl MessageLogRepo for SlowLog {
        async fn append_day(
            &self,
            group_id: &str,
            date_key: &str,
            records: &[MessageRecord],
        ) -> Result<usize, DomainError> {
            tokio::time::sleep(self.delay).await;
            self.inner.append_day(group_id, date_key, records).await
        }
        async fn read_day(&self, g: &str, d: &str) -> Result<Vec<MessageRecord>, DomainError> {
            self.inner.read_day(g, d).await
        }
        async fn count_records(&self, g: &str) -> Result<usize, DomainError> {
            self.inner.count_records(g).await
        }
        async fn day_files(&self, d: &str) -> Result<Vec<PathBuf>, DomainError> {
            self.inner.day_files(d).await
        }
        async fn purge_modified_before(&self, c: SystemTime) -> Result<usize, DomainError> {
            self.inner.purge_modified_before(c).await
        }
    }

    struct BrokenLog;

    #[async_trait::async_trait]
    impl MessageLogRepo for BrokenLog {
        async fn append_day(
            &self,
            _: &str,
            _: &str,
            _: &[MessageRecord],
        ) -> Result<usize, DomainError> {
            Err(DomainError::Storage("disk full".into()))
        }
        async fn read_day(&self, _: &str, _: &str) -> Result<Vec<MessageRecord>, DomainError> {
            Ok(vec![])
        }
        async fn count_records(&self, _: &str) -> Result<usize, DomainError> {
            Ok(0)
        }
        async fn day_files(&self, _: &str) -> Result<Vec<PathBuf>, DomainError> {
            Ok(vec![])
        }
        async fn purge_modified_before(&self, _: SystemTime) -> Result<usize, DomainError> {
            Ok(0)
        }
    }

    async fn file_buffer(threshold: usize) -> (tempfile::TempDir, StorageLayout, MessageBuffer) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure().await.unwrap();
        let buffer = MessageBuffer::new(Arc::new(FsMessageLog::new(layout.clone())), threshold);
        (dir, layout, buffer)
    }

    fn today_file(layout: &StorageLayout, group_id: &str) -> PathBuf {
        layout.day_file_path(group_id, &date_key(Utc::now()))
    }

    fn read_ids(layout: &StorageLayout, group_id: &str) -> Vec<String> {
        let content = std::fs::read_to_string(today_file(layout, group_id)).unwrap();
        let records: Vec<MessageRecord> = serde_json::from_str(&content).unwrap();
        records.into_iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn test_append_below_threshold_only_buffers() {
        let (_dir, layout, buffer) = file_buffer(DEFAULT_FLUSH_THRESHOLD).await;
        for i in 0..49 {
            buffer.append("g1", record(&i.to_string())).await;
        }
        assert_eq!(buffer.buffer_len("g1").await, 49);
        assert_eq!(buffer.total_buffered().await, 49);
        assert!(!today_file(&layout, "g1").exists());
    }

    #[tokio::test]
    async fn test_threshold_triggers_flush() {
        let (_dir, layout, buffer) = file_buffer(DEFAULT_FLUSH_THRESHOLD).await;
        for i in 0..50 {
            buffer.append("g1", record(&i.to_string())).await;
        }
        assert_eq!(buffer.buffer_len("g1").await, 0);
        assert_eq!(read_ids(&layout, "g1").len(), 50);
    }

    #[tokio::test]
    async fn test_second_flush_is_noop() {
        let (_dir, layout, buffer) = file_buffer(10).await;
        buffer.append("g1", record("a")).await;
        assert_eq!(buffer.flush("g1").await, 1);
        let before = std::fs::read_to_string(today_file(&layout, "g1")).unwrap();

        assert_eq!(buffer.flush("g1").await, 0);
        let after = std::fs::read_to_string(today_file(&layout, "g1")).unwrap();
        assert_eq!(before, after);
        assert_eq!(buffer.flush("never-seen").await, 0);
    }

    #[tokio::test]
    async fn test_round_trip_classified_records() {
        let (_dir, layout, buffer) = file_buffer(10).await;
        let payloads = [
            json!({"key": {"id": "t", "remoteJid": "g1", "participant": "u"}, "message": {"conversation": "hello"}}),
            json!({"key": {"id": "i", "remoteJid": "g1", "participant": "u"}, "message": {"imageMessage": {"caption": "sunset"}}}),
            json!({"key": {"id": "s", "remoteJid": "g1", "participant": "u"}, "message": {"stickerMessage": {}}}),
        ];
        for payload in payloads {
            let raw: RawMessage = serde_json::from_value(payload).unwrap();
            let rec = message_to_record(&raw, Utc::now().timestamp_millis()).unwrap();
            buffer.append("g1", rec).await;
        }
        buffer.flush("g1").await;

        let content = std::fs::read_to_string(today_file(&layout, "g1")).unwrap();
        let records: Vec<MessageRecord> = serde_json::from_str(&content).unwrap();
        let summary: Vec<(&str, MessageKind, &str)> = records
            .iter()
            .map(|r| (r.id.as_str(), r.kind, r.content.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("t", MessageKind::Text, "hello"),
                ("i", MessageKind::Image, "sunset"),
                ("s", MessageKind::Sticker, "[Sticker]"),
            ]
        );
    }

    #[tokio::test]
    async fn test_flushed_groups_leave_no_map_entries() {
        let (_dir, _layout, buffer) = file_buffer(10).await;
        for g in ["g1", "g2", "g3"] {
            buffer.append(g, record("a")).await;
        }
        buffer.flush_all().await;
        buffer.flush("never-seen").await;

        assert!(buffer.buffers.lock().await.is_empty());
        assert!(buffer.flush_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_map_entry() {
        let buffer = MessageBuffer::new(Arc::new(BrokenLog), 10);
        buffer.append("g1", record("a")).await;
        buffer.flush("g1").await;
        assert_eq!(buffer.buffers.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_flush_all_drains_every_group() {
        let (_dir, layout, buffer) = file_buffer(10).await;
        buffer.append("g1", record("a")).await;
        buffer.append("g2", record("b")).await;
        buffer.append("g2", record("c")).await;

        assert_eq!(buffer.flush_all().await, 3);
        assert_eq!(buffer.total_buffered().await, 0);
        assert_eq!(read_ids(&layout, "g1"), vec!["a"]);
        assert_eq!(read_ids(&layout, "g2"), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_records_in_order() {
        let buffer = MessageBuffer::new(Arc::new(BrokenLog), 10);
        buffer.append("g1", record("a")).await;
        buffer.append("g1", record("b")).await;

        assert_eq!(buffer.flush("g1").await, 0);
        assert_eq!(buffer.buffer_len("g1").await, 2);
        buffer.append("g1", record("c")).await;
        let ids: Vec<String> = buffer
            .buffers
            .lock()
            .await
            .get("g1")
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    async fn slow_buffer() -> (tempfile::TempDir, StorageLayout, Arc<MessageBuffer>) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure().await.unwrap();
        let log = SlowLog {
            inner: FsMessageLog::new(layout.clone()),
            delay: Duration::from_millis(20),
        };
        (dir, layout, Arc::new(MessageBuffer::new(Arc::new(log), 100)))
    }

    #[tokio::test]
    async fn test_append_during_flush_is_written_once() {
        // [append A][flush ... (append B while suspended)][flush]
        let (_dir, layout, buffer) = slow_buffer().await;
        buffer.append("g1", record("A")).await;

        let flusher = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move { buffer.flush("g1").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        buffer.append("g1", record("B")).await;
        flusher.await.unwrap();
        buffer.flush("g1").await;

        assert_eq!(read_ids(&layout, "g1"), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_racing_flushes_do_not_drop_records() {
        // [append A][append B][flush] racing with a timer-driven flush_all.
        let (_dir, layout, buffer) = slow_buffer().await;
        buffer.append("g1", record("A")).await;
        let first = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move { buffer.flush("g1").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        buffer.append("g1", record("B")).await;
        let second = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move { buffer.flush_all().await })
        };
        let written = first.await.unwrap() + second.await.unwrap();

        assert_eq!(written, 2);
        let mut ids = read_ids(&layout, "g1");
        ids.sort();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(buffer.buffer_len("g1").await, 0);
    }
}
