//! Flat-file persistence. No database: JSON documents under one base directory.

pub mod backup_dir;
pub mod layout;
pub mod message_log;
pub mod snapshot_json;

pub use backup_dir::FsBackupRepo;
pub use layout::{StorageLayout, date_key, sanitize_key};
pub use message_log::FsMessageLog;
pub use snapshot_json::FsSnapshotRepo;
