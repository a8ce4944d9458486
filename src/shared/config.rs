//! Application configuration. Storage root, buffering and maintenance timings.

use crate::usecases::commands::DEFAULT_PREFIX;
use crate::usecases::message_buffer::DEFAULT_FLUSH_THRESHOLD;
use crate::usecases::retention_service::DEFAULT_RETENTION_DAYS;
use serde::Deserialize;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_PURGE_INTERVAL_HOURS: u64 = 24;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub data_dir: Option<String>,

    /// Buffered messages per group that trigger a flush. Read from GROUPKEEPER_FLUSH_THRESHOLD.
    #[serde(default)]
    pub flush_threshold: Option<usize>,

    /// Seconds between autosaves of all buffers. Read from GROUPKEEPER_AUTOSAVE_INTERVAL_SECS.
    #[serde(default)]
    pub autosave_interval_secs: Option<u64>,

    /// Message logs older than this many days are purged. Read from GROUPKEEPER_RETENTION_DAYS.
    #[serde(default)]
    pub retention_days: Option<u64>,

    #[serde(default)]
    pub purge_interval_hours: Option<u64>,

    #[serde(default)]
    pub command_prefix: Option<String>,

    /// JSON array of group metadata used to seed the offline gateway.
    #[serde(default)]
    pub gateway_fixtures: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("GROUPKEEPER").try_parsing(true));
        if let Ok(path) = std::env::var("GROUPKEEPER_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> String {
        self.data_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
    }

    /// Zero is treated as unset.
    pub fn flush_threshold_or_default(&self) -> usize {
        self.flush_threshold
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_FLUSH_THRESHOLD)
    }

    pub fn autosave_interval_secs_or_default(&self) -> u64 {
        self.autosave_interval_secs
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_AUTOSAVE_INTERVAL_SECS)
    }

    pub fn retention_days_or_default(&self) -> u64 {
        self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    pub fn purge_interval_hours_or_default(&self) -> u64 {
        self.purge_interval_hours
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PURGE_INTERVAL_HOURS)
    }

    pub fn command_prefix_or_default(&self) -> String {
        self.command_prefix
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string())
    }
}
