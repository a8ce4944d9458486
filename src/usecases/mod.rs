//! Application use cases. Orchestrate domain logic via ports.

pub mod commands;
pub mod group_manager;
pub mod maintenance;
pub mod message_buffer;
pub mod retention_service;
pub mod snapshot_cache;
pub mod stats_service;

pub use commands::CommandService;
pub use group_manager::{GroupManager, ParticipantsAction};
pub use maintenance::{MaintenanceHandle, MaintenanceSchedule, MaintenanceScheduler};
pub use message_buffer::MessageBuffer;
pub use retention_service::RetentionService;
pub use snapshot_cache::SnapshotCache;
pub use stats_service::StatsService;
