//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run the console.
//! No business logic here.

use dotenv::dotenv;
use groupkeeper::adapters::persistence::{
    FsBackupRepo, FsMessageLog, FsSnapshotRepo, StorageLayout,
};
use groupkeeper::adapters::transport::{MessageIntake, MockGateway};
use groupkeeper::adapters::ui::tui::TuiInputPort;
use groupkeeper::ports::{BackupRepo, GroupGateway, InputPort, MessageLogRepo, SnapshotRepo};
use groupkeeper::shared::config::AppConfig;
use groupkeeper::usecases::{
    CommandService, GroupManager, MaintenanceSchedule, MessageBuffer, RetentionService,
    SnapshotCache, StatsService,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config not loaded, using defaults");
        AppConfig::default()
    });

    let data_dir = cfg.data_dir_or_default();
    groupkeeper::adapters::ui::init_ui(&data_dir);

    // --- Storage layout: groups/, messages/, backups/ under the data directory ---
    let layout = StorageLayout::new(&data_dir);
    layout
        .ensure()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let data_dir_abs = layout
        .base()
        .canonicalize()
        .unwrap_or_else(|_| layout.base().to_path_buf());
    info!(path = %data_dir_abs.display(), "data directory ready");

    // --- Transport: the live client lives outside this binary ---
    let gateway: Arc<dyn GroupGateway> = match cfg.gateway_fixtures.as_deref() {
        Some(path) => Arc::new(
            MockGateway::from_fixture_file(path)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?,
        ),
        None => {
            warn!("GROUPKEEPER_GATEWAY_FIXTURES not set, using empty offline gateway");
            Arc::new(MockGateway::new())
        }
    };

    // --- Repositories ---
    let snapshot_repo: Arc<dyn SnapshotRepo> = Arc::new(FsSnapshotRepo::new(layout.clone()));
    let message_log: Arc<dyn MessageLogRepo> = Arc::new(FsMessageLog::new(layout.clone()));
    let backup_repo: Arc<dyn BackupRepo> = Arc::new(FsBackupRepo::new(layout.clone()));

    // --- Services ---
    let stats = Arc::new(StatsService::new(
        Arc::clone(&snapshot_repo),
        Arc::clone(&message_log),
    ));
    let cache = Arc::new(SnapshotCache::new(
        Arc::clone(&gateway),
        Arc::clone(&snapshot_repo),
        Arc::clone(&stats),
    ));
    let flush_threshold = cfg.flush_threshold_or_default();
    let buffer = Arc::new(MessageBuffer::new(Arc::clone(&message_log), flush_threshold));
    let retention_days = cfg.retention_days_or_default();
    let retention = Arc::new(RetentionService::new(
        snapshot_repo,
        message_log,
        backup_repo,
        retention_days,
    ));
    let manager = Arc::new(GroupManager::new(cache, buffer, retention, stats));

    let prefix = cfg.command_prefix_or_default();
    let commands = Arc::new(CommandService::new(
        Arc::clone(&manager),
        Arc::clone(&gateway),
        &prefix,
    ));
    let intake = Arc::new(MessageIntake::new(Arc::clone(&manager), commands));

    let schedule = MaintenanceSchedule {
        autosave_every: Duration::from_secs(cfg.autosave_interval_secs_or_default()),
        purge_every: Duration::from_secs(cfg.purge_interval_hours_or_default() * 60 * 60),
        hourly_backup: true,
    };
    info!(
        flush_threshold,
        retention_days,
        autosave_secs = schedule.autosave_every.as_secs(),
        prefix = %prefix,
        "group manager ready"
    );

    let input_port: Arc<dyn InputPort> =
        Arc::new(TuiInputPort::new(Arc::clone(&manager), intake, schedule));

    // --- Run (main menu -> stats / flush / backup / purge / daemon) ---
    let result = input_port.run().await;
    manager.shutdown().await;
    result.map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
