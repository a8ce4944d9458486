//! Recurring maintenance task: autosave, hourly backup, retention purge.
//!
//! Runs as one tokio task. Backups follow an explicit top-of-the-hour schedule rather than
//! polling the wall-clock minute. A slow tick delays that tick only; the task never
//! cancels in-flight I/O.

use crate::usecases::group_manager::GroupManager;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct MaintenanceSchedule {
    pub autosave_every: Duration,
    pub purge_every: Duration,
    pub hourly_backup: bool,
}

impl Default for MaintenanceSchedule {
    fn default() -> Self {
        Self {
            autosave_every: Duration::from_secs(5 * 60),
            purge_every: Duration::from_secs(24 * 60 * 60),
            hourly_backup: true,
        }
    }
}

/// Time from `now` until the next full hour (UTC). Never zero.
pub fn until_next_hour(now: DateTime<Utc>) -> Duration {
    let hour = TimeDelta::hours(1);
    let next = now
        .duration_trunc(hour)
        .map(|start| start + hour)
        .unwrap_or(now + hour);
    (next - now).to_std().unwrap_or(Duration::from_secs(3600))
}

/// Cancel handle for a running scheduler. Dropping it also stops the task.
pub struct MaintenanceHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Stop the loop and wait for the current tick to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            warn!(error = %e, "maintenance task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

pub struct MaintenanceScheduler;

impl MaintenanceScheduler {
    pub fn spawn(manager: Arc<GroupManager>, schedule: MaintenanceSchedule) -> MaintenanceHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            let start = Instant::now();
            let mut autosave = interval_at(start + schedule.autosave_every, schedule.autosave_every);
            autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut purge = interval_at(start + schedule.purge_every, schedule.purge_every);
            purge.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut next_backup = start + until_next_hour(Utc::now());

            info!(
                autosave_secs = schedule.autosave_every.as_secs(),
                purge_secs = schedule.purge_every.as_secs(),
                hourly_backup = schedule.hourly_backup,
                "maintenance scheduler started"
            );

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = autosave.tick() => {
                        debug!("autosave tick");
                        manager.autosave_tick().await;
                    }
                    _ = purge.tick() => {
                        manager.purge_old().await;
                    }
                    _ = sleep_until(next_backup), if schedule.hourly_backup => {
                        manager.hourly_backup().await;
                        next_backup = Instant::now() + until_next_hour(Utc::now());
                    }
                }
            }
            info!("maintenance scheduler stopped");
        });
        MaintenanceHandle { shutdown_tx, join }
    }
}
