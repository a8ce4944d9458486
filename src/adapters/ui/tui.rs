//! Implements InputPort. Inquire-based maintenance console.

use crate::adapters::transport::intake::{MessageIntake, load_messages};
use crate::domain::DomainError;
use crate::ports::InputPort;
use crate::usecases::commands::render_group_stats;
use crate::usecases::{GroupManager, MaintenanceSchedule, MaintenanceScheduler};
use async_trait::async_trait;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{InquireError, Select, Text};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Prompt colors shared by every inquire widget.
pub fn apply_theme() {
    let config = RenderConfig::default_colored()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightCyan))
        .with_highlighted_option_prefix(Styled::new("▸").with_fg(Color::LightYellow));
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    GeneralStats,
    GroupStats,
    FlushBuffers,
    BackupNow,
    PurgeOld,
    ReplayInbound,
    RunDaemon,
    Exit,
}

impl MenuItem {
    const ALL: [MenuItem; 8] = [
        MenuItem::GeneralStats,
        MenuItem::GroupStats,
        MenuItem::FlushBuffers,
        MenuItem::BackupNow,
        MenuItem::PurgeOld,
        MenuItem::ReplayInbound,
        MenuItem::RunDaemon,
        MenuItem::Exit,
    ];
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuItem::GeneralStats => "General stats",
            MenuItem::GroupStats => "Group stats",
            MenuItem::FlushBuffers => "Flush buffers",
            MenuItem::BackupNow => "Backup now",
            MenuItem::PurgeOld => "Purge old message logs",
            MenuItem::ReplayInbound => "Replay inbound messages from file",
            MenuItem::RunDaemon => "Run maintenance daemon (Ctrl-C to stop)",
            MenuItem::Exit => "Exit",
        };
        f.write_str(label)
    }
}

fn ui_err(e: InquireError) -> DomainError {
    DomainError::Ui(e.to_string())
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    manager: Arc<GroupManager>,
    intake: Arc<MessageIntake>,
    schedule: MaintenanceSchedule,
}

impl TuiInputPort {
    pub fn new(
        manager: Arc<GroupManager>,
        intake: Arc<MessageIntake>,
        schedule: MaintenanceSchedule,
    ) -> Self {
        Self {
            manager,
            intake,
            schedule,
        }
    }

    async fn general_stats(&self) {
        let stats = self.manager.general_stats().await;
        println!("Stored groups:     {}", stats.total_groups);
        println!("Total members:     {}", stats.total_members);
        println!("Stored messages:   {}", stats.total_messages);
        println!("Cached snapshots:  {}", stats.cache_size);
        println!("Buffered messages: {}", stats.buffer_size);
    }

    async fn group_stats(&self) -> Result<(), DomainError> {
        let group_id = Text::new("Group id:").prompt().map_err(ui_err)?;
        let group_id = group_id.trim();
        match self.manager.snapshot(group_id).await {
            Some(snapshot) => println!("{}", render_group_stats(&snapshot)),
            None => println!("No snapshot stored for {}", group_id),
        }
        println!("Buffered: {}", self.manager.buffer_len(group_id).await);
        Ok(())
    }

    async fn replay_inbound(&self) -> Result<(), DomainError> {
        let path = Text::new("Path to JSON message log:")
            .prompt()
            .map_err(ui_err)?;
        let messages = load_messages(path.trim()).await?;
        let summary = self.intake.deliver_all(&messages).await;
        println!(
            "Stored {}, skipped {}, commands {}",
            summary.stored, summary.skipped, summary.commands
        );
        Ok(())
    }

    async fn run_daemon(&self) -> Result<(), DomainError> {
        let handle = MaintenanceScheduler::spawn(Arc::clone(&self.manager), self.schedule);
        println!("Maintenance daemon running. Press Ctrl-C to stop.");
        let signal = tokio::signal::ctrl_c().await;
        handle.shutdown().await;
        self.manager.shutdown().await;
        signal.map_err(|e| DomainError::Ui(format!("signal handler: {}", e)))
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let choice = match Select::new("What now?", MenuItem::ALL.to_vec()).prompt() {
                Ok(choice) => choice,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    MenuItem::Exit
                }
                Err(e) => return Err(ui_err(e)),
            };

            let result = match choice {
                MenuItem::GeneralStats => {
                    self.general_stats().await;
                    Ok(())
                }
                MenuItem::GroupStats => self.group_stats().await,
                MenuItem::FlushBuffers => {
                    let written = self.manager.flush_all().await;
                    println!("Flushed {} messages", written);
                    Ok(())
                }
                MenuItem::BackupNow => {
                    match self.manager.backup_now().await {
                        Some(set) => println!(
                            "Backup at {} ({} copied, {} failed)",
                            set.path.display(),
                            set.copied,
                            set.failed
                        ),
                        None => println!("Backup failed, see log"),
                    }
                    Ok(())
                }
                MenuItem::PurgeOld => {
                    let deleted = self.manager.purge_old().await;
                    println!("Deleted {} message logs", deleted);
                    Ok(())
                }
                MenuItem::ReplayInbound => self.replay_inbound().await,
                MenuItem::RunDaemon => self.run_daemon().await,
                MenuItem::Exit => {
                    info!("console exit");
                    return Ok(());
                }
            };
            if let Err(e) = result {
                warn!(error = %e, action = %choice, "console action failed");
                println!("{}", e);
            }
        }
    }
}
