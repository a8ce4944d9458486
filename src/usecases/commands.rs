//! Text commands answered from the group manager's state.
//!
//! `stats`, `status`, `backup` and `ban`. Replies go out through the gateway; the
//! caller only learns which command ran.

use crate::domain::GroupSnapshot;
use crate::ports::GroupGateway;
use crate::usecases::group_manager::GroupManager;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_PREFIX: &str = ".";

/// Suffix of user participant ids on the transport.
const USER_SUFFIX: &str = "@s.whatsapp.net";

/// Turn a typed ban target into a participant id. Full ids pass through; anything else
/// keeps its digits only (`@55 11-9999` → `55119999@s.whatsapp.net`). `None` when no
/// digits remain.
pub fn normalize_target(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(id) = raw.strip_prefix('@').filter(|id| id.contains('@')) {
        return Some(id.to_string());
    }
    if raw.contains('@') && !raw.starts_with('@') {
        return Some(raw.to_string());
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then(|| format!("{}{}", digits, USER_SUFFIX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Stats,
    Status,
    BackupCreated,
    BackupFailed,
    Banned,
    BanFailed,
    Denied,
    Usage,
}

pub struct CommandService {
    manager: Arc<GroupManager>,
    gateway: Arc<dyn GroupGateway>,
    prefix: String,
}

impl CommandService {
    pub fn new(manager: Arc<GroupManager>, gateway: Arc<dyn GroupGateway>, prefix: &str) -> Self {
        Self {
            manager,
            gateway,
            prefix: prefix.to_string(),
        }
    }

    /// Run the command in `text`, if any. `None` for plain messages and unknown commands.
    pub async fn handle(
        &self,
        group_id: &str,
        sender: &str,
        text: &str,
        mentions: &[String],
    ) -> Option<CommandOutcome> {
        let body = text.trim().strip_prefix(self.prefix.as_str())?;
        let mut parts = body.split_whitespace();
        let command = parts.next()?.to_lowercase();
        let args: Vec<&str> = parts.collect();

        let outcome = match command.as_str() {
            "stats" => self.stats(group_id).await,
            "status" => self.status(group_id).await,
            "backup" => self.backup(group_id, sender).await,
            "ban" => self.ban(group_id, sender, &args, mentions).await,
            _ => return None,
        };
        info!(group_id, command = %command, outcome = ?outcome, "command executed");
        Some(outcome)
    }

    async fn reply(&self, group_id: &str, text: &str) {
        if let Err(e) = self.gateway.send_message(group_id, text).await {
            warn!(group_id, error = %e, "reply not sent");
        }
    }

    async fn is_admin(&self, group_id: &str, sender: &str) -> bool {
        self.manager
            .snapshot(group_id)
            .await
            .is_some_and(|s| s.can_administer(sender))
    }

    async fn stats(&self, group_id: &str) -> CommandOutcome {
        let text = match self.manager.snapshot(group_id).await {
            Some(snapshot) => render_group_stats(&snapshot),
            None => "Group data not available yet. Wait for the next update.".to_string(),
        };
        self.reply(group_id, &text).await;
        CommandOutcome::Stats
    }

    async fn status(&self, group_id: &str) -> CommandOutcome {
        let stats = self.manager.general_stats().await;
        let text = format!(
            "Status\n\
             • Stored groups: {}\n\
             • Total members: {}\n\
             • Stored messages: {}\n\
             • Cached groups: {}\n\
             • Buffered messages: {}",
            stats.total_groups,
            stats.total_members,
            stats.total_messages,
            stats.cache_size,
            stats.buffer_size
        );
        self.reply(group_id, &text).await;
        CommandOutcome::Status
    }

    async fn backup(&self, group_id: &str, sender: &str) -> CommandOutcome {
        if !self.is_admin(group_id, sender).await {
            self.reply(group_id, "Only admins can create backups.").await;
            return CommandOutcome::Denied;
        }
        match self.manager.backup_now().await {
            Some(set) => {
                let name = set
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.reply(
                    group_id,
                    &format!("Backup created: {} ({} files)", name, set.copied),
                )
                .await;
                CommandOutcome::BackupCreated
            }
            None => {
                self.reply(group_id, "Backup failed.").await;
                CommandOutcome::BackupFailed
            }
        }
    }

    async fn ban(
        &self,
        group_id: &str,
        sender: &str,
        args: &[&str],
        mentions: &[String],
    ) -> CommandOutcome {
        if !self.is_admin(group_id, sender).await {
            self.reply(group_id, "Only admins can ban.").await;
            return CommandOutcome::Denied;
        }
        let Some(target) = mentions
            .first()
            .cloned()
            .or_else(|| normalize_target(&args.join(" ")))
        else {
            self.reply(group_id, &format!("Usage: {}ban @user", self.prefix))
                .await;
            return CommandOutcome::Usage;
        };
        if let Some(own) = self.gateway.own_id() {
            if !self.is_admin(group_id, &own).await {
                self.reply(group_id, "I need to be an admin to ban.").await;
                return CommandOutcome::BanFailed;
            }
        }

        match self.gateway.remove_participant(group_id, &target).await {
            Ok(()) => {
                self.manager.refresh(group_id, "member_removed").await;
                self.reply(group_id, "User banned.").await;
                CommandOutcome::Banned
            }
            Err(e) => {
                warn!(group_id, target = %target, error = %e, "ban failed");
                self.reply(group_id, "Could not ban that user.").await;
                CommandOutcome::BanFailed
            }
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub fn render_group_stats(snapshot: &GroupSnapshot) -> String {
    let updated = Utc
        .timestamp_millis_opt(snapshot.last_update)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "Group stats\n\
         • Name: {}\n\
         • Members: {}\n\
         • Admins: {}\n\
         • Messages: {}\n\
         • Active members (24h): {}\n\
         • Last update: {}\n\
         • Admin-only messages: {}\n\
         • Admin-only info edits: {}",
        snapshot.name,
        snapshot.member_count,
        snapshot.admin_count,
        snapshot.stats.total_messages,
        snapshot.stats.active_members,
        updated,
        yes_no(snapshot.settings.announce),
        yes_no(snapshot.settings.restrict),
    )
}
