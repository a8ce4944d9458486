//! Domain entities. Pure data structures for the core business.
//!
//! No transport or IO types here; raw payloads are mapped by adapters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Role of a participant inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    #[default]
    None,
    Admin,
    Superadmin,
}

impl AdminRole {
    pub fn is_admin(self) -> bool {
        self != AdminRole::None
    }
}

/// Live group metadata as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupMetadata {
    pub subject: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub creation: Option<i64>,
    pub size: Option<usize>,
    pub participants: Vec<Participant>,
    pub announce: bool,
    pub restrict: bool,
    pub ephemeral_duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub admin: AdminRole,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSettings {
    /// Only admins may post.
    pub announce: bool,
    /// Only admins may edit group info.
    pub restrict: bool,
    pub ephemeral_duration: Option<u32>,
}

/// Locally derived activity figures stored alongside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub total_messages: usize,
    pub last_activity: i64,
    pub active_members: usize,
}

/// Latest known full state of one group. Rebuilt from scratch on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner: Option<String>,
    pub creation: Option<i64>,
    pub size: Option<usize>,
    pub participants: Vec<Participant>,
    pub admins: Vec<String>,
    pub member_count: usize,
    pub admin_count: usize,
    pub settings: GroupSettings,
    /// Milliseconds since the Unix epoch.
    pub last_update: i64,
    pub event_type: String,
    pub stats: GroupStats,
}

impl GroupSnapshot {
    /// Build a snapshot from fresh metadata. Counts and the admin list are always
    /// recomputed from `participants`.
    pub fn from_metadata(
        group_id: &str,
        metadata: GroupMetadata,
        event_type: &str,
        stats: GroupStats,
        now_ms: i64,
    ) -> Self {
        let admins: Vec<String> = metadata
            .participants
            .iter()
            .filter(|p| p.admin.is_admin())
            .map(|p| p.id.clone())
            .collect();
        Self {
            id: group_id.to_string(),
            name: metadata.subject,
            description: metadata.description.unwrap_or_default(),
            owner: metadata.owner,
            creation: metadata.creation,
            size: metadata.size,
            member_count: metadata.participants.len(),
            admin_count: admins.len(),
            admins,
            participants: metadata.participants,
            settings: GroupSettings {
                announce: metadata.announce,
                restrict: metadata.restrict,
                ephemeral_duration: metadata.ephemeral_duration,
            },
            last_update: now_ms,
            event_type: event_type.to_string(),
            stats,
        }
    }

    /// True when `participant_id` is an admin or the group owner.
    pub fn can_administer(&self, participant_id: &str) -> bool {
        self.owner.as_deref() == Some(participant_id)
            || self.admins.iter().any(|a| a == participant_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    Location,
    Contact,
    Unknown,
}

impl MessageKind {
    /// Label stored as content when the message carries no text of its own.
    pub fn placeholder(self) -> &'static str {
        match self {
            MessageKind::Text | MessageKind::Unknown => "[Unsupported message]",
            MessageKind::Image => "[Image]",
            MessageKind::Video => "[Video]",
            MessageKind::Audio => "[Audio]",
            MessageKind::Document => "[Document]",
            MessageKind::Sticker => "[Sticker]",
            MessageKind::Location => "[Location]",
            MessageKind::Contact => "[Contact]",
        }
    }
}

/// One inbound group message. Never mutated once flushed to a day-file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub group_id: String,
    pub participant: Option<String>,
    /// Receipt time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub kind: MessageKind,
    pub content: String,
    #[serde(default)]
    pub quoted: bool,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub from_me: bool,
}

/// Result of one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSet {
    pub path: PathBuf,
    pub copied: usize,
    pub failed: usize,
}

/// Roll-up across every stored group plus live in-memory sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStats {
    pub total_groups: usize,
    pub total_members: usize,
    pub total_messages: usize,
    pub cache_size: usize,
    pub buffer_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: &str, admin: AdminRole) -> Participant {
        Participant {
            id: id.to_string(),
            admin,
        }
    }

    #[test]
    fn test_snapshot_counts_from_participants() {
        let metadata = GroupMetadata {
            subject: "Test".to_string(),
            participants: vec![
                participant("a", AdminRole::Superadmin),
                participant("b", AdminRole::None),
            ],
            ..Default::default()
        };
        let snap = GroupSnapshot::from_metadata("g1", metadata, "update", GroupStats::default(), 1);

        assert_eq!(snap.member_count, 2);
        assert_eq!(snap.admin_count, 1);
        assert_eq!(snap.admins, vec!["a".to_string()]);
        assert_eq!(snap.description, "");
        assert!(snap.can_administer("a"));
        assert!(!snap.can_administer("b"));
    }

    #[test]
    fn test_snapshot_json_is_camel_case() {
        let snap = GroupSnapshot::from_metadata(
            "g1",
            GroupMetadata::default(),
            "update",
            GroupStats::default(),
            1,
        );
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"memberCount\":0"));
        assert!(json.contains("\"eventType\":\"update\""));
        assert!(json.contains("\"totalMessages\":0"));
    }
}
