//! In-memory GroupGateway for tests and offline maintenance runs.
//!
//! Holds group metadata keyed by group id and records outbound calls instead of
//! talking to a live transport.

use crate::adapters::transport::mapper::metadata_to_domain;
use crate::adapters::transport::payload::RawGroupMetadata;
use crate::domain::{DomainError, GroupMetadata};
use crate::ports::GroupGateway;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

#[derive(Default)]
pub struct MockGateway {
    groups: RwLock<HashMap<String, GroupMetadata>>,
    sent: Mutex<Vec<(String, String)>>,
    removed: Mutex<Vec<(String, String)>>,
    own_id: Option<String>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group_id: &str, metadata: GroupMetadata) -> Self {
        self.groups
            .get_mut()
            .insert(group_id.to_string(), metadata);
        self
    }

    /// Act as the participant `id`; admin checks on the bot itself use it.
    pub fn with_own_id(mut self, id: &str) -> Self {
        self.own_id = Some(id.to_string());
        self
    }

    /// Seed from a JSON array of raw group metadata objects (each with an `id`).
    pub async fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Config(format!("read {}: {}", path.display(), e)))?;
        let raw: Vec<RawGroupMetadata> = serde_json::from_str(&content)
            .map_err(|e| DomainError::Config(format!("parse {}: {}", path.display(), e)))?;
        let mut gateway = Self::new();
        for group in raw {
            let id = group.id.clone();
            gateway = gateway.with_group(&id, metadata_to_domain(group));
        }
        info!(
            path = %path.display(),
            groups = gateway.groups.get_mut().len(),
            "loaded gateway fixtures"
        );
        Ok(gateway)
    }

    /// Replace (or add) a group's live metadata.
    pub async fn set_group(&self, group_id: &str, metadata: GroupMetadata) {
        self.groups
            .write()
            .await
            .insert(group_id.to_string(), metadata);
    }

    /// Make the group unknown to the transport; subsequent fetches fail.
    pub async fn drop_group(&self, group_id: &str) {
        self.groups.write().await.remove(group_id);
    }

    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn removed_participants(&self) -> Vec<(String, String)> {
        self.removed.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl GroupGateway for MockGateway {
    async fn fetch_group_metadata(&self, group_id: &str) -> Result<GroupMetadata, DomainError> {
        self.groups
            .read()
            .await
            .get(group_id)
            .cloned()
            .ok_or_else(|| DomainError::Transport(format!("group {} unknown", group_id)))
    }

    fn own_id(&self) -> Option<String> {
        self.own_id.clone()
    }

    async fn send_message(&self, group_id: &str, text: &str) -> Result<(), DomainError> {
        self.sent
            .lock()
            .await
            .push((group_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn remove_participant(
        &self,
        group_id: &str,
        participant_id: &str,
    ) -> Result<(), DomainError> {
        let mut groups = self.groups.write().await;
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| DomainError::Transport(format!("group {} unknown", group_id)))?;
        let before = group.participants.len();
        group.participants.retain(|p| p.id != participant_id);
        if group.participants.len() == before {
            return Err(DomainError::Transport(format!(
                "{} is not a participant of {}",
                participant_id, group_id
            )));
        }
        self.removed
            .lock()
            .await
            .push((group_id.to_string(), participant_id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdminRole, Participant};

    fn metadata() -> GroupMetadata {
        GroupMetadata {
            subject: "Test".to_string(),
            participants: vec![Participant {
                id: "a".to_string(),
                admin: AdminRole::Admin,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_known_and_unknown() {
        let gw = MockGateway::new().with_group("g1", metadata());
        assert_eq!(gw.fetch_group_metadata("g1").await.unwrap().subject, "Test");
        assert!(matches!(
            gw.fetch_group_metadata("g2").await,
            Err(DomainError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_participant_updates_metadata() {
        let gw = MockGateway::new().with_group("g1", metadata());
        gw.remove_participant("g1", "a").await.unwrap();
        assert!(gw.fetch_group_metadata("g1").await.unwrap().participants.is_empty());
        assert!(gw.remove_participant("g1", "a").await.is_err());
        assert_eq!(gw.removed_participants().await.len(), 1);
    }

    #[tokio::test]
    async fn test_from_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.json");
        std::fs::write(
            &path,
            r#"[{"id": "g1", "subject": "One", "participants": [{"id": "a", "admin": "superadmin"}]}]"#,
        )
        .unwrap();
        let gw = MockGateway::from_fixture_file(&path).await.unwrap();
        let meta = gw.fetch_group_metadata("g1").await.unwrap();
        assert_eq!(meta.subject, "One");
        assert_eq!(meta.participants[0].admin, AdminRole::Superadmin);
    }
}
