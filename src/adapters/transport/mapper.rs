//! Map raw transport payloads to domain entities.
//!
//! This is the only place that looks at the loosely-typed wire shapes.

use crate::adapters::transport::payload::{RawContent, RawGroupMetadata, RawMessage};
use crate::domain::{AdminRole, GroupMetadata, MessageKind, MessageRecord, Participant};

/// Group chats carry this suffix in their remote id.
const GROUP_SUFFIX: &str = "@g.us";

pub fn is_group_id(remote_id: &str) -> bool {
    remote_id.ends_with(GROUP_SUFFIX)
}

/// `"admin"` / `"superadmin"` / anything else.
pub fn admin_role(raw: Option<&str>) -> AdminRole {
    match raw {
        Some("superadmin") => AdminRole::Superadmin,
        Some("admin") => AdminRole::Admin,
        _ => AdminRole::None,
    }
}

pub fn metadata_to_domain(raw: RawGroupMetadata) -> GroupMetadata {
    GroupMetadata {
        subject: raw.subject,
        description: raw.desc,
        owner: raw.owner,
        creation: raw.creation,
        size: raw.size,
        participants: raw
            .participants
            .into_iter()
            .map(|p| Participant {
                admin: admin_role(p.admin.as_deref()),
                id: p.id,
            })
            .collect(),
        announce: raw.announce.unwrap_or(false),
        restrict: raw.restrict.unwrap_or(false),
        ephemeral_duration: raw.ephemeral_duration,
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|t| !t.is_empty())
}

/// Kind and display content, checked in fixed priority order:
/// text, captioned media, uncaptioned media, location, contact, unknown.
pub fn classify(content: &RawContent) -> (MessageKind, String) {
    if let Some(text) = non_empty(&content.conversation) {
        return (MessageKind::Text, text.to_string());
    }
    if let Some(ext) = &content.extended_text_message {
        let text = non_empty(&ext.text).unwrap_or(MessageKind::Unknown.placeholder());
        return (MessageKind::Text, text.to_string());
    }

    let captioned = [
        (MessageKind::Image, &content.image_message),
        (MessageKind::Video, &content.video_message),
        (MessageKind::Document, &content.document_message),
    ];
    for (kind, media) in captioned {
        if let Some(caption) = media.as_ref().and_then(|m| non_empty(&m.caption)) {
            return (kind, caption.to_string());
        }
    }

    let kind = if content.sticker_message.is_some() {
        MessageKind::Sticker
    } else if content.image_message.is_some() {
        MessageKind::Image
    } else if content.video_message.is_some() {
        MessageKind::Video
    } else if content.audio_message.is_some() {
        MessageKind::Audio
    } else if content.document_message.is_some() {
        MessageKind::Document
    } else if content.location_message.is_some() {
        MessageKind::Location
    } else if content.contact_message.is_some() {
        MessageKind::Contact
    } else {
        MessageKind::Unknown
    };
    (kind, kind.placeholder().to_string())
}

/// Map an inbound message to a record. `None` when the payload has no message body
/// (receipts, protocol stubs).
pub fn message_to_record(raw: &RawMessage, received_at_ms: i64) -> Option<MessageRecord> {
    let content = raw.message.as_ref()?;
    let (kind, text) = classify(content);
    let context = content
        .extended_text_message
        .as_ref()
        .and_then(|e| e.context_info.as_ref());

    Some(MessageRecord {
        id: raw.key.id.clone(),
        group_id: raw.key.remote_jid.clone(),
        participant: raw.key.participant.clone(),
        timestamp: received_at_ms,
        kind,
        content: text,
        quoted: context.is_some_and(|c| c.quoted_message.is_some()),
        mentions: context.map(|c| c.mentioned_jid.clone()).unwrap_or_default(),
        from_me: raw.key.from_me,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawMessage {
        serde_json::from_value(value).unwrap()
    }

    fn classify_json(message: serde_json::Value) -> (MessageKind, String) {
        let content: RawContent = serde_json::from_value(message).unwrap();
        classify(&content)
    }

    #[test]
    fn test_classify_text_variants() {
        assert_eq!(
            classify_json(json!({"conversation": "hi"})),
            (MessageKind::Text, "hi".to_string())
        );
        assert_eq!(
            classify_json(json!({"extendedTextMessage": {"text": "reply"}})),
            (MessageKind::Text, "reply".to_string())
        );
    }

    #[test]
    fn test_classify_captioned_media_uses_caption() {
        assert_eq!(
            classify_json(json!({"imageMessage": {"caption": "look"}})),
            (MessageKind::Image, "look".to_string())
        );
        assert_eq!(
            classify_json(json!({"videoMessage": {"caption": "clip"}})),
            (MessageKind::Video, "clip".to_string())
        );
        assert_eq!(
            classify_json(json!({"documentMessage": {"caption": "doc"}})),
            (MessageKind::Document, "doc".to_string())
        );
    }

    #[test]
    fn test_classify_placeholders() {
        let cases = [
            (json!({"stickerMessage": {}}), MessageKind::Sticker, "[Sticker]"),
            (json!({"imageMessage": {}}), MessageKind::Image, "[Image]"),
            (json!({"videoMessage": {"caption": ""}}), MessageKind::Video, "[Video]"),
            (json!({"audioMessage": {}}), MessageKind::Audio, "[Audio]"),
            (json!({"documentMessage": {}}), MessageKind::Document, "[Document]"),
            (json!({"locationMessage": {"degreesLatitude": 1.0}}), MessageKind::Location, "[Location]"),
            (json!({"contactMessage": {}}), MessageKind::Contact, "[Contact]"),
            (json!({"pollCreationMessage": {}}), MessageKind::Unknown, "[Unsupported message]"),
        ];
        for (message, kind, label) in cases {
            assert_eq!(classify_json(message), (kind, label.to_string()));
        }
    }

    #[test]
    fn test_message_to_record_extracts_context() {
        let msg = raw(json!({
            "key": {"id": "M1", "remoteJid": "123@g.us", "participant": "u1@s.whatsapp.net", "fromMe": false},
            "message": {"extendedTextMessage": {
                "text": "hey @u2",
                "contextInfo": {"quotedMessage": {"conversation": "x"}, "mentionedJid": ["u2@s.whatsapp.net"]}
            }}
        }));
        let rec = message_to_record(&msg, 42).unwrap();
        assert_eq!(rec.id, "M1");
        assert_eq!(rec.group_id, "123@g.us");
        assert_eq!(rec.participant.as_deref(), Some("u1@s.whatsapp.net"));
        assert_eq!(rec.timestamp, 42);
        assert!(rec.quoted);
        assert_eq!(rec.mentions, vec!["u2@s.whatsapp.net".to_string()]);
        assert!(!rec.from_me);
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let msg: RawMessage = serde_json::from_str(
            r#"{"key":{"id":"M3","remoteJid":"123@g.us","participant":null,"fromMe":null},
                "message":{"extendedTextMessage":{"text":"hi","contextInfo":{"quotedMessage":null,"mentionedJid":null}}}}"#,
        )
        .unwrap();
        let rec = message_to_record(&msg, 7).unwrap();
        assert!(!rec.from_me);
        assert!(!rec.quoted);
        assert!(rec.mentions.is_empty());
        assert_eq!(rec.participant, None);
        assert_eq!(rec.content, "hi");

        let meta: RawGroupMetadata = serde_json::from_str(
            r#"{"id":null,"subject":null,"participants":null,"announce":null}"#,
        )
        .unwrap();
        let domain = metadata_to_domain(meta);
        assert_eq!(domain.subject, "");
        assert!(domain.participants.is_empty());
        assert!(!domain.announce);
    }

    #[test]
    fn test_message_without_body_is_skipped() {
        let msg = raw(json!({"key": {"id": "M2", "remoteJid": "123@g.us"}}));
        assert!(message_to_record(&msg, 0).is_none());
    }

    #[test]
    fn test_metadata_to_domain_maps_roles() {
        let meta: RawGroupMetadata = serde_json::from_value(json!({
            "id": "g1",
            "subject": "Test",
            "participants": [
                {"id": "a", "admin": "superadmin"},
                {"id": "b", "admin": null},
                {"id": "c", "admin": "admin"}
            ],
            "announce": true
        }))
        .unwrap();
        let domain = metadata_to_domain(meta);
        assert_eq!(domain.subject, "Test");
        assert!(domain.announce);
        assert!(!domain.restrict);
        let roles: Vec<AdminRole> = domain.participants.iter().map(|p| p.admin).collect();
        assert_eq!(roles, vec![AdminRole::Superadmin, AdminRole::None, AdminRole::Admin]);
    }

    #[test]
    fn test_is_group_id() {
        assert!(is_group_id("120363@g.us"));
        assert!(!is_group_id("5511999@s.whatsapp.net"));
    }
}
