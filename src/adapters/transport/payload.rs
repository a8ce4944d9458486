//! Raw transport payloads. Every nested field is optional on the wire, so all of them
//! are `Option` here; `mapper` turns these into domain entities.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `null` and a missing field both read as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGroupMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    pub desc: Option<String>,
    pub owner: Option<String>,
    pub creation: Option<i64>,
    pub size: Option<usize>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub participants: Vec<RawParticipant>,
    pub announce: Option<bool>,
    pub restrict: Option<bool>,
    pub ephemeral_duration: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawParticipant {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// `null`, `"admin"` or `"superadmin"`.
    pub admin: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessageKey {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remote_jid: String,
    pub participant: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub from_me: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: RawMessageKey,
    pub message: Option<RawContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContent {
    pub conversation: Option<String>,
    pub extended_text_message: Option<RawExtendedText>,
    pub image_message: Option<RawMedia>,
    pub video_message: Option<RawMedia>,
    pub audio_message: Option<RawMedia>,
    pub document_message: Option<RawMedia>,
    pub sticker_message: Option<Value>,
    pub location_message: Option<Value>,
    pub contact_message: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExtendedText {
    pub text: Option<String>,
    pub context_info: Option<RawContextInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContextInfo {
    pub quoted_message: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mentioned_jid: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMedia {
    pub caption: Option<String>,
}
