//! Wire schema for the bidirectional chat connection (spec.md §6).

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Text = 1,
    File = 2,
    Av = 3,
}

impl<'de> Deserialize<'de> for FrameType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            1 => Ok(FrameType::Text),
            2 => Ok(FrameType::File),
            3 => Ok(FrameType::Av),
            other => Err(serde::de::Error::custom(format!(
                "unknown frame type {other}"
            ))),
        }
    }
}

/// An inbound frame off the client connection, before persistence.
#[derive(Debug, Clone, Deserialize)]
pub struct IngressFrame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(rename = "sendId")]
    pub send_id: String,
    #[serde(rename = "sendName", default)]
    pub send_name: String,
    #[serde(rename = "sendAvatar", default)]
    pub send_avatar: String,
    #[serde(rename = "receiveId")]
    pub receive_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "fileSize", default)]
    pub file_size: Option<i64>,
    #[serde(rename = "fileType", default)]
    pub file_type: Option<String>,
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub avdata: Option<String>,
}

/// The `avdata` inner payload for AV signalling frames (spec.md §4.F step 4).
#[derive(Debug, Clone, Deserialize)]
pub struct AvData {
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "type")]
    pub av_type: String,
}

/// AV sub-types that are durably persisted (spec.md §4.F step 4).
pub const DURABLE_AV_TYPES: &[&str] = &["start_call", "receive_call", "reject_call"];

/// The sentinel `messageId` marking an AV signal as one the pipeline should
/// persist rather than treat as transient (spec.md §4.F step 4).
pub const DURABLE_AV_MESSAGE_ID: &str = "PROXY";

/// An outbound envelope delivered to a connected session (spec.md §6).
#[derive(Debug, Clone, Default, Serialize)]
pub struct EgressEnvelope {
    #[serde(rename = "type")]
    pub frame_type: u8,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "sendId")]
    pub send_id: String,
    #[serde(rename = "sendName")]
    pub send_name: String,
    #[serde(rename = "sendAvatar")]
    pub send_avatar: String,
    #[serde(rename = "receiveId")]
    pub receive_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "fileSize", skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(rename = "fileType", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avdata: Option<String>,
    /// Carried so the write loop can mark the originating row SENT without
    /// a second lookup.
    #[serde(skip)]
    pub message_id: Option<String>,
}

/// Host-independent normalization of a sender avatar URL (spec.md §4.F step
/// 3). Strips everything up to and including the first `/static/`, except
/// for the vendor default-avatar URL which passes through unchanged.
pub fn normalize_avatar(raw: &str) -> String {
    const VENDOR_DEFAULT_AVATAR: &str =
        "https://cdn.example-vendor.com/assets/default-avatar.png";
    if raw == VENDOR_DEFAULT_AVATAR {
        return raw.to_string();
    }
    match raw.find("/static/") {
        Some(idx) => raw[idx..].to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_host_prefix() {
        assert_eq!(
            normalize_avatar("https://cdn.internal/static/avatars/u1.png"),
            "/static/avatars/u1.png"
        );
    }

    #[test]
    fn normalize_passes_through_vendor_default() {
        let vendor = "https://cdn.example-vendor.com/assets/default-avatar.png";
        assert_eq!(normalize_avatar(vendor), vendor);
    }

    #[test]
    fn normalize_passes_through_unrecognized_url() {
        assert_eq!(normalize_avatar("/already/relative.png"), "/already/relative.png");
    }

    #[test]
    fn ingress_frame_deserializes_text() {
        let raw = r#"{"type":1,"sendId":"Uaaa","receiveId":"Ubbb","content":"hi"}"#;
        let frame: IngressFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.frame_type, FrameType::Text);
        assert_eq!(frame.content.as_deref(), Some("hi"));
    }

    #[test]
    fn egress_envelope_omits_absent_optional_fields() {
        let envelope = EgressEnvelope {
            frame_type: 1,
            send_id: "Uaaa".into(),
            send_name: "alice".into(),
            send_avatar: String::new(),
            receive_id: "Ubbb".into(),
            content: Some("hi".into()),
            created_at: "2026-07-31 00:00:00".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("\"url\""));
        assert!(!json.contains("\"avdata\""));
    }
}
