//! Live channel frames.
//!
//! Inbound frames are JSON objects discriminated by `type`
//! (`chat_message`, `notification`). The backend also answers a rejected send
//! with a bare `{"error": "..."}` object. Decoding never closes the channel:
//! every failure becomes a [`ChannelEvent::Error`].

use serde::{Deserialize, Serialize};

use crate::message::normalize_body;
use crate::{parse_timestamp, AttachmentRef, FrameError, LiveMessage, MessageId, PeerRef, UserId};

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A chat message for some timeline
    ChatMessage(LiveMessage),
    /// Side-channel notification text
    Notification(String),
    /// Backend-reported error or undecodable frame
    Error(String),
}

impl ChannelEvent {
    /// Decode a text frame, folding decode failures into [`ChannelEvent::Error`].
    pub fn from_frame(text: &str) -> Self {
        Self::decode(text).unwrap_or_else(|e| Self::Error(e.to_string()))
    }

    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let mut raw: RawFrame = serde_json::from_str(text).map_err(FrameError::Malformed)?;

        let kind = raw.kind.take();
        match kind.as_deref() {
            Some("chat_message") => raw.into_live().map(Self::ChatMessage),
            Some("notification") => Ok(Self::Notification(
                raw.message.or(raw.content).unwrap_or_default(),
            )),
            Some(other) => Err(FrameError::UnknownType(other.to_string())),
            None => match raw.error {
                Some(reason) => Ok(Self::Error(reason)),
                None => Err(FrameError::UnknownType("<missing>".into())),
            },
        }
    }
}

/// Wire shape of every inbound frame; fields are validated per `type`.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    id: Option<MessageId>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    receiver: Option<RawPeerRef>,
    #[serde(default)]
    receiver_id: Option<UserId>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// A receiver given either as id or as username.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawPeerRef {
    Id(UserId),
    Name(String),
}

impl RawPeerRef {
    pub(crate) fn into_peer_ref(self) -> PeerRef {
        match self {
            Self::Id(id) => PeerRef::Id(id),
            Self::Name(name) => PeerRef::Name(name),
        }
    }
}

impl RawFrame {
    fn into_live(self) -> Result<LiveMessage, FrameError> {
        let sender = self.sender.ok_or_else(|| missing_field("sender"))?;
        let timestamp = self.timestamp.ok_or_else(|| missing_field("timestamp"))?;
        let sent_at = parse_timestamp(&timestamp)?;

        // `message` is what the live channel sends, `content` what history uses
        let body = normalize_body(self.message).or_else(|| normalize_body(self.content));
        let attachment = self
            .photo
            .filter(|p| !p.is_empty())
            .map(AttachmentRef::new);
        if body.is_none() && attachment.is_none() {
            return Err(FrameError::MissingContent);
        }

        let receiver = self
            .receiver_id
            .map(PeerRef::Id)
            .or_else(|| self.receiver.map(RawPeerRef::into_peer_ref));

        Ok(LiveMessage {
            id: self.id,
            sender,
            receiver,
            body,
            attachment,
            sent_at,
        })
    }
}

fn missing_field(field: &'static str) -> FrameError {
    FrameError::Malformed(<serde_json::Error as serde::de::Error>::missing_field(field))
}

/// A chat message emitted on the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundChat {
    /// Text body, empty for attachment-only messages
    pub message: String,
    /// Storage-relative attachment path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Target peer
    pub receiver_id: UserId,
}

impl OutboundChat {
    /// Build the frame for a composed message.
    pub fn new(receiver_id: UserId, body: Option<&str>, attachment: Option<&AttachmentRef>) -> Self {
        Self {
            message: body.unwrap_or_default().to_string(),
            photo: attachment.map(|a| a.wire_path().to_string()),
            receiver_id,
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_text(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Serialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_chat_message() {
        let text = r#"{
            "type": "chat_message",
            "message": "hello",
            "photo": null,
            "sender": "bob",
            "timestamp": "2024-05-01 12:00:00.000001+00:00"
        }"#;

        match ChannelEvent::decode(text).unwrap() {
            ChannelEvent::ChatMessage(live) => {
                assert_eq!(live.sender, "bob");
                assert_eq!(live.body.as_deref(), Some("hello"));
                assert!(live.attachment.is_none());
                assert!(live.receiver.is_none());
                assert!(live.id.is_none());
            }
            other => panic!("Expected ChatMessage, got {:?}", other),
        }
    }

    #[test]
    fn decodes_photo_only_message_with_content_alias() {
        let text = r#"{"type":"chat_message","content":"","photo":"/media/photos/p.jpg",
            "sender":"bob","timestamp":"2024-05-01T12:00:00Z","id":12,"receiver_id":3}"#;

        match ChannelEvent::decode(text).unwrap() {
            ChannelEvent::ChatMessage(live) => {
                assert!(live.body.is_none());
                assert_eq!(
                    live.attachment,
                    Some(AttachmentRef::new("/media/photos/p.jpg"))
                );
                assert_eq!(live.id, Some(MessageId::new(12)));
                assert_eq!(live.receiver, Some(PeerRef::Id(UserId::new(3))));
            }
            other => panic!("Expected ChatMessage, got {:?}", other),
        }
    }

    #[test]
    fn receiver_may_be_a_username() {
        let text = r#"{"type":"chat_message","message":"x","sender":"me",
            "receiver":"carol","timestamp":"2024-05-01T12:00:00Z"}"#;

        match ChannelEvent::decode(text).unwrap() {
            ChannelEvent::ChatMessage(live) => {
                assert_eq!(live.receiver, Some(PeerRef::Name("carol".into())));
            }
            other => panic!("Expected ChatMessage, got {:?}", other),
        }
    }

    #[test]
    fn decodes_notification() {
        let event = ChannelEvent::from_frame(
            r#"{"type":"notification","message":"New message from bob"}"#,
        );
        assert_eq!(
            event,
            ChannelEvent::Notification("New message from bob".into())
        );
    }

    #[test]
    fn backend_error_object_becomes_error_event() {
        let event = ChannelEvent::from_frame(r#"{"error": "Invalid JSON"}"#);
        assert_eq!(event, ChannelEvent::Error("Invalid JSON".into()));
    }

    #[test]
    fn malformed_json_becomes_error_event() {
        let event = ChannelEvent::from_frame("{not json");
        assert!(matches!(event, ChannelEvent::Error(reason) if reason.starts_with("malformed frame")));
    }

    #[test]
    fn unknown_type_is_reported() {
        let result = ChannelEvent::decode(r#"{"type":"typing","sender":"bob"}"#);
        assert!(matches!(result, Err(FrameError::UnknownType(t)) if t == "typing"));
    }

    #[test]
    fn chat_message_without_content_is_rejected() {
        let result = ChannelEvent::decode(
            r#"{"type":"chat_message","message":"","photo":null,"sender":"bob","timestamp":"2024-05-01T12:00:00Z"}"#,
        );
        assert!(matches!(result, Err(FrameError::MissingContent)));
    }

    #[test]
    fn chat_message_without_sender_is_malformed() {
        let result = ChannelEvent::decode(
            r#"{"type":"chat_message","message":"hi","timestamp":"2024-05-01T12:00:00Z"}"#,
        );
        assert!(matches!(result, Err(FrameError::Malformed(_))));
    }

    #[test]
    fn outbound_text_frame_shape() {
        let frame = OutboundChat::new(UserId::new(7), Some("hi"), None);
        let value: serde_json::Value = serde_json::from_str(&frame.to_text().unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"message": "hi", "receiver_id": 7}));
    }

    #[test]
    fn outbound_photo_uses_relative_path() {
        let attachment = AttachmentRef::new("/media/photos/abc.png");
        let frame = OutboundChat::new(UserId::new(7), None, Some(&attachment));
        let value: serde_json::Value = serde_json::from_str(&frame.to_text().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"message": "", "photo": "photos/abc.png", "receiver_id": 7})
        );
    }
}
