//! REST payloads exchanged with the auth service and the messaging backend.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::frame::RawPeerRef;
use crate::{parse_timestamp, AttachmentRef, Credential, FrameError, Message, MessageId, Peer, PeerRef};

/// Body of `POST /api/register/` and `POST /api/login/`.
#[derive(Clone, Serialize)]
pub struct AuthRequest {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful auth response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    /// The issued bearer credential
    pub token: Credential,
}

/// Error body shapes the backend produces.
///
/// Registration answers `{"error": ...}`, the token endpoint
/// `{"non_field_errors": [...]}`, and permission failures `{"detail": ...}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Custom view error
    #[serde(default)]
    pub error: Option<String>,
    /// Framework-level detail
    #[serde(default)]
    pub detail: Option<String>,
    /// Form validation errors
    #[serde(default)]
    pub non_field_errors: Vec<String>,
}

impl ApiErrorBody {
    /// The most specific message, if any.
    pub fn message(&self) -> Option<String> {
        self.error
            .clone()
            .or_else(|| self.non_field_errors.first().cloned())
            .or_else(|| self.detail.clone())
    }
}

/// Response of `POST /api/upload-photo/`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    /// URL of the stored file
    pub url: String,
}

impl UploadReceipt {
    /// The reference to embed in a chat frame.
    pub fn into_ref(self) -> AttachmentRef {
        AttachmentRef::new(self.url)
    }
}

/// One entry of `GET /api/messages/?receiver=<id>`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    /// Server id
    #[serde(default)]
    pub id: Option<MessageId>,
    sender: RawPeerRef,
    #[serde(default, alias = "message")]
    content: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    timestamp: String,
}

impl HistoryRecord {
    /// Convert into a confirmed message on `peer`'s timeline.
    ///
    /// The sender may be serialized as a username or as a user id; an id
    /// other than the peer's is the session user.
    pub fn into_message(self, peer: &Peer, me: &str) -> Result<Message, FrameError> {
        let sender = match self.sender.into_peer_ref() {
            PeerRef::Name(name) => name,
            PeerRef::Id(id) if id == peer.id => peer.display_name.clone(),
            PeerRef::Id(_) => me.to_string(),
        };
        let sent_at = parse_timestamp(&self.timestamp)?;
        let attachment = self
            .photo
            .filter(|p| !p.is_empty())
            .map(AttachmentRef::new);
        let message = Message::new(sender, peer.id, self.content, attachment, sent_at)?;
        Ok(match self.id {
            Some(id) => message.with_id(id),
            None => message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;

    fn bob() -> Peer {
        Peer::new(UserId::new(2), "bob")
    }

    #[test]
    fn history_record_with_username_sender() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{"id": 10, "sender": "bob", "receiver": "alice", "content": "hey",
                "photo": null, "timestamp": "2024-05-01T12:00:00Z", "is_read": false}"#,
        )
        .unwrap();

        let message = record.into_message(&bob(), "alice").unwrap();
        assert_eq!(message.id, Some(MessageId::new(10)));
        assert_eq!(message.sender, "bob");
        assert_eq!(message.peer_id, UserId::new(2));
        assert_eq!(message.body.as_deref(), Some("hey"));
        assert!(!message.is_pending());
    }

    #[test]
    fn history_record_with_numeric_sender() {
        let mine: HistoryRecord = serde_json::from_str(
            r#"{"sender": 1, "content": "hi", "timestamp": "2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        let theirs: HistoryRecord = serde_json::from_str(
            r#"{"sender": 2, "content": "hi", "timestamp": "2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(mine.into_message(&bob(), "alice").unwrap().sender, "alice");
        assert_eq!(theirs.into_message(&bob(), "alice").unwrap().sender, "bob");
    }

    #[test]
    fn history_record_accepts_message_alias() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{"sender": "bob", "message": "aliased", "timestamp": "2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        let message = record.into_message(&bob(), "alice").unwrap();
        assert_eq!(message.body.as_deref(), Some("aliased"));
    }

    #[test]
    fn empty_history_record_is_rejected() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{"sender": "bob", "content": "", "photo": "", "timestamp": "2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(
            record.into_message(&bob(), "alice"),
            Err(FrameError::MissingContent)
        ));
    }

    #[test]
    fn error_body_prefers_specific_message() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"error": "Username already exists"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Username already exists"));

        let body: ApiErrorBody = serde_json::from_str(
            r#"{"non_field_errors": ["Unable to log in with provided credentials."]}"#,
        )
        .unwrap();
        assert_eq!(
            body.message().as_deref(),
            Some("Unable to log in with provided credentials.")
        );

        assert!(ApiErrorBody::default().message().is_none());
    }

    #[test]
    fn auth_request_debug_hides_password() {
        let request = AuthRequest {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{:?}", request);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn token_grant_wraps_credential() {
        let grant: TokenGrant = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(grant.token.as_str(), "abc");
    }
}
