//! The conversation data model.
//!
//! A [`Message`] belongs to exactly one peer timeline and is immutable once
//! created, except for the single transition from [`Delivery::Pending`] to
//! [`Delivery::Confirmed`] when the backend echoes an optimistic append.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{FrameError, MessageId, UserId};

/// Path prefix under which the backend serves uploaded media.
pub const MEDIA_PREFIX: &str = "/media/";

/// Maximum clock distance between an optimistic append and its echo.
pub const ECHO_WINDOW: Duration = Duration::from_secs(120);

/// Another identity reachable through the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// Directory identifier
    pub id: UserId,
    /// Name shown to the user (the backend username)
    #[serde(rename = "username")]
    pub display_name: String,
}

impl Peer {
    /// Create a peer record.
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Reference to a peer as it appears inside a frame: by id or by username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeerRef {
    /// Directory identifier
    Id(UserId),
    /// Backend username
    Name(String),
}

impl PeerRef {
    /// Check whether this reference points at `peer`.
    pub fn matches(&self, peer: &Peer) -> bool {
        match self {
            Self::Id(id) => *id == peer.id,
            Self::Name(name) => *name == peer.display_name,
        }
    }
}

/// Stable reference to an uploaded attachment.
///
/// Holds the URL as served by the backend, e.g. `/media/photos/<uuid>.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentRef(String);

impl AttachmentRef {
    /// Wrap a backend URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The URL as served.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage-relative path expected in the outbound `photo` field.
    ///
    /// Absolute URLs and `/media/`-prefixed paths both reduce to the part
    /// after the media prefix.
    pub fn wire_path(&self) -> &str {
        match self.0.find(MEDIA_PREFIX) {
            Some(idx) => &self.0[idx + MEDIA_PREFIX.len()..],
            None => self.0.trim_start_matches('/'),
        }
    }

    /// Whether two references point at the same stored file.
    pub fn same_file(&self, other: &AttachmentRef) -> bool {
        self.wire_path() == other.wire_path()
    }
}

/// Whether the backend has confirmed a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// Appended locally, echo not yet seen
    Pending,
    /// Fetched from history or received on the live channel
    Confirmed,
}

/// Identity used for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageIdentity {
    /// Server-assigned id
    Server(MessageId),
    /// Content tuple when no server id exists
    Content {
        /// Sender username
        sender: String,
        /// Timeline the message belongs to
        peer_id: UserId,
        /// Send time
        sent_at: DateTime<Utc>,
        /// Text body
        body: Option<String>,
        /// Attachment URL
        attachment: Option<AttachmentRef>,
    },
}

/// A single entry of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server id, absent for optimistic appends and id-less frames
    pub id: Option<MessageId>,
    /// Username of the author
    pub sender: String,
    /// The peer whose timeline this message belongs to
    pub peer_id: UserId,
    /// Text body (never an empty string)
    pub body: Option<String>,
    /// Uploaded attachment
    pub attachment: Option<AttachmentRef>,
    /// Send time
    pub sent_at: DateTime<Utc>,
    /// Confirmation state
    pub delivery: Delivery,
}

impl Message {
    /// Create a confirmed message.
    ///
    /// Empty bodies are treated as absent. Fails when neither body nor
    /// attachment remains.
    pub fn new(
        sender: impl Into<String>,
        peer_id: UserId,
        body: Option<String>,
        attachment: Option<AttachmentRef>,
        sent_at: DateTime<Utc>,
    ) -> Result<Self, FrameError> {
        let body = normalize_body(body);
        if body.is_none() && attachment.is_none() {
            return Err(FrameError::MissingContent);
        }
        Ok(Self {
            id: None,
            sender: sender.into(),
            peer_id,
            body,
            attachment,
            sent_at,
            delivery: Delivery::Confirmed,
        })
    }

    /// Create an optimistic, not yet confirmed message.
    pub fn pending(
        sender: impl Into<String>,
        peer_id: UserId,
        body: Option<String>,
        attachment: Option<AttachmentRef>,
        sent_at: DateTime<Utc>,
    ) -> Result<Self, FrameError> {
        let mut message = Self::new(sender, peer_id, body, attachment, sent_at)?;
        message.delivery = Delivery::Pending;
        Ok(message)
    }

    /// Attach a server id.
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Whether the echo for this message is still outstanding.
    pub fn is_pending(&self) -> bool {
        self.delivery == Delivery::Pending
    }

    /// De-duplication identity.
    pub fn identity(&self) -> MessageIdentity {
        match self.id {
            Some(id) => MessageIdentity::Server(id),
            None => MessageIdentity::Content {
                sender: self.sender.clone(),
                peer_id: self.peer_id,
                sent_at: self.sent_at,
                body: self.body.clone(),
                attachment: self.attachment.clone(),
            },
        }
    }

    /// Check whether `other` is the same message, possibly its echo.
    ///
    /// Server ids decide only when both sides carry one; history records
    /// have ids while live frames do not. Otherwise the content tuple is
    /// compared. A pending entry matches a confirmed one with send times
    /// within [`ECHO_WINDOW`], since the local clock never equals the
    /// backend timestamp.
    pub fn same_as(&self, other: &Message) -> bool {
        if let (Some(a), Some(b)) = (self.id, other.id) {
            return a == b;
        }
        if !self.same_content(other) {
            return false;
        }
        if self.is_pending() == other.is_pending() {
            return self.sent_at == other.sent_at;
        }
        let skew = (self.sent_at - other.sent_at).num_milliseconds().unsigned_abs();
        skew <= ECHO_WINDOW.as_millis() as u64
    }

    fn same_content(&self, other: &Message) -> bool {
        self.sender == other.sender
            && self.peer_id == other.peer_id
            && self.body == other.body
            && match (&self.attachment, &other.attachment) {
                (Some(a), Some(b)) => a.same_file(b),
                (None, None) => true,
                _ => false,
            }
    }

    /// Adopt the backend's view of a pending message.
    pub fn confirm_with(&mut self, echo: &Message) {
        self.id = echo.id.or(self.id);
        self.sent_at = echo.sent_at;
        if echo.attachment.is_some() {
            self.attachment = echo.attachment.clone();
        }
        self.delivery = Delivery::Confirmed;
    }
}

/// A decoded `chat_message` frame before it is attributed to a timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveMessage {
    /// Server id, when the backend includes one
    pub id: Option<MessageId>,
    /// Username of the author
    pub sender: String,
    /// Explicit receiver, when the backend includes one
    pub receiver: Option<PeerRef>,
    /// Text body (never an empty string)
    pub body: Option<String>,
    /// Uploaded attachment
    pub attachment: Option<AttachmentRef>,
    /// Backend timestamp
    pub sent_at: DateTime<Utc>,
}

impl LiveMessage {
    /// The other party of this message, seen from `me`.
    ///
    /// Returns `None` for a self-sent message without a receiver field.
    pub fn counterpart(&self, me: &str) -> Option<PeerRef> {
        if self.sender == me {
            self.receiver.clone()
        } else {
            Some(PeerRef::Name(self.sender.clone()))
        }
    }

    /// Attribute this message to a timeline.
    pub fn into_message(self, peer_id: UserId) -> Result<Message, FrameError> {
        let message = Message::new(
            self.sender,
            peer_id,
            self.body,
            self.attachment,
            self.sent_at,
        )?;
        Ok(match self.id {
            Some(id) => message.with_id(id),
            None => message,
        })
    }
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T12:00:00.123Z`), the Python `str(datetime)`
/// form (`2024-05-01 12:00:00.123456+00:00`) and naive timestamps, which are
/// taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FrameError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(FrameError::InvalidTimestamp(raw.to_string()))
}

pub(crate) fn normalize_body(body: Option<String>) -> Option<String> {
    body.filter(|b| !b.is_empty())
}
