//! Outbound composition.
//!
//! The [`Composer`] tracks the draft being typed and the phase of the send
//! built from it:
//!
//! ```text
//! Idle -> Composing -> Uploading (attachment only) -> Emitting -> Idle
//! ```
//!
//! The draft is only cleared by [`Composer::complete`]. Every failure goes
//! back to `Idle` with the draft untouched so it can be resubmitted.

use std::fmt;

use courier_types::UserId;
use thiserror::Error;

/// Errors raised by local validation, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// Neither text nor attachment present.
    #[error("message is empty")]
    EmptyMessage,

    /// A send is already in flight.
    #[error("a send is already in progress")]
    Busy,
}

/// Phase of the send built from the current draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPhase {
    /// Nothing typed, nothing in flight.
    #[default]
    Idle,
    /// Draft has content.
    Composing,
    /// Attachment transfer in progress.
    Uploading,
    /// Chat frame being written to the live channel.
    Emitting,
}

impl SendPhase {
    /// Check if a send is in flight.
    pub fn in_flight(&self) -> bool {
        matches!(self, Self::Uploading | Self::Emitting)
    }
}

/// A binary attachment waiting to be uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name sent with the multipart part.
    pub file_name: String,
    /// MIME type, e.g. `image/png`.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Create an attachment.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the attachment has no contents.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the content type is an image, the only kind the backend stores.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The message being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Typed text.
    pub body: String,
    /// Selected attachment.
    pub attachment: Option<Attachment>,
}

impl Draft {
    /// Check if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.attachment.is_none()
    }
}

/// A snapshot of the draft handed to the send pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    /// Text body, `None` when nothing was typed.
    pub body: Option<String>,
    /// Attachment to upload first.
    pub attachment: Option<Attachment>,
    /// Target peer.
    pub peer_id: UserId,
}

/// Draft and send-phase tracker.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    draft: Draft,
    phase: SendPhase,
}

impl Composer {
    /// Create an empty composer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current draft.
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Current phase.
    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    /// Replace the typed text.
    pub fn set_body(&mut self, body: impl Into<String>) -> Result<(), ComposeError> {
        self.ensure_idle()?;
        self.draft.body = body.into();
        self.settle();
        Ok(())
    }

    /// Select an attachment, replacing any previous one.
    pub fn attach(&mut self, attachment: Attachment) -> Result<(), ComposeError> {
        self.ensure_idle()?;
        self.draft.attachment = Some(attachment);
        self.settle();
        Ok(())
    }

    /// Drop the selected attachment.
    pub fn detach(&mut self) -> Result<Option<Attachment>, ComposeError> {
        self.ensure_idle()?;
        let previous = self.draft.attachment.take();
        self.settle();
        Ok(previous)
    }

    /// Start sending the draft to `peer_id`.
    ///
    /// Moves to `Uploading` when an attachment is present, else straight to
    /// `Emitting`. The draft itself is kept until [`Composer::complete`].
    pub fn begin(&mut self, peer_id: UserId) -> Result<PendingSend, ComposeError> {
        self.ensure_idle()?;
        if self.draft.is_empty() {
            return Err(ComposeError::EmptyMessage);
        }

        self.phase = if self.draft.attachment.is_some() {
            SendPhase::Uploading
        } else {
            SendPhase::Emitting
        };

        Ok(PendingSend {
            body: Some(self.draft.body.clone()).filter(|b| !b.is_empty()),
            attachment: self.draft.attachment.clone(),
            peer_id,
        })
    }

    /// The attachment upload finished; the frame may be emitted.
    pub fn upload_finished(&mut self) {
        if self.phase == SendPhase::Uploading {
            self.phase = SendPhase::Emitting;
        }
    }

    /// The send failed; back to `Idle` with the draft preserved.
    pub fn fail(&mut self) {
        self.phase = SendPhase::Idle;
    }

    /// The frame was emitted; clear the draft.
    pub fn complete(&mut self) {
        self.draft = Draft::default();
        self.phase = SendPhase::Idle;
    }

    fn ensure_idle(&self) -> Result<(), ComposeError> {
        if self.phase.in_flight() {
            return Err(ComposeError::Busy);
        }
        Ok(())
    }

    fn settle(&mut self) {
        self.phase = if self.draft.is_empty() {
            SendPhase::Idle
        } else {
            SendPhase::Composing
        };
    }
}
