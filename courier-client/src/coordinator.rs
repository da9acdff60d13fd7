//! Outbound send sequencing.
//!
//! [`SendCoordinator`] turns the composer's draft into a chat frame:
//!
//! ```text
//! validate ─► peer? ─► channel open? ─► upload (attachment only) ─► emit ─► clear
//! ```
//!
//! Every check that can fail without touching the network runs first, so a
//! dead channel never leaves an orphaned upload behind. Any failure returns
//! the composer to idle with the draft intact.

use std::sync::Arc;

use chrono::Utc;
use courier_core::{Attachment, Composer, Draft, SendPhase};
use courier_types::{AttachmentRef, Message, OutboundChat, Peer};
use tracing::{debug, warn};

use crate::api::AttachmentUploader;
use crate::channel::LiveChannel;
use crate::error::ClientError;
use crate::session::SessionContext;
use crate::transport::Transport;

/// Owns the draft and runs sends for one session.
pub struct SendCoordinator<U: AttachmentUploader> {
    uploader: Arc<U>,
    composer: Composer,
    max_attachment_bytes: usize,
}

impl<U: AttachmentUploader> SendCoordinator<U> {
    /// Create a coordinator enforcing `max_attachment_bytes` locally.
    pub fn new(uploader: Arc<U>, max_attachment_bytes: usize) -> Self {
        Self {
            uploader,
            composer: Composer::new(),
            max_attachment_bytes,
        }
    }

    /// Current draft.
    pub fn draft(&self) -> &Draft {
        self.composer.draft()
    }

    /// Current send phase.
    pub fn phase(&self) -> SendPhase {
        self.composer.phase()
    }

    /// Replace the typed text.
    pub fn set_body(&mut self, body: impl Into<String>) -> Result<(), ClientError> {
        Ok(self.composer.set_body(body)?)
    }

    /// Select an attachment.
    pub fn attach(&mut self, attachment: Attachment) -> Result<(), ClientError> {
        Ok(self.composer.attach(attachment)?)
    }

    /// Drop the selected attachment.
    pub fn detach(&mut self) -> Result<Option<Attachment>, ClientError> {
        Ok(self.composer.detach()?)
    }

    /// Send the draft to `peer` and return the optimistic message.
    ///
    /// The returned message is `Pending`; the caller appends it to the
    /// conversation, where the backend echo later confirms it.
    pub async fn submit<T: Transport>(
        &mut self,
        session: &SessionContext,
        peer: Option<&Peer>,
        channel: &LiveChannel<T>,
    ) -> Result<Message, ClientError> {
        if self.composer.phase().in_flight() {
            return Err(ClientError::Busy);
        }
        if self.composer.draft().is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let peer = peer.ok_or(ClientError::NoPeerSelected)?;
        if !channel.is_open().await {
            warn!(peer = %peer.id, "send dropped: live channel not open");
            return Err(ClientError::ChannelNotReady);
        }
        if let Some(attachment) = &self.composer.draft().attachment {
            self.check_attachment(attachment)?;
        }

        let pending = self.composer.begin(peer.id)?;

        let reference = match &pending.attachment {
            Some(attachment) => match self.upload(session, attachment).await {
                Ok(reference) => Some(reference),
                Err(e) => {
                    self.composer.fail();
                    return Err(e);
                }
            },
            None => None,
        };

        let frame = OutboundChat::new(peer.id, pending.body.as_deref(), reference.as_ref());
        let message = Message::pending(
            session.username(),
            peer.id,
            pending.body,
            reference,
            Utc::now(),
        );
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                self.composer.fail();
                return Err(e.into());
            }
        };

        if let Err(e) = channel.send(&frame).await {
            self.composer.fail();
            return Err(e);
        }

        self.composer.complete();
        debug!(peer = %peer.id, "message sent");
        Ok(message)
    }

    async fn upload(
        &mut self,
        session: &SessionContext,
        attachment: &Attachment,
    ) -> Result<AttachmentRef, ClientError> {
        debug!(file = %attachment.file_name, bytes = attachment.len(), "uploading attachment");
        let reference = self
            .uploader
            .upload(session.credential(), attachment)
            .await?;
        self.composer.upload_finished();
        Ok(reference)
    }

    fn check_attachment(&self, attachment: &Attachment) -> Result<(), ClientError> {
        if attachment.len() > self.max_attachment_bytes {
            return Err(ClientError::PayloadTooLarge);
        }
        if !attachment.is_image() {
            return Err(ClientError::Rejected(
                "Only image files are allowed".into(),
            ));
        }
        Ok(())
    }
}
