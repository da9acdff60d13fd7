//! ChatClient - the main interface for Courier.
//!
//! ChatClient owns every piece of per-session state and applies changes one
//! at a time. Background work (the channel reader, history fetches) only ever
//! posts to a single inbound queue; [`ChatClient::next_update`] pops one item
//! and applies it, and user actions take `&mut self`, so no two mutations of
//! the conversation can interleave.
//!
//! ```text
//! reader task ──┐
//!               ├──► inbound queue ──► next_update() ──► Reconciler
//! history tasks ┘
//! select_peer / submit (&mut self) ──────────────────► Reconciler / SendCoordinator
//! ```
//!
//! # Example
//!
//! ```ignore
//! let session = auth::login(&api, "alice", "pw").await?;
//! let mut client = ChatClient::new(session, Arc::new(api), WebSocketTransport::new(timeout), &config)?;
//! client.connect().await?;
//! client.select_peer(bob);
//! client.set_body("hi")?;
//! client.submit().await?;
//! while let Some(update) = client.next_update().await { /* render */ }
//! ```

use std::sync::Arc;

use courier_core::{
    Attachment, ChannelNotice, ChannelState, Conversation, Draft, FailureKind, FetchTicket,
    HistoryOutcome, LiveOutcome, Reconciler,
};
use courier_types::{ChannelEvent, LiveMessage, Message, Peer, UserId};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AttachmentUploader, HistorySource};
use crate::channel::LiveChannel;
use crate::config::ClientConfig;
use crate::coordinator::SendCoordinator;
use crate::error::ClientError;
use crate::history::HistoryLoader;
use crate::session::SessionContext;
use crate::transport::Transport;

/// Items posted to the dispatcher queue by background tasks.
#[derive(Debug)]
pub enum Inbound {
    /// A decoded live channel event.
    Channel(ChannelEvent),
    /// The live channel went away.
    ChannelClosed {
        /// Why, when known.
        reason: Option<String>,
    },
    /// A history fetch finished.
    History {
        /// The selection the fetch belongs to.
        ticket: FetchTicket,
        /// Fetched messages or the failure.
        result: Result<Vec<Message>, ApiError>,
    },
}

/// What applying one inbound item changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// History replaced the active timeline.
    HistoryLoaded {
        /// Peer whose history arrived.
        peer_id: UserId,
        /// Entries in the timeline.
        count: usize,
    },
    /// History fetch failed; the timeline carries the error.
    HistoryFailed {
        /// Peer whose fetch failed.
        peer_id: UserId,
        /// Failure category.
        kind: FailureKind,
        /// Human-readable reason.
        reason: String,
    },
    /// A fetch for an outdated selection resolved and was discarded.
    StaleHistory {
        /// Peer the outdated fetch targeted.
        peer_id: UserId,
    },
    /// A live message was appended to the active timeline.
    Appended(Message),
    /// The echo of an optimistic send arrived.
    Confirmed(Message),
    /// A live message already present was dropped.
    Duplicate,
    /// Side-channel notification text.
    Notification(String),
    /// A live message for a peer other than the active one.
    ElsewhereMessage(LiveMessage),
    /// An inbound frame could not be used; the channel stays open.
    FrameError(String),
    /// The live channel closed; `reconnect()` to resume.
    ChannelClosed {
        /// Why the channel closed.
        reason: String,
    },
}

/// The per-session messaging client.
pub struct ChatClient<A, T>
where
    A: HistorySource + AttachmentUploader + 'static,
    T: Transport + 'static,
{
    session: SessionContext,
    channel: Arc<LiveChannel<T>>,
    reconciler: Reconciler,
    coordinator: SendCoordinator<A>,
    history: HistoryLoader<A>,
    inbound_rx: UnboundedReceiver<Inbound>,
    inbound_tx: UnboundedSender<Inbound>,
    reader: Option<JoinHandle<()>>,
}

impl<A, T> ChatClient<A, T>
where
    A: HistorySource + AttachmentUploader + 'static,
    T: Transport + 'static,
{
    /// Create a client for `session`. The live channel starts closed.
    pub fn new(
        session: SessionContext,
        api: Arc<A>,
        transport: T,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        let channel = Arc::new(LiveChannel::new(transport, config, &session)?);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Ok(Self {
            reconciler: Reconciler::new(session.username()),
            coordinator: SendCoordinator::new(Arc::clone(&api), config.limits.max_attachment_bytes),
            history: HistoryLoader::new(api, session.clone(), inbound_tx.clone()),
            session,
            channel,
            inbound_rx,
            inbound_tx,
            reader: None,
        })
    }

    /// The signed-in user.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The active timeline.
    pub fn conversation(&self) -> &Conversation {
        self.reconciler.conversation()
    }

    /// The selected peer.
    pub fn active_peer(&self) -> Option<&Peer> {
        self.reconciler.active_peer()
    }

    /// The message being composed.
    pub fn draft(&self) -> &Draft {
        self.coordinator.draft()
    }

    /// Live channel lifecycle state.
    pub async fn channel_state(&self) -> ChannelState {
        self.channel.state().await
    }

    /// Open the live channel and start reading from it.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        self.channel.open().await?;
        self.reader = Some(self.spawn_reader());
        Ok(())
    }

    /// Re-open the live channel after it closed.
    ///
    /// Nothing reconnects automatically; this is the only way back.
    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        info!("reconnecting live channel");
        self.connect().await
    }

    fn spawn_reader(&self) -> JoinHandle<()> {
        let channel = Arc::clone(&self.channel);
        let inbound = self.inbound_tx.clone();

        tokio::spawn(async move {
            while let Some(event) = channel.next_event().await {
                if inbound.send(Inbound::Channel(event)).is_err() {
                    return;
                }
            }
            let reason = match channel.last_notice().await {
                Some(ChannelNotice::Closed { reason }) | Some(ChannelNotice::Failed { reason }) => {
                    Some(reason)
                }
                _ => None,
            };
            let _ = inbound.send(Inbound::ChannelClosed { reason });
        })
    }

    /// Switch the conversation to `peer` and fetch its history.
    ///
    /// Selecting the same peer again retries a failed fetch.
    pub fn select_peer(&mut self, peer: Peer) -> FetchTicket {
        let ticket = self.reconciler.select_peer(peer.clone());
        debug!(peer = %peer.id, generation = ticket.generation(), "peer selected");
        self.history.spawn(ticket, peer);
        ticket
    }

    /// Leave the conversation; any fetch in flight is discarded.
    pub fn clear_selection(&mut self) {
        self.reconciler.clear_selection();
    }

    /// Replace the typed text.
    pub fn set_body(&mut self, body: impl Into<String>) -> Result<(), ClientError> {
        self.coordinator.set_body(body)
    }

    /// Select an attachment for the next send.
    pub fn attach(&mut self, attachment: Attachment) -> Result<(), ClientError> {
        self.coordinator.attach(attachment)
    }

    /// Drop the selected attachment.
    pub fn detach(&mut self) -> Result<Option<Attachment>, ClientError> {
        self.coordinator.detach()
    }

    /// Send the draft to the active peer.
    ///
    /// On success the message is appended to the timeline as `Pending` and
    /// returned.
    pub async fn submit(&mut self) -> Result<Message, ClientError> {
        let peer = self.reconciler.active_peer().cloned();
        let message = self
            .coordinator
            .submit(&self.session, peer.as_ref(), &self.channel)
            .await?;

        self.reconciler.append_local(message.clone());
        Ok(message)
    }

    /// Wait for the next inbound item and apply it.
    pub async fn next_update(&mut self) -> Option<Update> {
        let inbound = self.inbound_rx.recv().await?;
        Some(self.handle(inbound))
    }

    /// Apply an inbound item without waiting, if one is queued.
    pub fn try_next_update(&mut self) -> Option<Update> {
        let inbound = self.inbound_rx.try_recv().ok()?;
        Some(self.handle(inbound))
    }

    fn handle(&mut self, inbound: Inbound) -> Update {
        match inbound {
            Inbound::History { ticket, result } => self.apply_history(ticket, result),
            Inbound::Channel(ChannelEvent::ChatMessage(live)) => {
                match self.reconciler.apply_live(live) {
                    LiveOutcome::Appended(message) => Update::Appended(message),
                    LiveOutcome::Confirmed(message) => Update::Confirmed(message),
                    LiveOutcome::Duplicate => Update::Duplicate,
                    LiveOutcome::Elsewhere(live) => Update::ElsewhereMessage(live),
                }
            }
            Inbound::Channel(ChannelEvent::Notification(text)) => Update::Notification(text),
            Inbound::Channel(ChannelEvent::Error(reason)) => Update::FrameError(reason),
            Inbound::ChannelClosed { reason } => Update::ChannelClosed {
                reason: reason.unwrap_or_else(|| "connection closed".into()),
            },
        }
    }

    fn apply_history(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Message>, ApiError>,
    ) -> Update {
        let peer_id = ticket.peer_id();
        match result {
            Ok(messages) => match self.reconciler.apply_history(ticket, messages) {
                HistoryOutcome::Applied { count } => Update::HistoryLoaded { peer_id, count },
                _ => {
                    debug!(peer = %peer_id, "discarding stale history");
                    Update::StaleHistory { peer_id }
                }
            },
            Err(error) => {
                let kind = error.failure_kind();
                let reason = error.to_string();
                match self.reconciler.fail_history(ticket, kind, reason.clone()) {
                    HistoryOutcome::Failed => {
                        warn!(peer = %peer_id, %reason, "history fetch failed");
                        Update::HistoryFailed {
                            peer_id,
                            kind,
                            reason,
                        }
                    }
                    _ => Update::StaleHistory { peer_id },
                }
            }
        }
    }

    /// End the session: close the channel and stop background reading.
    ///
    /// A new credential needs a new client.
    pub async fn shutdown(mut self) -> Result<(), ClientError> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.channel.close().await?;
        info!(username = %self.session.username(), "session closed");
        Ok(())
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        self.channel.transport()
    }
}
