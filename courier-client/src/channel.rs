//! LiveChannel - the persistent connection to the messaging backend.
//!
//! LiveChannel drives the pure [`ChannelState`] machine from courier-core and
//! interprets its actions against a [`Transport`].
//!
//! ```text
//! open() ──► Connect ──► Transport::connect ──► Accepted ──► Open
//!                                          └──► Rejected ──► Closed
//! next_event() ◄── Transport::recv ◄── FrameReceived / ConnectionLost
//! ```
//!
//! There is no automatic reconnect: once the transport goes away the channel
//! is `Closed` until the caller opens it again.

use std::sync::Arc;

use courier_core::{Action, ChannelNotice, ChannelState, Event};
use courier_types::{ChannelEvent, OutboundChat};
use futures_util::stream::{self, Stream};
use reqwest::Url;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::SessionContext;
use crate::transport::Transport;

/// One live connection, bound to a single credential.
pub struct LiveChannel<T: Transport> {
    transport: T,
    url: Url,
    inner: Mutex<ChannelInner>,
}

#[derive(Debug, Default)]
struct ChannelInner {
    state: ChannelState,
    last_notice: Option<ChannelNotice>,
}

impl<T: Transport> LiveChannel<T> {
    /// Create a closed channel for `session`.
    pub fn new(
        transport: T,
        config: &ClientConfig,
        session: &SessionContext,
    ) -> Result<Self, ClientError> {
        let url = config.channel_url(session.credential())?;
        Ok(Self {
            transport,
            url,
            inner: Mutex::new(ChannelInner::default()),
        })
    }

    /// Feed one event to the state machine and record any notice it emits.
    async fn apply(&self, event: Event) -> Vec<Action> {
        let mut inner = self.inner.lock().await;
        let (next, actions) = inner.state.on_event(event);
        inner.state = next;

        for action in &actions {
            if let Action::Emit(notice) = action {
                match notice {
                    ChannelNotice::Opened => info!(endpoint = %self.endpoint(), "live channel open"),
                    ChannelNotice::Failed { reason } => {
                        warn!(endpoint = %self.endpoint(), %reason, "live channel handshake failed")
                    }
                    ChannelNotice::Closed { reason } => info!(%reason, "live channel closed"),
                }
                inner.last_notice = Some(notice.clone());
            }
        }
        actions
    }

    /// Channel URL without the credential, for logs.
    fn endpoint(&self) -> Url {
        let mut shown = self.url.clone();
        shown.set_query(None);
        shown
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ChannelState {
        self.inner.lock().await.state
    }

    /// Check if sends are currently allowed.
    pub async fn is_open(&self) -> bool {
        self.state().await.is_open()
    }

    /// The last lifecycle notice (open, failed, closed).
    pub async fn last_notice(&self) -> Option<ChannelNotice> {
        self.inner.lock().await.last_notice.clone()
    }

    /// Open the channel (or re-open it after a close).
    ///
    /// A no-op while the channel is already opening or open.
    pub async fn open(&self) -> Result<(), ClientError> {
        let actions = self.apply(Event::OpenRequested).await;
        if !actions.contains(&Action::Connect) {
            return Ok(());
        }

        debug!(endpoint = %self.endpoint(), "connecting live channel");
        match self.transport.connect(self.url.as_str()).await {
            Ok(()) => {
                self.apply(Event::Accepted).await;
                // close() raced the handshake; don't leak the connection
                if !self.is_open().await {
                    let _ = self.transport.close().await;
                }
                Ok(())
            }
            Err(e) => {
                let unauthorized = e.is_unauthorized();
                let reason = e.to_string();
                self.apply(Event::Rejected {
                    reason: reason.clone(),
                })
                .await;
                if unauthorized {
                    Err(ClientError::Unauthorized)
                } else {
                    Err(ClientError::Unreachable(reason))
                }
            }
        }
    }

    /// Emit a chat frame.
    ///
    /// Fails with [`ClientError::ChannelNotReady`] unless the channel is open.
    pub async fn send(&self, frame: &OutboundChat) -> Result<(), ClientError> {
        let state = self.state().await;
        if !state.is_open() {
            warn!(?state, receiver = %frame.receiver_id, "dropping send: live channel not open");
            return Err(ClientError::ChannelNotReady);
        }

        let text = frame.to_text()?;
        debug!(receiver = %frame.receiver_id, "sending chat frame");
        self.transport.send(&text).await?;
        Ok(())
    }

    /// Wait for the next decoded event.
    ///
    /// Undecodable frames come back as [`ChannelEvent::Error`] and leave the
    /// connection open. Returns `None` once the connection is gone.
    pub async fn next_event(&self) -> Option<ChannelEvent> {
        if !self.is_open().await {
            return None;
        }

        match self.transport.recv().await {
            Ok(text) => {
                let actions = self.apply(Event::FrameReceived).await;
                if !actions.contains(&Action::Deliver) {
                    return None;
                }
                let event = ChannelEvent::from_frame(&text);
                match &event {
                    ChannelEvent::Error(reason) => warn!(%reason, "inbound frame error"),
                    ChannelEvent::ChatMessage(live) => {
                        debug!(sender = %live.sender, "chat frame received")
                    }
                    ChannelEvent::Notification(_) => debug!("notification received"),
                }
                Some(event)
            }
            Err(e) => {
                self.apply(Event::ConnectionLost {
                    reason: e.to_string(),
                })
                .await;
                None
            }
        }
    }

    /// Close the channel. Idempotent.
    pub async fn close(&self) -> Result<(), ClientError> {
        let actions = self.apply(Event::CloseRequested).await;
        if !actions.contains(&Action::Disconnect) {
            return Ok(());
        }

        let result = self.transport.close().await;
        self.apply(Event::CloseCompleted).await;
        result?;
        Ok(())
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport + 'static> LiveChannel<T> {
    /// Decoded events as a stream, ending when the connection goes away.
    pub fn events(self: Arc<Self>) -> impl Stream<Item = ChannelEvent> + Send {
        stream::unfold(self, |channel| async move {
            channel.next_event().await.map(|event| (event, channel))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, TransportError};
    use courier_types::{Credential, UserId};
    use futures_util::StreamExt;

    fn channel() -> (LiveChannel<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let session = SessionContext::new(Credential::new("tok"), "alice");
        let channel =
            LiveChannel::new(transport.clone(), &ClientConfig::default(), &session).unwrap();
        (channel, transport)
    }

    fn chat(body: &str) -> String {
        format!(
            r#"{{"type":"chat_message","message":"{}","photo":null,"sender":"bob","timestamp":"2024-05-01T12:00:00Z"}}"#,
            body
        )
    }

    // ===========================================
    // Lifecycle
    // ===========================================

    #[tokio::test]
    async fn open_connects_with_token_in_query() {
        let (channel, transport) = channel();

        channel.open().await.unwrap();

        assert!(channel.is_open().await);
        assert_eq!(
            transport.connected_url().as_deref(),
            Some("ws://127.0.0.1:8000/ws/chat/?token=tok")
        );
        assert_eq!(channel.last_notice().await, Some(ChannelNotice::Opened));
    }

    #[tokio::test]
    async fn open_twice_connects_once() {
        let (channel, transport) = channel();
        channel.open().await.unwrap();
        channel.open().await.unwrap();
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn rejected_handshake_is_unauthorized() {
        let (channel, transport) = channel();
        transport.fail_next_connect(TransportError::Rejected { status: 403 });

        let result = channel.open().await;

        assert!(matches!(result, Err(ClientError::Unauthorized)));
        assert!(channel.state().await.is_closed());
    }

    #[tokio::test]
    async fn network_failure_is_unreachable() {
        let (channel, transport) = channel();
        transport.fail_next_connect(TransportError::ConnectionFailed("refused".into()));

        assert!(matches!(
            channel.open().await,
            Err(ClientError::Unreachable(_))
        ));
        assert!(matches!(
            channel.last_notice().await,
            Some(ChannelNotice::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (channel, transport) = channel();
        channel.open().await.unwrap();

        channel.close().await.unwrap();
        channel.close().await.unwrap();

        assert!(channel.state().await.is_closed());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn close_before_open_is_noop() {
        let (channel, _transport) = channel();
        channel.close().await.unwrap();
        assert!(channel.state().await.is_closed());
    }

    // ===========================================
    // Sending
    // ===========================================

    #[tokio::test]
    async fn send_while_closed_is_channel_not_ready() {
        let (channel, transport) = channel();
        let frame = OutboundChat::new(UserId::new(2), Some("hi"), None);

        let result = channel.send(&frame).await;

        assert!(matches!(result, Err(ClientError::ChannelNotReady)));
        assert!(transport.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn send_while_open_writes_frame() {
        let (channel, transport) = channel();
        channel.open().await.unwrap();

        channel
            .send(&OutboundChat::new(UserId::new(2), Some("hi"), None))
            .await
            .unwrap();

        let sent: serde_json::Value =
            serde_json::from_str(&transport.last_sent().unwrap()).unwrap();
        assert_eq!(sent, serde_json::json!({"message": "hi", "receiver_id": 2}));
    }

    #[tokio::test]
    async fn transport_send_failure_surfaces() {
        let (channel, transport) = channel();
        channel.open().await.unwrap();
        transport.fail_next_send("broken pipe");

        let result = channel
            .send(&OutboundChat::new(UserId::new(2), Some("hi"), None))
            .await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }

    // ===========================================
    // Receiving
    // ===========================================

    #[tokio::test]
    async fn decodes_frames_in_order() {
        let (channel, transport) = channel();
        channel.open().await.unwrap();
        transport.queue_frame(chat("one"));
        transport.queue_frame(r#"{"type":"notification","message":"New message"}"#);

        assert!(matches!(
            channel.next_event().await,
            Some(ChannelEvent::ChatMessage(m)) if m.body.as_deref() == Some("one")
        ));
        assert_eq!(
            channel.next_event().await,
            Some(ChannelEvent::Notification("New message".into()))
        );
    }

    #[tokio::test]
    async fn malformed_frame_does_not_close_channel() {
        let (channel, transport) = channel();
        channel.open().await.unwrap();
        transport.queue_frame("{garbage");
        transport.queue_frame(chat("still here"));

        assert!(matches!(
            channel.next_event().await,
            Some(ChannelEvent::Error(_))
        ));
        assert!(channel.is_open().await);
        assert!(matches!(
            channel.next_event().await,
            Some(ChannelEvent::ChatMessage(_))
        ));
    }

    #[tokio::test]
    async fn remote_close_ends_events_without_reconnect() {
        let (channel, transport) = channel();
        channel.open().await.unwrap();
        transport.close_remote();

        assert!(channel.next_event().await.is_none());
        assert!(channel.state().await.is_closed());
        assert_eq!(transport.connect_count(), 1);
        assert!(matches!(
            channel.last_notice().await,
            Some(ChannelNotice::Closed { .. })
        ));

        // Reconnect is explicit
        channel.open().await.unwrap();
        assert!(channel.is_open().await);
        assert_eq!(transport.connect_count(), 2);
    }

    #[tokio::test]
    async fn next_event_on_closed_channel_is_none() {
        let (channel, _transport) = channel();
        assert!(channel.next_event().await.is_none());
    }

    #[tokio::test]
    async fn events_stream_yields_until_close() {
        let (channel, transport) = channel();
        channel.open().await.unwrap();
        transport.queue_frame(chat("a"));
        transport.queue_frame(chat("b"));
        transport.close_remote();

        let events: Vec<_> = Arc::new(channel).events().collect().await;

        assert_eq!(events.len(), 2);
    }
}
