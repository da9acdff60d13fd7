//! Live channel state machine for Courier.
//!
//! This module provides a pure, side-effect-free state machine for the
//! lifecycle of the persistent connection. The state machine takes events as
//! input and produces a new state plus a list of actions to execute.
//!
//! There is no reconnect state: an unexpected disconnect lands in
//! [`ChannelState::Closed`] and reconnecting is an explicit `OpenRequested`.

/// Live channel state - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No connection.
    #[default]
    Closed,
    /// Handshake in progress.
    Connecting,
    /// Accepted by the backend; sends are allowed.
    Open,
    /// Client-initiated shutdown in progress.
    Closing,
}

impl ChannelState {
    /// Create a new state machine in the Closed state.
    pub fn new() -> Self {
        Self::Closed
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (courier-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Closed
            (Self::Closed, Event::OpenRequested) => (Self::Connecting, vec![Action::Connect]),
            (Self::Closed, Event::CloseRequested) => (Self::Closed, vec![]),

            // From Connecting
            (Self::Connecting, Event::Accepted) => {
                (Self::Open, vec![Action::Emit(ChannelNotice::Opened)])
            }
            (Self::Connecting, Event::Rejected { reason }) => (
                Self::Closed,
                vec![Action::Emit(ChannelNotice::Failed { reason })],
            ),
            (Self::Connecting, Event::CloseRequested) => {
                (Self::Closing, vec![Action::Disconnect])
            }

            // From Open
            (Self::Open, Event::FrameReceived) => (Self::Open, vec![Action::Deliver]),
            (Self::Open, Event::ConnectionLost { reason }) => (
                Self::Closed,
                vec![Action::Emit(ChannelNotice::Closed { reason })],
            ),
            (Self::Open, Event::CloseRequested) => (Self::Closing, vec![Action::Disconnect]),

            // From Closing
            (Self::Closing, Event::CloseCompleted) => (
                Self::Closed,
                vec![Action::Emit(ChannelNotice::Closed {
                    reason: "closed by client".into(),
                })],
            ),
            (Self::Closing, Event::ConnectionLost { .. }) => (Self::Closed, vec![]),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if sends are currently allowed.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Check if the channel is fully closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Events that can occur in the channel lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Caller asked to open (or re-open) the channel.
    OpenRequested,
    /// Backend accepted the handshake.
    Accepted,
    /// Backend refused the handshake or the network failed during it.
    Rejected {
        /// Why the handshake failed.
        reason: String,
    },
    /// A frame arrived.
    FrameReceived,
    /// Backend-initiated close or network failure.
    ConnectionLost {
        /// Reason for disconnection.
        reason: String,
    },
    /// Caller asked to close the channel.
    CloseRequested,
    /// Transport finished closing.
    CloseCompleted,
}

/// Actions to be executed by courier-client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start the transport handshake.
    Connect,
    /// Close the transport.
    Disconnect,
    /// Decode and deliver the received frame.
    Deliver,
    /// Report a lifecycle change.
    Emit(ChannelNotice),
}

/// Lifecycle changes reported to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelNotice {
    /// The channel is open.
    Opened,
    /// Opening failed.
    Failed {
        /// Why the handshake failed.
        reason: String,
    },
    /// The channel closed.
    Closed {
        /// Reason for the close.
        reason: String,
    },
}
