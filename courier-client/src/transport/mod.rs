//! Transport abstraction for the live channel.
//!
//! This module provides a pluggable transport layer that abstracts the
//! persistent connection to the messaging backend (WebSocket, mock for
//! testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` performs the handshake against a full channel URL
//! - `send()` writes one text frame
//! - `recv()` waits for the next text frame
//! - `close()` gracefully terminates
//!
//! All methods take `&self` so one task can block in `recv()` while another
//! sends.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.connect("ws://127.0.0.1:8000/ws/chat/?token=abc").await?;
//! transport.send(r#"{"message":"hi","receiver_id":2}"#).await?;
//! let frame = transport.recv().await?;
//! ```

mod mock;
mod websocket;

pub use mock::MockTransport;
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Backend refused the handshake with an HTTP status.
    #[error("handshake rejected with status {status}")]
    Rejected {
        /// HTTP status of the refusal.
        status: u16,
    },

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Connection timeout.
    #[error("connection timeout")]
    Timeout,
}

impl TransportError {
    /// Whether the backend refused the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status: 401 | 403 })
    }
}

/// Transport trait for the live channel's text frames.
///
/// Implementations handle the underlying connection mechanism
/// (WebSocket, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the channel URL, credential included.
    async fn connect(&self, url: &str) -> Result<(), TransportError>;

    /// Send one text frame.
    async fn send(&self, frame: &str) -> Result<(), TransportError>;

    /// Receive the next text frame.
    ///
    /// Waits until a frame is available or the connection closes.
    async fn recv(&self) -> Result<String, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
