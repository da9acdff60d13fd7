//! Mock transport for testing.
//!
//! Allows queueing inbound frames and capturing sent frames for verification.
//! Unlike a real socket it never goes away on its own: `recv()` waits until a
//! frame is queued or the connection is closed from either side.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the channel owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    wake: Arc<Notify>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connect_count: usize,
    connected_url: Option<String>,
    sent_frames: Vec<String>,
    receive_queue: VecDeque<String>,
    remote_closed: bool,
    fail_next_connect: Option<TransportError>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a frame to be returned by a `recv()` call.
    pub fn queue_frame(&self, frame: impl Into<String>) {
        self.inner().receive_queue.push_back(frame.into());
        self.wake.notify_waiters();
    }

    /// Simulate a backend-initiated close once queued frames are drained.
    pub fn close_remote(&self) {
        self.inner().remote_closed = true;
        self.wake.notify_waiters();
    }

    /// Get all frames that were sent.
    pub fn sent_frames(&self) -> Vec<String> {
        self.inner().sent_frames.clone()
    }

    /// Get the last frame that was sent.
    pub fn last_sent(&self) -> Option<String> {
        self.inner().sent_frames.last().cloned()
    }

    /// Get the URL that was connected to.
    pub fn connected_url(&self) -> Option<String> {
        self.inner().connected_url.clone()
    }

    /// Number of successful handshakes.
    pub fn connect_count(&self) -> usize {
        self.inner().connect_count
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: TransportError) {
        self.inner().fail_next_connect = Some(error);
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.inner().fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        self.inner().fail_next_recv = Some(error.to_string());
        self.wake.notify_waiters();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<(), TransportError> {
        let mut inner = self.inner();

        if let Some(error) = inner.fail_next_connect.take() {
            return Err(error);
        }

        inner.connected = true;
        inner.remote_closed = false;
        inner.connect_count += 1;
        inner.connected_url = Some(url.to_string());
        Ok(())
    }

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut inner = self.inner();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_frames.push(frame.to_string());
        Ok(())
    }

    async fn recv(&self) -> Result<String, TransportError> {
        loop {
            // Registered before the check so a wake between check and await
            // is not lost
            let woken = self.wake.notified();
            {
                let mut inner = self.inner();

                if let Some(error) = inner.fail_next_recv.take() {
                    return Err(TransportError::ReceiveFailed(error));
                }
                if !inner.connected {
                    return Err(TransportError::ConnectionClosed);
                }
                if let Some(frame) = inner.receive_queue.pop_front() {
                    return Ok(frame);
                }
                if inner.remote_closed {
                    inner.connected = false;
                    return Err(TransportError::ConnectionClosed);
                }
            }
            woken.await;
        }
    }

    fn is_connected(&self) -> bool {
        self.inner().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner().connected = false;
        self.wake.notify_waiters();
        Ok(())
    }
}
