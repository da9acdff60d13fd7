//! WebSocket transport backed by tokio-tungstenite.
//!
//! The stream is split after the handshake: the write half and the read half
//! sit behind separate locks so a reader blocked in `recv()` never holds up a
//! `send()` or `close()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live channel transport over `ws://` or `wss://`.
pub struct WebSocketTransport {
    connect_timeout: Duration,
    sink: Mutex<Option<SplitSink<WsStream, Message>>>,
    stream: Mutex<Option<SplitStream<WsStream>>>,
    connected: AtomicBool,
}

impl WebSocketTransport {
    /// Create a transport; nothing is dialed until `connect()`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            sink: Mutex::new(None),
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("connect_timeout", &self.connect_timeout)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<(), TransportError> {
        let (ws, _response) = match tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
        {
            Err(_) => return Err(TransportError::Timeout),
            Ok(Err(tungstenite::Error::Http(response))) => {
                return Err(TransportError::Rejected {
                    status: response.status().as_u16(),
                })
            }
            Ok(Err(e)) => return Err(TransportError::ConnectionFailed(e.to_string())),
            Ok(Ok(pair)) => pair,
        };

        let (sink, stream) = ws.split();
        *self.sink.lock().await = Some(sink);
        *self.stream.lock().await = Some(stream);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;

        sink.send(Message::Text(frame.into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&self) -> Result<String, TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Binary(bytes))) => {
                    return String::from_utf8(bytes.to_vec())
                        .map_err(|e| TransportError::ReceiveFailed(e.to_string()));
                }
                Some(Ok(Message::Close(_))) | None => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(TransportError::ConnectionClosed);
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut sink) = self.sink.lock().await.take() {
            // The peer may already be gone; a failed close frame changes nothing
            let _ = sink.close().await;
        }
        // A reader still parked in recv() keeps its half until the close
        // handshake ends its stream
        if let Ok(mut stream) = self.stream.try_lock() {
            stream.take();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_before_connect_fails() {
        let transport = WebSocketTransport::new(Duration::from_secs(1));

        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send("hi").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.recv().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn close_without_connect_is_noop() {
        let transport = WebSocketTransport::new(Duration::from_secs(1));
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn refused_connection_is_reported() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = WebSocketTransport::new(Duration::from_secs(2));
        let result = transport
            .connect(&format!("ws://127.0.0.1:{}/ws/chat/", port))
            .await;

        assert!(matches!(
            result,
            Err(TransportError::ConnectionFailed(_)) | Err(TransportError::Timeout)
        ));
        assert!(!transport.is_connected());
    }
}
