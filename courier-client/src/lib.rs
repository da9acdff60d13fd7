//! # courier-client
//!
//! Client library for the Courier direct-messaging sync engine.
//!
//! This is the library applications use to chat: it keeps one live
//! connection per session, loads history on peer selection, and sequences
//! sends so an attachment is uploaded before the frame referencing it.
//!
//! ## Features
//!
//! - **Single dispatcher**: background work posts to one queue, applied in order
//! - **Stale-fetch discard**: history for an outdated selection never lands
//! - **Optimistic sends**: echoes confirm the pending entry instead of duplicating it
//! - **Transport abstraction**: pluggable live channel (WebSocket, mock)
//! - **Pure state machines**: lifecycle and reconciliation live in courier-core
//!
//! ## Example
//!
//! ```ignore
//! use courier_client::{auth, ChatClient, ClientConfig, HttpApi, WebSocketTransport};
//!
//! let config = ClientConfig::default();
//! let api = Arc::new(HttpApi::new(&config)?);
//! let session = auth::login(api.as_ref(), "alice", "secret").await?;
//! let transport = WebSocketTransport::new(config.connect_timeout());
//!
//! let mut client = ChatClient::new(session, api, transport, &config)?;
//! client.connect().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod attachment;
pub mod auth;
pub mod channel;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod history;
pub mod session;
pub mod transport;

pub use api::{ApiError, AttachmentUploader, AuthService, Directory, HistorySource, HttpApi, MockApi};
pub use attachment::load_attachment;
pub use channel::LiveChannel;
pub use client::{ChatClient, Inbound, Update};
pub use config::{BackendConfig, ClientConfig, ConfigError, LimitsConfig};
pub use coordinator::SendCoordinator;
pub use error::ClientError;
pub use history::HistoryLoader;
pub use session::SessionContext;
pub use transport::{MockTransport, Transport, TransportError, WebSocketTransport};
