//! Backend REST collaborators.
//!
//! Each external service the client consumes sits behind its own trait so
//! tests can swap in [`MockApi`]:
//! - [`AuthService`] - exchanges username/password for a credential
//! - [`Directory`] - lists addressable peers
//! - [`HistorySource`] - fetches one peer's stored messages
//! - [`AttachmentUploader`] - stores a binary attachment
//!
//! [`HttpApi`] implements all four against the messaging backend.

mod http;
mod mock;

pub use http::HttpApi;
pub use mock::MockApi;

use async_trait::async_trait;
use courier_core::{Attachment, FailureKind};
use courier_types::{AttachmentRef, Credential, Message, Peer};
use thiserror::Error;

use crate::session::SessionContext;

/// REST errors, classified by what the caller can do about them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Credential invalid or expired.
    #[error("unauthorized")]
    Unauthorized,

    /// Attachment exceeds the backend limit.
    #[error("payload too large")]
    PayloadTooLarge,

    /// Backend refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Backend unavailable or timed out.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Response body could not be understood.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Category recorded on a timeline whose history fetch failed.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Unauthorized => FailureKind::Unauthorized,
            Self::Unreachable(_) => FailureKind::Unreachable,
            _ => FailureKind::Other,
        }
    }
}

/// Credential issuance.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and return its credential.
    async fn register(&self, username: &str, password: &str) -> Result<Credential, ApiError>;

    /// Exchange username/password for a credential.
    async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError>;
}

/// Peer listing.
#[async_trait]
pub trait Directory: Send + Sync {
    /// All peers the session user can address.
    async fn peers(&self, credential: &Credential) -> Result<Vec<Peer>, ApiError>;
}

/// Stored conversation history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Messages exchanged between the session user and `peer`.
    ///
    /// Results are confirmed messages attributed to `peer`'s timeline, in
    /// backend order.
    async fn fetch_history(
        &self,
        session: &SessionContext,
        peer: &Peer,
    ) -> Result<Vec<Message>, ApiError>;
}

/// Attachment storage.
#[async_trait]
pub trait AttachmentUploader: Send + Sync {
    /// Store `attachment` and return the reference to embed in a chat frame.
    async fn upload(
        &self,
        credential: &Credential,
        attachment: &Attachment,
    ) -> Result<AttachmentRef, ApiError>;
}
