//! Client error taxonomy.
//!
//! Every layer keeps its own error enum; this one flattens them into the
//! categories a caller acts on.

use std::path::PathBuf;

use courier_core::ComposeError;
use courier_types::FrameError;
use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::transport::TransportError;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credential invalid or expired; re-authentication required.
    #[error("unauthorized: please log in again")]
    Unauthorized,

    /// Backend unavailable; retry later.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Send attempted while the live channel is not open.
    #[error("live channel is not open")]
    ChannelNotReady,

    /// Attachment exceeds the size limit.
    #[error("attachment too large")]
    PayloadTooLarge,

    /// Backend data could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Neither text nor attachment to send.
    #[error("message is empty")]
    EmptyMessage,

    /// No conversation selected.
    #[error("no peer selected")]
    NoPeerSelected,

    /// A send is already in flight.
    #[error("a send is already in progress")]
    Busy,

    /// Request refused by the backend or by local validation.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Login or registration refused.
    #[error("{0}")]
    AuthFailed(String),

    /// Attachment file could not be read.
    #[error("cannot read attachment {path}: {source}")]
    Attachment {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ApiError> for ClientError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => Self::Unauthorized,
            ApiError::PayloadTooLarge => Self::PayloadTooLarge,
            ApiError::Rejected(reason) => Self::Rejected(reason),
            ApiError::Unreachable(reason) => Self::Unreachable(reason),
            ApiError::Decode(reason) => Self::Decode(reason),
        }
    }
}

impl From<ComposeError> for ClientError {
    fn from(error: ComposeError) -> Self {
        match error {
            ComposeError::EmptyMessage => Self::EmptyMessage,
            ComposeError::Busy => Self::Busy,
        }
    }
}

impl From<FrameError> for ClientError {
    fn from(error: FrameError) -> Self {
        Self::Decode(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_flatten_into_taxonomy() {
        assert!(matches!(
            ClientError::from(ApiError::Unauthorized),
            ClientError::Unauthorized
        ));
        assert!(matches!(
            ClientError::from(ApiError::PayloadTooLarge),
            ClientError::PayloadTooLarge
        ));
        assert!(matches!(
            ClientError::from(ApiError::Unreachable("down".into())),
            ClientError::Unreachable(r) if r == "down"
        ));
    }

    #[test]
    fn compose_errors_flatten_into_taxonomy() {
        assert!(matches!(
            ClientError::from(ComposeError::EmptyMessage),
            ClientError::EmptyMessage
        ));
        assert!(matches!(
            ClientError::from(ComposeError::Busy),
            ClientError::Busy
        ));
    }

    #[test]
    fn auth_failure_displays_backend_text() {
        let error = ClientError::AuthFailed("Login failed".into());
        assert_eq!(error.to_string(), "Login failed");
    }

    #[test]
    fn client_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
