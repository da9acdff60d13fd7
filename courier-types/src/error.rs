//! Error types for Courier wire decoding.

use thiserror::Error;

/// Errors that can occur while decoding frames and records.
#[derive(Debug, Error)]
pub enum FrameError {
    /// JSON could not be parsed into the expected shape
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// A `type` discriminant this client does not understand
    #[error("unknown frame type: {0}")]
    UnknownType(String),

    /// Neither body nor attachment present
    #[error("message has neither body nor attachment")]
    MissingContent,

    /// Timestamp in none of the accepted formats
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FrameError::UnknownType("typing".into());
        assert_eq!(err.to_string(), "unknown frame type: typing");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrameError>();
    }
}
