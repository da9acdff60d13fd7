//! Identity types for Courier.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Directory identifier of a user (the backend's integer primary key).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Create a UserId from its numeric value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

/// Server-assigned message identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Create a MessageId from its numeric value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

/// Opaque bearer credential issued by the auth service.
///
/// Immutable once issued. The backing string is wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header: `Token <credential>`.
    pub fn authorization(&self) -> String {
        format!("Token {}", self.0)
    }

    /// Whether the token is empty (never valid).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Intentionally opaque debug to avoid logging the token
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_serializes_as_number() {
        let json = serde_json::to_string(&UserId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: UserId = serde_json::from_str("7").unwrap();
        assert_eq!(back, UserId::new(7));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b");
        let debug = format!("{:?}", credential);
        assert_eq!(debug, "Credential([REDACTED])");
        assert!(!debug.contains("9944"));
    }

    #[test]
    fn credential_authorization_header() {
        let credential = Credential::new("abc123");
        assert_eq!(credential.authorization(), "Token abc123");
    }

    #[test]
    fn credential_deserializes_from_plain_string() {
        let credential: Credential = serde_json::from_str("\"tok\"").unwrap();
        assert_eq!(credential.as_str(), "tok");
        assert!(!credential.is_empty());
    }
}
