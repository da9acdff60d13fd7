//! Session context.
//!
//! The credential and identity of the signed-in user, passed explicitly to
//! every component that talks to the backend. A new login yields a new
//! context; nothing reads the session from ambient state.

use courier_types::Credential;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    credential: Credential,
    username: String,
}

impl SessionContext {
    /// Create a session context.
    pub fn new(credential: Credential, username: impl Into<String>) -> Self {
        Self {
            credential,
            username: username.into(),
        }
    }

    /// The bearer credential.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The backend username of the signed-in user.
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_does_not_leak_credential() {
        let session = SessionContext::new(Credential::new("s3cret-token"), "alice");
        let debug = format!("{:?}", session);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret-token"));
    }
}
