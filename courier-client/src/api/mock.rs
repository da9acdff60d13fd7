//! Mock backend for testing.
//!
//! Holds accounts, a peer list, per-peer histories and uploaded files in
//! shared state. History fetches can be gated so a test controls exactly when
//! (and in which order) they resolve.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use courier_core::Attachment;
use courier_types::{AttachmentRef, Credential, Message, Peer, UserId};
use tokio::sync::Semaphore;

use super::{ApiError, AttachmentUploader, AuthService, Directory, HistorySource};
use crate::session::SessionContext;

/// In-memory stand-in for the messaging backend.
#[derive(Debug, Default, Clone)]
pub struct MockApi {
    inner: Arc<Mutex<MockApiInner>>,
}

#[derive(Debug, Default)]
struct MockApiInner {
    accounts: HashMap<String, String>,
    peers: Vec<Peer>,
    histories: HashMap<UserId, Vec<Message>>,
    gates: HashMap<UserId, Arc<Semaphore>>,
    history_requests: Vec<UserId>,
    uploads: Vec<String>,
    fail_next_history: Option<ApiError>,
    fail_next_upload: Option<ApiError>,
    fail_next_peers: Option<ApiError>,
}

impl MockApi {
    /// Create an empty mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockApiInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account that can log in.
    pub fn add_account(&self, username: &str, password: &str) {
        self.inner()
            .accounts
            .insert(username.to_string(), password.to_string());
    }

    /// Add a peer to the directory.
    pub fn add_peer(&self, peer: Peer) {
        self.inner().peers.push(peer);
    }

    /// Set the stored history for a peer, in backend order.
    pub fn set_history(&self, peer_id: UserId, messages: Vec<Message>) {
        self.inner().histories.insert(peer_id, messages);
    }

    /// Hold fetches for `peer_id` until [`MockApi::release_history`].
    pub fn gate_history(&self, peer_id: UserId) {
        self.inner()
            .gates
            .insert(peer_id, Arc::new(Semaphore::new(0)));
    }

    /// Let one held fetch for `peer_id` complete.
    ///
    /// Releases are counted, so one issued before the fetch arrives still
    /// lets it through.
    pub fn release_history(&self, peer_id: UserId) {
        if let Some(gate) = self.inner().gates.get(&peer_id) {
            gate.add_permits(1);
        }
    }

    /// Peers whose history was requested, in request order.
    pub fn history_requests(&self) -> Vec<UserId> {
        self.inner().history_requests.clone()
    }

    /// File names of accepted uploads.
    pub fn uploads(&self) -> Vec<String> {
        self.inner().uploads.clone()
    }

    /// Cause the next history fetch to fail.
    pub fn fail_next_history(&self, error: ApiError) {
        self.inner().fail_next_history = Some(error);
    }

    /// Cause the next upload to fail.
    pub fn fail_next_upload(&self, error: ApiError) {
        self.inner().fail_next_upload = Some(error);
    }

    /// Cause the next directory listing to fail.
    pub fn fail_next_peers(&self, error: ApiError) {
        self.inner().fail_next_peers = Some(error);
    }

    fn token_for(username: &str) -> Credential {
        Credential::new(format!("token-{}", username))
    }
}

#[async_trait]
impl AuthService for MockApi {
    async fn register(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        let mut inner = self.inner();
        if inner.accounts.contains_key(username) {
            return Err(ApiError::Rejected("Username already exists".into()));
        }
        inner
            .accounts
            .insert(username.to_string(), password.to_string());
        Ok(Self::token_for(username))
    }

    async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        let inner = self.inner();
        match inner.accounts.get(username) {
            Some(stored) if stored == password => Ok(Self::token_for(username)),
            _ => Err(ApiError::Rejected(
                "Unable to log in with provided credentials.".into(),
            )),
        }
    }
}

#[async_trait]
impl Directory for MockApi {
    async fn peers(&self, credential: &Credential) -> Result<Vec<Peer>, ApiError> {
        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_peers.take() {
            return Err(error);
        }
        if credential.is_empty() {
            return Err(ApiError::Unauthorized);
        }
        Ok(inner.peers.clone())
    }
}

#[async_trait]
impl HistorySource for MockApi {
    async fn fetch_history(
        &self,
        session: &SessionContext,
        peer: &Peer,
    ) -> Result<Vec<Message>, ApiError> {
        let gate = {
            let mut inner = self.inner();
            inner.history_requests.push(peer.id);
            inner.gates.get(&peer.id).cloned()
        };
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_history.take() {
            return Err(error);
        }
        if session.credential().is_empty() {
            return Err(ApiError::Unauthorized);
        }
        Ok(inner.histories.get(&peer.id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AttachmentUploader for MockApi {
    async fn upload(
        &self,
        credential: &Credential,
        attachment: &Attachment,
    ) -> Result<AttachmentRef, ApiError> {
        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_upload.take() {
            return Err(error);
        }
        if credential.is_empty() {
            return Err(ApiError::Unauthorized);
        }
        inner.uploads.push(attachment.file_name.clone());
        Ok(AttachmentRef::new(format!(
            "/media/photos/{}",
            attachment.file_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session() -> SessionContext {
        SessionContext::new(Credential::new("token-alice"), "alice")
    }

    #[tokio::test]
    async fn register_then_login() {
        let api = MockApi::new();

        let issued = api.register("alice", "pw").await.unwrap();
        let again = api.login("alice", "pw").await.unwrap();

        assert_eq!(issued, again);
        assert!(matches!(
            api.register("alice", "other").await,
            Err(ApiError::Rejected(m)) if m == "Username already exists"
        ));
        assert!(matches!(
            api.login("alice", "wrong").await,
            Err(ApiError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn gated_history_waits_for_release() {
        let api = MockApi::new();
        let bob = Peer::new(UserId::new(2), "bob");
        api.gate_history(bob.id);

        let fetcher = api.clone();
        let peer = bob.clone();
        let pending =
            tokio::spawn(async move { fetcher.fetch_history(&session(), &peer).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!pending.is_finished());
        assert_eq!(api.history_requests(), vec![bob.id]);

        api.release_history(bob.id);
        assert!(pending.await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn forced_failures_are_one_shot() {
        let api = MockApi::new();
        let bob = Peer::new(UserId::new(2), "bob");
        api.fail_next_history(ApiError::Unreachable("down".into()));

        assert!(api.fetch_history(&session(), &bob).await.is_err());
        assert!(api.fetch_history(&session(), &bob).await.is_ok());
    }

    #[tokio::test]
    async fn upload_returns_media_url() {
        let api = MockApi::new();
        let attachment = Attachment::new("cat.png", "image/png", vec![1, 2, 3]);

        let reference = api
            .upload(&Credential::new("t"), &attachment)
            .await
            .unwrap();

        assert_eq!(reference.as_str(), "/media/photos/cat.png");
        assert_eq!(api.uploads(), vec!["cat.png"]);
    }
}
