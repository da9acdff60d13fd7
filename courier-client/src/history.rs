//! History loading.
//!
//! One background fetch per peer selection. Results are posted to the
//! dispatcher queue tagged with the selection's [`FetchTicket`]; the selector
//! never waits on them, and a result for an outdated ticket is discarded by
//! the reconciler.

use std::sync::Arc;

use courier_core::FetchTicket;
use courier_types::Peer;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::HistorySource;
use crate::client::Inbound;
use crate::session::SessionContext;

/// Spawns history fetches for the active session.
pub struct HistoryLoader<H: HistorySource + 'static> {
    source: Arc<H>,
    session: SessionContext,
    inbound: UnboundedSender<Inbound>,
}

impl<H: HistorySource + 'static> HistoryLoader<H> {
    /// Create a loader posting results to `inbound`.
    pub fn new(source: Arc<H>, session: SessionContext, inbound: UnboundedSender<Inbound>) -> Self {
        Self {
            source,
            session,
            inbound,
        }
    }

    /// Start fetching `peer`'s history in the background.
    pub fn spawn(&self, ticket: FetchTicket, peer: Peer) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let session = self.session.clone();
        let inbound = self.inbound.clone();

        tokio::spawn(async move {
            debug!(peer = %peer.id, generation = ticket.generation(), "fetching history");
            let result = source.fetch_history(&session, &peer).await;
            // A closed queue means the client was shut down
            let _ = inbound.send(Inbound::History { ticket, result });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;
    use courier_core::Reconciler;
    use courier_types::{Credential, Message, UserId};
    use chrono::Utc;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn posts_result_with_ticket() {
        let api = Arc::new(MockApi::new());
        let bob = Peer::new(UserId::new(2), "bob");
        api.set_history(
            bob.id,
            vec![Message::new("bob", bob.id, Some("hi".into()), None, Utc::now()).unwrap()],
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let loader = HistoryLoader::new(
            api,
            SessionContext::new(Credential::new("t"), "alice"),
            tx,
        );
        let ticket = Reconciler::new("alice").select_peer(bob.clone());

        loader.spawn(ticket, bob).await.unwrap();

        match rx.recv().await {
            Some(Inbound::History { ticket: got, result }) => {
                assert_eq!(got, ticket);
                assert_eq!(result.unwrap().len(), 1);
            }
            other => panic!("Expected history result, got {:?}", other),
        }
    }
}
