//! Print the stored conversation with one peer.

use anyhow::Result;
use courier_client::{HistorySource, HttpApi, SessionContext};
use courier_core::{Conversation, FailureKind, HistoryStatus, Reconciler};
use courier_types::Peer;

use crate::commands::peers;
use crate::config::{Settings, StoredSession};
use crate::render;

/// Run the history command.
pub async fn run(settings: &Settings, peer_arg: &str) -> Result<()> {
    let stored = StoredSession::load(&settings.data_dir).await?;
    let api = HttpApi::new(&settings.config_for(&stored))?;
    let session = stored.context();

    let peer = peers::resolve(&api, session.credential(), peer_arg).await?;
    let conversation = load(&api, &session, peer).await;

    if let HistoryStatus::Failed {
        kind: FailureKind::Unauthorized,
        ..
    } = conversation.status()
    {
        anyhow::bail!("Session expired. Run 'courier login <username>' again.");
    }

    if let Some(peer) = conversation.peer() {
        println!("=== {} ===", peer.display_name);
    }
    render::print_conversation(&conversation);
    Ok(())
}

/// Fetch and order one peer's history.
///
/// A failed fetch is recorded on the returned conversation rather than
/// returned as an error.
pub async fn load<H: HistorySource + ?Sized>(
    source: &H,
    session: &SessionContext,
    peer: Peer,
) -> Conversation {
    let mut reconciler = Reconciler::new(session.username());
    let ticket = reconciler.select_peer(peer.clone());

    match source.fetch_history(session, &peer).await {
        Ok(messages) => {
            reconciler.apply_history(ticket, messages);
        }
        Err(e) => {
            reconciler.fail_history(ticket, e.failure_kind(), e.to_string());
        }
    }
    reconciler.conversation().clone()
}
