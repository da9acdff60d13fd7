//! List peers and resolve peer arguments.

use anyhow::Result;
use courier_client::{Directory, HttpApi};
use courier_types::{Credential, Peer};

use crate::config::{Settings, StoredSession};

/// Run the peers command.
pub async fn run(settings: &Settings) -> Result<()> {
    let stored = StoredSession::load(&settings.data_dir).await?;
    let api = HttpApi::new(&settings.config_for(&stored))?;
    let session = stored.context();

    let peers = api.peers(session.credential()).await?;
    if peers.is_empty() {
        println!("No other users yet.");
        return Ok(());
    }

    println!("{:>6}  Username", "ID");
    for peer in peers.iter().filter(|p| p.display_name != stored.username) {
        println!("{:>6}  {}", peer.id, peer.display_name);
    }
    Ok(())
}

/// Find the peer named by `arg`, given as a numeric id or a username.
pub async fn resolve<D: Directory + ?Sized>(
    directory: &D,
    credential: &Credential,
    arg: &str,
) -> Result<Peer> {
    let peers = directory.peers(credential).await?;
    find(&peers, arg)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No such user: {}", arg))
}

fn find<'a>(peers: &'a [Peer], arg: &str) -> Option<&'a Peer> {
    if let Ok(id) = arg.parse::<u64>() {
        if let Some(peer) = peers.iter().find(|p| p.id.value() == id) {
            return Some(peer);
        }
    }
    peers.iter().find(|p| p.display_name == arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_client::{ApiError, MockApi};
    use courier_types::UserId;

    fn directory() -> MockApi {
        let api = MockApi::new();
        api.add_peer(Peer::new(UserId::new(2), "bob"));
        api.add_peer(Peer::new(UserId::new(3), "carol"));
        api.add_peer(Peer::new(UserId::new(4), "7"));
        api
    }

    #[tokio::test]
    async fn resolves_by_id_or_username() {
        let api = directory();
        let credential = Credential::new("t");

        assert_eq!(resolve(&api, &credential, "2").await.unwrap().display_name, "bob");
        assert_eq!(resolve(&api, &credential, "carol").await.unwrap().id, UserId::new(3));
    }

    #[tokio::test]
    async fn numeric_username_without_matching_id() {
        let api = directory();
        let peer = resolve(&api, &Credential::new("t"), "7").await.unwrap();
        assert_eq!(peer.id, UserId::new(4));
    }

    #[tokio::test]
    async fn unknown_peer_is_an_error() {
        let api = directory();
        let err = resolve(&api, &Credential::new("t"), "dave").await.unwrap_err();
        assert!(err.to_string().contains("No such user"), "got: {}", err);
    }

    #[tokio::test]
    async fn directory_failure_propagates() {
        let api = directory();
        api.fail_next_peers(ApiError::Unauthorized);
        assert!(resolve(&api, &Credential::new("t"), "bob").await.is_err());
    }
}
