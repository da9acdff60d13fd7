//! Interactive conversation with one peer.
//!
//! Lines typed on stdin are sent as messages; inbound updates are printed as
//! they arrive. Input and updates are multiplexed with `tokio::select!`, and
//! each result is applied after the select so the client is only ever
//! borrowed by one branch at a time.

use anyhow::{Context, Result};
use courier_client::{
    load_attachment, AttachmentUploader, ChatClient, ClientError, HistorySource, HttpApi,
    Transport, Update, WebSocketTransport,
};
use courier_types::Peer;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::commands::peers;
use crate::config::{Settings, StoredSession};
use crate::render;

/// Run the chat command.
pub async fn run(settings: &Settings, peer_arg: &str) -> Result<()> {
    let (mut client, peer) = open(settings, peer_arg).await?;

    println!("Chatting with {}. /photo <path> sends an image, /quit leaves.", peer.display_name);
    let result = converse(&mut client, BufReader::new(tokio::io::stdin())).await;

    client.shutdown().await?;
    result
}

/// Sign in from the stored session, connect, and select `peer_arg`.
pub async fn open(
    settings: &Settings,
    peer_arg: &str,
) -> Result<(ChatClient<HttpApi, WebSocketTransport>, Peer)> {
    let stored = StoredSession::load(&settings.data_dir).await?;
    let config = settings.config_for(&stored);
    let api = Arc::new(HttpApi::new(&config)?);
    let session = stored.context();

    let peer = peers::resolve(api.as_ref(), session.credential(), peer_arg).await?;

    let transport = WebSocketTransport::new(config.connect_timeout());
    let mut client = ChatClient::new(session, api, transport, &config)?;
    client
        .connect()
        .await
        .context("Failed to open live connection")?;
    client.select_peer(peer.clone());
    debug!(peer = %peer.id, "conversation opened");

    Ok((client, peer))
}

enum Step {
    Input(Option<String>),
    Update(Option<Update>),
}

/// Drive the conversation until `/quit` or end of input.
pub async fn converse<A, T, R>(client: &mut ChatClient<A, T>, input: R) -> Result<()>
where
    A: HistorySource + AttachmentUploader + 'static,
    T: Transport + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        let step = tokio::select! {
            line = lines.next_line() => Step::Input(line.context("Failed to read input")?),
            update = client.next_update() => Step::Update(update),
        };

        match step {
            Step::Input(None) => break,
            Step::Input(Some(line)) => {
                if !handle_line(client, &line).await {
                    break;
                }
            }
            Step::Update(None) => break,
            Step::Update(Some(Update::HistoryLoaded { .. })) => {
                render::print_conversation(client.conversation());
            }
            Step::Update(Some(update)) => {
                if let Some(text) = render::update_line(&update) {
                    println!("{}", text);
                }
            }
        }
    }

    Ok(())
}

/// Act on one input line. Returns false when the user asked to leave.
async fn handle_line<A, T>(client: &mut ChatClient<A, T>, line: &str) -> bool
where
    A: HistorySource + AttachmentUploader + 'static,
    T: Transport + 'static,
{
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    if line.is_empty() {
        return true;
    }

    let result = match line.split_once(' ') {
        _ if line == "/quit" => return false,
        _ if line == "/reconnect" => client.reconnect().await.map(|()| None),
        Some(("/photo", path)) => send_photo(client, Path::new(path.trim())).await,
        _ => send_text(client, line).await,
    };

    match result {
        Ok(Some(line)) => println!("{}", line),
        Ok(None) => println!("* Reconnected."),
        Err(e) => {
            eprintln!("! {}", e);
            // Every line is a complete message; do not carry it over
            if let Err(e) = client.set_body("").and_then(|()| client.detach()) {
                debug!(error = %e, "could not reset draft");
            }
        }
    }
    true
}

async fn send_text<A, T>(
    client: &mut ChatClient<A, T>,
    text: &str,
) -> Result<Option<String>, ClientError>
where
    A: HistorySource + AttachmentUploader + 'static,
    T: Transport + 'static,
{
    client.set_body(text)?;
    let sent = client.submit().await?;
    Ok(Some(render::message_line(&sent, &chrono::Local::now())))
}

async fn send_photo<A, T>(
    client: &mut ChatClient<A, T>,
    path: &Path,
) -> Result<Option<String>, ClientError>
where
    A: HistorySource + AttachmentUploader + 'static,
    T: Transport + 'static,
{
    let attachment = load_attachment(path).await?;
    client.attach(attachment)?;
    let sent = client.submit().await?;
    Ok(Some(render::message_line(&sent, &chrono::Local::now())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_client::{ClientConfig, MockApi, MockTransport, SessionContext};
    use courier_types::{Credential, UserId};

    async fn connected() -> (ChatClient<MockApi, MockTransport>, Arc<MockApi>, MockTransport) {
        let api = Arc::new(MockApi::new());
        let transport = MockTransport::new();
        let session = SessionContext::new(Credential::new("token-alice"), "alice");
        let mut client = ChatClient::new(
            session,
            Arc::clone(&api),
            transport.clone(),
            &ClientConfig::default(),
        )
        .unwrap();
        client.connect().await.unwrap();
        client.select_peer(Peer::new(UserId::new(2), "bob"));
        (client, api, transport)
    }

    #[tokio::test]
    async fn typed_lines_are_sent_until_quit() {
        let (mut client, _api, transport) = connected().await;

        converse(&mut client, &b"hello\n\n/quit\nnever sent\n"[..])
            .await
            .unwrap();

        let sent = transport.sent_frames();
        assert_eq!(sent.len(), 1);
        let frame: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(frame["message"], "hello");
        assert_eq!(frame["receiver_id"], 2);
    }

    #[tokio::test]
    async fn end_of_input_leaves_cleanly() {
        let (mut client, _api, transport) = connected().await;

        converse(&mut client, &b""[..]).await.unwrap();

        assert!(transport.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn photo_command_uploads_then_sends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let (mut client, api, transport) = connected().await;

        let input = format!("/photo {}\n/quit\n", path.display());
        converse(&mut client, input.as_bytes()).await.unwrap();

        assert_eq!(api.uploads(), vec!["cat.png"]);
        let frame: serde_json::Value =
            serde_json::from_str(&transport.last_sent().unwrap()).unwrap();
        assert_eq!(frame["photo"], "photos/cat.png");
    }

    #[tokio::test]
    async fn failed_send_clears_the_draft() {
        let (mut client, _api, transport) = connected().await;
        transport.close_remote();
        while !matches!(
            client.next_update().await,
            Some(Update::ChannelClosed { .. })
        ) {}

        assert!(handle_line(&mut client, "lost words").await);

        assert!(client.draft().is_empty());
        assert!(transport.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn failed_photo_does_not_stick_to_next_message() {
        let (mut client, api, transport) = connected().await;

        converse(&mut client, &b"/photo /no/such/file.png\nplain text\n/quit\n"[..])
            .await
            .unwrap();

        assert!(api.uploads().is_empty());
        let frame: serde_json::Value =
            serde_json::from_str(&transport.last_sent().unwrap()).unwrap();
        assert_eq!(frame["message"], "plain text");
        assert!(frame.get("photo").is_none());
    }
}
