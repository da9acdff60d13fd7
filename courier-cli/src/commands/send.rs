//! Send a single message.

use anyhow::{Context, Result};
use courier_client::{
    load_attachment, AttachmentUploader, ChatClient, HistorySource, Transport, Update,
};
use courier_core::{Attachment, HistoryStatus};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::commands::chat;
use crate::config::Settings;
use crate::render;

/// How long to wait for the backend echo before giving up on confirmation.
const ECHO_WAIT: Duration = Duration::from_secs(5);

/// Run the send command.
pub async fn run(
    settings: &Settings,
    peer_arg: &str,
    message: Option<String>,
    photo: Option<PathBuf>,
) -> Result<()> {
    if message.is_none() && photo.is_none() {
        anyhow::bail!("Must specify a message or --photo");
    }
    let attachment = match photo {
        Some(path) => Some(load_attachment(&path).await?),
        None => None,
    };

    let (mut client, peer) = chat::open(settings, peer_arg).await?;
    let result = deliver(&mut client, message, attachment, ECHO_WAIT).await;
    client.shutdown().await?;

    if result? {
        println!("Delivered to {}.", peer.display_name);
    } else {
        println!("Sent to {} (delivery not confirmed yet).", peer.display_name);
    }
    Ok(())
}

/// Submit one message and wait up to `wait` for its echo.
///
/// The submit waits (up to `wait`) for the peer's history to settle first,
/// so the echo lands on a loaded timeline. Returns whether the backend
/// confirmed the message in time.
pub async fn deliver<A, T>(
    client: &mut ChatClient<A, T>,
    body: Option<String>,
    attachment: Option<Attachment>,
    wait: Duration,
) -> Result<bool>
where
    A: HistorySource + AttachmentUploader + 'static,
    T: Transport + 'static,
{
    settle_history(client, wait).await;

    if let Some(body) = body {
        client.set_body(body)?;
    }
    if let Some(attachment) = attachment {
        client.attach(attachment)?;
    }
    let sent = client.submit().await.context("Failed to send message")?;
    println!("{}", render::message_line(&sent, &chrono::Local::now()));

    let confirmed = tokio::time::timeout(wait, async {
        while let Some(update) = client.next_update().await {
            match update {
                Update::Confirmed(_) => return true,
                Update::ChannelClosed { .. } => return false,
                _ => {}
            }
        }
        false
    })
    .await;

    Ok(confirmed.unwrap_or(false))
}

async fn settle_history<A, T>(client: &mut ChatClient<A, T>, wait: Duration)
where
    A: HistorySource + AttachmentUploader + 'static,
    T: Transport + 'static,
{
    let settled = tokio::time::timeout(wait, async {
        while client.conversation().status() == &HistoryStatus::Loading {
            match client.next_update().await {
                None | Some(Update::ChannelClosed { .. }) => break,
                Some(_) => {}
            }
        }
    })
    .await;
    if settled.is_err() {
        debug!("history still loading, sending anyway");
    }
}
