//! Show session status.

use anyhow::Result;

use crate::config::{Settings, StoredSession};

/// Run the status command.
pub async fn run(settings: &Settings) -> Result<()> {
    println!("=== courier status ===");
    println!();

    match StoredSession::load(&settings.data_dir).await {
        Ok(session) => {
            let config = settings.config_for(&session);
            println!("Session:");
            println!("  User:    {}", session.username);
            println!("  Backend: {}", config.backend.base_url);
            println!("  Since:   {}", format_age(session.created_at));
        }
        Err(_) => {
            println!("Session: NOT LOGGED IN");
            println!("  Backend: {}", settings.config.backend.base_url);
            println!();
            println!("Run 'courier login <username>' or 'courier register <username>'.");
        }
    }

    println!();
    println!("Data dir: {}", settings.data_dir.display());
    Ok(())
}

/// Describe how long ago a Unix timestamp was.
fn format_age(ts: i64) -> String {
    let diff = (chrono::Utc::now().timestamp() - ts).max(0);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}
