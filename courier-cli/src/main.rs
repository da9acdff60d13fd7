//! # courier
//!
//! Terminal client for the Courier direct-messaging backend.
//!
//! ## Commands
//!
//! - `register` / `login`: Obtain a credential and store the session
//! - `logout`: Forget the stored session
//! - `status`: Show who is signed in and where
//! - `peers`: List people to talk to
//! - `history`: Print the conversation with one peer
//! - `send`: Send one message or photo
//! - `chat`: Interactive conversation
//!
//! ## Example
//!
//! ```bash
//! # Sign in against a local backend
//! courier --backend http://127.0.0.1:8000 login alice
//!
//! # See who is around
//! courier peers
//!
//! # Talk
//! courier send bob "Hello!"
//! courier send bob --photo cat.png
//! courier chat bob
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use commands::account::{self, Action};
use commands::{chat, history, peers, send, status};
use config::Settings;

/// Terminal client for the Courier direct-messaging backend.
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the stored session and default config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Client configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding config and stored session
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account and log in
    Register {
        /// Username
        username: String,

        /// Password (will prompt if not provided)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Log in to an existing account
    Login {
        /// Username
        username: String,

        /// Password (will prompt if not provided)
        #[arg(long, short)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show session status
    Status,

    /// List people to talk to
    Peers,

    /// Print the conversation with a peer
    History {
        /// Peer id or username
        peer: String,
    },

    /// Send one message
    Send {
        /// Peer id or username
        peer: String,

        /// Message text
        message: Option<String>,

        /// Image to attach
        #[arg(long)]
        photo: Option<PathBuf>,
    },

    /// Chat interactively with a peer
    Chat {
        /// Peer id or username
        peer: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir).await?;

    let settings = Settings::load(data_dir, cli.config.as_deref(), cli.backend)?;

    match cli.command {
        Commands::Register { username, password } => {
            account::run(&settings, Action::Register, &username, password).await?;
        }
        Commands::Login { username, password } => {
            account::run(&settings, Action::Login, &username, password).await?;
        }
        Commands::Logout => {
            account::logout(&settings.data_dir).await?;
        }
        Commands::Status => {
            status::run(&settings).await?;
        }
        Commands::Peers => {
            peers::run(&settings).await?;
        }
        Commands::History { peer } => {
            history::run(&settings, &peer).await?;
        }
        Commands::Send {
            peer,
            message,
            photo,
        } => {
            send::run(&settings, &peer, message, photo).await?;
        }
        Commands::Chat { peer } => {
            chat::run(&settings, &peer).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for courier.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("chat", "courier", "courier")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
