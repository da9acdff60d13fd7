//! Register, log in and log out.

use anyhow::{Context, Result};
use courier_client::{auth, AuthService, HttpApi};
use std::path::Path;

use crate::config::{Settings, StoredSession};

/// Which account action to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create an account, then sign in as it.
    Register,
    /// Sign in to an existing account.
    Login,
}

/// Run the register or login command against the configured backend.
pub async fn run(
    settings: &Settings,
    action: Action,
    username: &str,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let api = HttpApi::new(&settings.config)?;
    let stored = sign_in(
        &api,
        &settings.data_dir,
        &settings.config.backend.base_url,
        action,
        username,
        &password,
    )
    .await?;

    match action {
        Action::Register => println!("Account created. Logged in as {}.", stored.username),
        Action::Login => println!("Logged in as {}.", stored.username),
    }
    println!();
    println!("Next steps:");
    println!("  courier peers          list people to talk to");
    println!("  courier chat <peer>    open a conversation");

    Ok(())
}

/// Authenticate and persist the session.
pub async fn sign_in<A: AuthService + ?Sized>(
    api: &A,
    data_dir: &Path,
    backend: &str,
    action: Action,
    username: &str,
    password: &str,
) -> Result<StoredSession> {
    let session = match action {
        Action::Register => auth::register(api, username, password).await?,
        Action::Login => auth::login(api, username, password).await?,
    };

    let stored = StoredSession::new(&session, backend);
    stored.save(data_dir).await?;
    Ok(stored)
}

/// Run the logout command.
pub async fn logout(data_dir: &Path) -> Result<()> {
    if StoredSession::remove(data_dir).await? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

/// Prompt for the password with echo suppression.
fn prompt_password() -> Result<String> {
    rpassword::prompt_password("Password: ").context("Failed to read password")
}
