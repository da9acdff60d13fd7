//! Configuration management for the courier CLI.

use anyhow::{Context, Result};
use courier_client::{ClientConfig, SessionContext};
use courier_types::Credential;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

const SESSION_FILE: &str = "session.json";
const CONFIG_FILE: &str = "config.toml";

/// Signed-in session stored locally.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredSession {
    /// Username the credential was issued to.
    pub username: String,
    /// Bearer credential, zeroized on drop.
    pub token: Credential,
    /// Backend the credential belongs to.
    pub backend: String,
    /// When the session was created (Unix seconds).
    pub created_at: i64,
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .field("backend", &self.backend)
            .finish()
    }
}

impl StoredSession {
    /// Capture a fresh session for `backend`.
    pub fn new(session: &SessionContext, backend: &str) -> Self {
        Self {
            username: session.username().to_string(),
            token: session.credential().clone(),
            backend: backend.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Rebuild the session context for the client library.
    pub fn context(&self) -> SessionContext {
        SessionContext::new(self.token.clone(), self.username.clone())
    }

    /// Load the stored session from a directory.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SESSION_FILE);
        let contents = Zeroizing::new(
            tokio::fs::read_to_string(&path)
                .await
                .context("Not logged in. Run 'courier login <username>' first.")?,
        );
        serde_json::from_str(&contents).context("Invalid stored session")
    }

    /// Save the session to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(SESSION_FILE);
        let contents = Zeroizing::new(serde_json::to_string_pretty(self)?);
        tokio::fs::write(&path, contents.as_bytes())
            .await
            .context("Failed to save session")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Delete the stored session. Returns whether one existed.
    pub async fn remove(data_dir: &Path) -> Result<bool> {
        let path = data_dir.join(SESSION_FILE);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context("Failed to delete session"),
        }
    }
}

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where the session is kept.
    pub data_dir: PathBuf,
    /// Client configuration after file and flag overrides.
    pub config: ClientConfig,
    /// Whether `--backend` was given explicitly.
    pub backend_overridden: bool,
}

impl Settings {
    /// Load settings from an explicit config file, or `<data-dir>/config.toml`
    /// when present, then apply the `--backend` override.
    pub fn load(
        data_dir: PathBuf,
        config_path: Option<&Path>,
        backend: Option<String>,
    ) -> Result<Self> {
        let default_path = data_dir.join(CONFIG_FILE);
        let config = match config_path {
            Some(path) => ClientConfig::from_file(path)?,
            None if default_path.exists() => ClientConfig::from_file(&default_path)?,
            None => ClientConfig::default(),
        };

        let backend_overridden = backend.is_some();
        let config = match backend {
            Some(url) => config.with_base_url(url),
            None => config,
        };
        config.base_url()?;

        Ok(Self {
            data_dir,
            config,
            backend_overridden,
        })
    }

    /// Configuration to use with `session`: the backend it was issued by,
    /// unless `--backend` says otherwise.
    pub fn config_for(&self, session: &StoredSession) -> ClientConfig {
        if self.backend_overridden {
            self.config.clone()
        } else {
            self.config.clone().with_base_url(session.backend.clone())
        }
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
