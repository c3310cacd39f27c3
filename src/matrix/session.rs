//! On-disk Matrix session.
//!
//! The data directory holds a `session` JSON file with the login session and
//! the last sync token, next to the `sqlite` store used by the Matrix SDK.

use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use matrix_sdk::authentication::matrix::MatrixSession;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Content of the session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    /// Login session of the bot account
    user_session: MatrixSession,
    /// Latest sync token, to resume syncing after a restart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sync_token: Option<String>,
}

/// Session file and SQLite store location of the bot account.
#[derive(Clone)]
pub struct SessionStore {
    /// Session loaded at startup, if any
    stored: Option<StoredSession>,
    /// `<data>/session`
    session_path: PathBuf,
    /// `<data>/sqlite`
    sqlite_path: PathBuf,
}

impl SessionStore {
    /// Opens the session stored in `dir`.
    ///
    /// A missing or unreadable session file means the bot has to log in
    /// again; it is not an error.
    pub async fn open(dir: &Path) -> Self {
        let session_path = dir.join("session");
        let sqlite_path = dir.join("sqlite");
        debug!("reading session at {}", session_path.display());

        let stored = match read_session(&session_path).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("ignoring unreadable session file: {:?}", e);
                None
            }
        };

        SessionStore {
            stored,
            session_path,
            sqlite_path,
        }
    }

    /// Path of the SQLite store, holding encryption keys and room state.
    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    /// Login session found at startup.
    pub fn user_session(&self) -> Option<&MatrixSession> {
        self.stored.as_ref().map(|s| &s.user_session)
    }

    /// Sync token found at startup.
    pub fn sync_token(&self) -> Option<String> {
        self.stored.as_ref().and_then(|s| s.sync_token.clone())
    }

    /// Writes a fresh login session, without sync token.
    pub async fn save_user_session(&self, user_session: &MatrixSession) -> anyhow::Result<()> {
        trace!("persist user session");

        let stored = StoredSession {
            user_session: user_session.clone(),
            sync_token: None,
        };
        fs::write(&self.session_path, serde_json::to_string(&stored)?).await?;

        Ok(())
    }

    /// Updates the sync token in the session file.
    ///
    /// # Errors
    ///
    /// Fails if no login session was written before.
    pub async fn save_sync_token(&self, sync_token: &str) -> anyhow::Result<()> {
        trace!("persist sync token {}", sync_token);

        let Some(mut stored) = read_session(&self.session_path).await? else {
            anyhow::bail!("no session to attach the sync token to");
        };
        stored.sync_token = Some(sync_token.to_owned());
        fs::write(&self.session_path, serde_json::to_string(&stored)?).await?;

        Ok(())
    }
}

async fn read_session(path: &Path) -> anyhow::Result<Option<StoredSession>> {
    if !fs::try_exists(path).await? {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    Ok(Some(serde_json::from_str(&content)?))
}
