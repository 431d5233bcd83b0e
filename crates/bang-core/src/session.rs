use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::SessionError;

/// Header carrying the session token on every authenticated request.
pub const SESSION_HEADER: &str = "BANG_SESSION";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub logged_in: bool,
}

/// Sole owner of the auth token. Readers go through [`SessionStore::current_token`]
/// or a [`watch::Receiver`] from [`SessionStore::subscribe`]; every login and
/// logout is published there and subscribers treat it as a full reload.
pub struct SessionStore {
    state: watch::Sender<Session>,
    file: Option<PathBuf>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self {
            state: watch::Sender::new(Session::default()),
            file: None,
        }
    }

    /// Opens a store persisted at `path`. A missing or unreadable file starts
    /// logged out.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = read_session(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "ignoring unreadable session file");
            Session::default()
        });

        Self {
            state: watch::Sender::new(session),
            file: Some(path),
        }
    }

    /// The token for the next request. A file-backed store re-reads its file
    /// first, so a login or logout from another process is honoured here.
    pub fn current_token(&self) -> Option<String> {
        self.sync_from_file();
        self.state.borrow().token.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.sync_from_file();
        self.state.borrow().logged_in
    }

    pub fn session(&self) -> Session {
        self.sync_from_file();
        self.state.borrow().clone()
    }

    /// Publishes the persisted session when it differs from the held one.
    /// An unreadable file keeps the held session.
    fn sync_from_file(&self) {
        let Some(path) = &self.file else {
            return;
        };
        let on_disk = match read_session(path) {
            Ok(session) => session,
            Err(err) => {
                debug!(path = %path.display(), %err, "session file unreadable, keeping session");
                return;
            }
        };

        let changed = self.state.send_if_modified(|held| {
            if *held == on_disk {
                return false;
            }
            *held = on_disk;
            true
        });
        if changed {
            info!(path = %path.display(), "session changed on disk");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// On failure the session stays as it was; there is no retry.
    pub async fn login<C: ApiClient + ?Sized>(
        &self,
        client: &C,
        username: &str,
        password: &str,
    ) -> Result<(), SessionError> {
        let token = client.authenticate(username, password).await?;
        let session = Session {
            token: Some(token),
            logged_in: true,
        };

        self.persist(&session)?;
        self.state.send_replace(session);
        info!(user = username, "logged in");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        if let Some(path) = &self.file {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(SessionError::Storage(err.to_string())),
            }
        }

        self.state.send_replace(Session::default());
        info!("logged out");
        Ok(())
    }

    fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| SessionError::Storage(err.to_string()))?;
        }
        let bytes =
            serde_json::to_vec_pretty(session).map_err(|err| SessionError::Storage(err.to_string()))?;
        fs::write(path, bytes).map_err(|err| SessionError::Storage(err.to_string()))
    }
}

// A missing file is a logged-out session, not an error.
fn read_session(path: &Path) -> Result<Session, String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Session::default()),
        Err(err) => return Err(err.to_string()),
    };
    let mut session: Session = serde_json::from_slice(&bytes).map_err(|err| err.to_string())?;
    session.logged_in = session.logged_in && session.token.is_some();
    Ok(session)
}
