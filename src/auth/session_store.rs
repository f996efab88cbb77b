// Session holder with file persistence - the silent-restore source

use crate::core::models::Session;
use std::fs;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Process-wide owner of the current session token.
///
/// Created sessions are persisted to `path` so the next run can restore
/// silently; `None` disables persistence (session lives for one process).
pub struct SessionStore {
    path: Option<PathBuf>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            current: RwLock::new(None),
        }
    }

    /// Read the persisted session, if any, and adopt it as current.
    ///
    /// A corrupt or unreadable file restores to anonymous; it never fails
    /// the caller.
    pub async fn load_persisted(&self) -> Option<Session> {
        let path = self.path.as_ref()?;

        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = ?path, error = %e, "Could not read session file");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                debug!(user_id = %session.user_id, "Restored persisted session");
                *self.current.write().await = Some(session.clone());
                Some(session)
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Malformed session file, ignoring");
                None
            }
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Adopt a new or refreshed session and persist it best-effort.
    pub async fn replace(&self, session: Session) {
        *self.current.write().await = Some(session.clone());

        if let Some(ref path) = self.path {
            let serialized = match serde_json::to_string(&session) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "Could not serialize session for persistence");
                    return;
                }
            };
            if let Err(e) = fs::write(path, serialized) {
                warn!(path = ?path, error = %e, "Could not persist session");
            }
        }
    }

    /// Drop the current session and delete the persisted copy best-effort.
    pub async fn clear(&self) {
        *self.current.write().await = None;

        if let Some(ref path) = self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = ?path, error = %e, "Could not remove session file"),
            }
        }
    }
}
