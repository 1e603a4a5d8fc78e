//! Session persistence with a token mirror for route guards.

use chrono::{DateTime, Duration, Utc};
use nexusclin_core::{has_role, Role, Session};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SESSION_FILE: &str = "session.json";
const TOKEN_MIRROR_FILE: &str = "token.json";

/// Nominal lifetime of the token mirror. Nothing re-validates the token's
/// real expiry; a stale session is only discovered when an API call fails
/// with an authorization status.
const MIRROR_TTL_DAYS: i64 = 7;

/// The token side channel a route-guard middleware reads before the views
/// load. Written and removed together with the primary session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenMirror {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Owner of the authenticated [`Session`].
///
/// The in-memory copy is authoritative for the process; the primary file
/// and the token mirror exist so the next process start (and the route
/// guard) can pick the session back up. When the state directory cannot be
/// written the store degrades to memory-only for this process - login still
/// works, it just does not survive a restart.
pub struct SessionStore {
    current: Mutex<Option<Session>>,
    paths: Option<StorePaths>,
}

struct StorePaths {
    primary: PathBuf,
    mirror: PathBuf,
}

impl SessionStore {
    /// Open the store backed by `state_dir`, loading any persisted session.
    pub fn open(state_dir: &Path) -> SessionStore {
        let paths = match std::fs::create_dir_all(state_dir) {
            Ok(()) => Some(StorePaths {
                primary: state_dir.join(SESSION_FILE),
                mirror: state_dir.join(TOKEN_MIRROR_FILE),
            }),
            Err(err) => {
                tracing::warn!(
                    dir = %state_dir.display(),
                    %err,
                    "session storage unavailable, degrading to in-memory session"
                );
                None
            }
        };
        let store = SessionStore {
            current: Mutex::new(None),
            paths,
        };
        store.load();
        store
    }

    /// A store with no persistence at all. Used by tests and as the
    /// degraded mode.
    pub fn in_memory() -> SessionStore {
        SessionStore {
            current: Mutex::new(None),
            paths: None,
        }
    }

    /// Read the persisted session, honoring the mirror's nominal expiry.
    ///
    /// A missing or expired mirror means logged out, even if the primary
    /// file is still around.
    fn load(&self) {
        let Some(paths) = &self.paths else { return };
        let mirror = read_json::<TokenMirror>(&paths.mirror);
        let session = read_json::<Session>(&paths.primary);
        let session = match (session, mirror) {
            (Some(session), Some(mirror)) if mirror.expires_at > Utc::now() => Some(session),
            (Some(_), _) => {
                tracing::debug!("token mirror absent or expired, discarding persisted session");
                let _ = std::fs::remove_file(&paths.primary);
                let _ = std::fs::remove_file(&paths.mirror);
                None
            }
            (None, _) => None,
        };
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = session;
    }

    /// Persist `session` and mirror its token into the side channel.
    pub fn set(&self, session: Session) {
        if let Some(paths) = &self.paths {
            let mirror = TokenMirror {
                token: session.token.clone(),
                expires_at: Utc::now() + Duration::days(MIRROR_TTL_DAYS),
            };
            if let Err(err) = write_json(&paths.primary, &session)
                .and_then(|_| write_json(&paths.mirror, &mirror))
            {
                tracing::warn!(%err, "failed to persist session, keeping it in memory only");
            }
        }
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
    }

    pub fn get(&self) -> Option<Session> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn has_role(&self, allowed: &[Role]) -> bool {
        has_role(self.get().as_ref(), allowed)
    }

    /// Remove the session from memory, the primary file, and the mirror.
    pub fn clear(&self) {
        if let Some(paths) = &self.paths {
            let _ = std::fs::remove_file(&paths.primary);
            let _ = std::fs::remove_file(&paths.mirror);
        }
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let contents = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::from_wire("tok-123", &["CLINICO".to_string()], 7)
    }

    #[test]
    fn set_get_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path());
        assert!(store.get().is_none());

        store.set(session());
        assert_eq!(store.get().unwrap().tenant_id, 7);
        assert!(store.has_role(&[Role::Clinico]));
        assert!(!store.has_role(&[Role::AdminTenant]));

        store.clear();
        assert!(store.get().is_none());
        assert!(!dir.path().join(SESSION_FILE).exists());
        assert!(!dir.path().join(TOKEN_MIRROR_FILE).exists());
    }

    #[test]
    fn persisted_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        SessionStore::open(dir.path()).set(session());

        let reopened = SessionStore::open(dir.path());
        assert_eq!(reopened.token().as_deref(), Some("tok-123"));
    }

    #[test]
    fn expired_mirror_means_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        SessionStore::open(dir.path()).set(session());

        let mirror_path = dir.path().join(TOKEN_MIRROR_FILE);
        let expired = TokenMirror {
            token: "tok-123".to_string(),
            expires_at: Utc::now() - Duration::days(1),
        };
        write_json(&mirror_path, &expired).unwrap();

        let reopened = SessionStore::open(dir.path());
        assert!(reopened.get().is_none());
        assert!(!dir.path().join(SESSION_FILE).exists());
    }

    #[test]
    fn missing_mirror_means_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        SessionStore::open(dir.path()).set(session());
        std::fs::remove_file(dir.path().join(TOKEN_MIRROR_FILE)).unwrap();

        let reopened = SessionStore::open(dir.path());
        assert!(reopened.get().is_none());
    }

    #[test]
    fn unwritable_dir_degrades_to_memory_only() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        // create_dir_all fails because a file sits where the dir should be
        let store = SessionStore::open(&blocker);
        store.set(session());
        assert_eq!(store.get().unwrap().tenant_id, 7);
    }
}
