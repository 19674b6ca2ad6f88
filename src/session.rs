use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{ApiError, Credentials, MovieApi};

/// The signed-in user. Persisted as `{"username": ..., "token": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub token: String,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Username and password are required")]
    IncompleteCredentials,

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// File-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

struct Inner {
    store: SessionStore,
    tx: watch::Sender<Option<Session>>,
}

/// Shared handle on the current session. Changes are broadcast to every
/// [`watch::Receiver`] obtained from [`SessionContext::subscribe`].
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl SessionContext {
    /// Opens the store. A corrupt file is treated as signed out.
    pub fn open(store: SessionStore) -> Self {
        let current = match store.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(path = %store.path().display(), "ignoring unreadable session: {}", e);
                None
            }
        };
        let (tx, _rx) = watch::channel(current);
        Self {
            inner: Arc::new(Inner { store, tx }),
        }
    }

    pub fn current_user(&self) -> Option<Session> {
        self.inner.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.tx.subscribe()
    }

    pub async fn login(
        &self,
        api: &dyn MovieApi,
        credentials: &Credentials,
    ) -> Result<Session, SessionError> {
        if !credentials.is_complete() {
            return Err(SessionError::IncompleteCredentials);
        }
        let token = api.login(credentials).await?;
        self.establish(credentials, token)
    }

    pub async fn signup(
        &self,
        api: &dyn MovieApi,
        credentials: &Credentials,
    ) -> Result<Session, SessionError> {
        if !credentials.is_complete() {
            return Err(SessionError::IncompleteCredentials);
        }
        let token = api.signup(credentials).await?;
        self.establish(credentials, token)
    }

    fn establish(&self, credentials: &Credentials, token: String) -> Result<Session, SessionError> {
        let session = Session {
            username: credentials.username.trim().to_string(),
            token,
        };
        self.inner.store.save(&session)?;
        info!(username = %session.username, "signed in");
        self.inner.tx.send_replace(Some(session.clone()));
        Ok(session)
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.inner.store.clear()?;
        if let Some(previous) = self.inner.tx.send_replace(None) {
            info!(username = %previous.username, "signed out");
        }
        Ok(())
    }

    /// Re-reads the session file so that writes from another process are
    /// picked up. Returns whether the session changed.
    pub fn reload(&self) -> Result<bool, SessionError> {
        let on_disk = self.inner.store.load()?;
        Ok(self.inner.tx.send_if_modified(|current| {
            if *current == on_disk {
                false
            } else {
                *current = on_disk;
                true
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> SessionContext {
        SessionContext::open(SessionStore::new(dir.path().join("session.json")))
    }

    #[test]
    fn test_missing_file_means_signed_out() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        assert!(ctx.current_user().is_none());
    }

    #[test]
    fn test_corrupt_file_means_signed_out() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("session.json"), "{not json").unwrap();
        let ctx = context(&dir);
        assert!(ctx.current_user().is_none());
    }

    #[test]
    fn test_store_round_trips_two_keys() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        let session = Session {
            username: "ana".to_string(),
            token: "abc".to_string(),
        };
        store.save(&session).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["username"], "ana");
        assert_eq!(raw["token"], "abc");
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[tokio::test]
    async fn test_login_stores_and_notifies() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let api = FakeApi::default();
        api.state
            .lock()
            .unwrap()
            .accounts
            .insert("ana".to_string(), "pw".to_string());

        let mut rx = ctx.subscribe();
        let session = ctx.login(&api, &Credentials::new("ana", "pw")).await.unwrap();

        assert_eq!(session.token, "token-ana");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().username, "ana");
        assert_eq!(context(&dir).current_user(), Some(session));
    }

    #[tokio::test]
    async fn test_login_failure_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let api = FakeApi::default();

        let err = ctx
            .login(&api, &Credentials::new("ana", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Incorrect username or password");
        assert!(ctx.current_user().is_none());
    }

    #[tokio::test]
    async fn test_empty_credentials_are_rejected_locally() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let api = FakeApi::default();

        let err = ctx.signup(&api, &Credentials::new("", "")).await.unwrap_err();
        assert!(matches!(err, SessionError::IncompleteCredentials));
        assert!(api.state.lock().unwrap().accounts.is_empty());
    }

    #[tokio::test]
    async fn test_signup_then_logout() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let api = FakeApi::default();

        ctx.signup(&api, &Credentials::new("bob", "pw")).await.unwrap();
        assert_eq!(ctx.current_user().unwrap().username, "bob");

        let mut rx = ctx.subscribe();
        ctx.logout().unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
        assert!(!dir.path().join("session.json").exists());
    }

    #[test]
    fn test_reload_picks_up_external_writer() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        assert!(!ctx.reload().unwrap());

        let other = SessionStore::new(dir.path().join("session.json"));
        other
            .save(&Session {
                username: "zoe".to_string(),
                token: "t".to_string(),
            })
            .unwrap();

        assert!(ctx.reload().unwrap());
        assert_eq!(ctx.current_user().unwrap().username, "zoe");
        assert!(!ctx.reload().unwrap());
    }
}
