//! In-memory session state

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::roles::Role;

/// Tokens and identity of the current session. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Token issued by `/vincular`; authorizes `/login` only
    pub link_token: Option<String>,

    /// Token issued by `/login`; authorizes every business endpoint
    pub access_token: Option<String>,

    /// Name the user logged in with
    pub user: Option<String>,

    /// Normalized role of the logged-in user
    pub role: Option<Role>,
}

/// Shared handle to the [`Session`], cloned into every client that needs it
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Session>>,
}

impl SessionStore {
    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn link_token(&self) -> Option<String> {
        self.read().link_token.clone()
    }

    pub fn set_link_token(&self, token: &str) {
        self.write().link_token = Some(token.to_string());
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    /// Record a successful login
    pub fn start(&self, token: &str, user: &str, role: Role) {
        let mut session = self.write();
        session.access_token = Some(token.to_string());
        session.user = Some(user.to_string());
        session.role = Some(role);
    }

    /// Forget the login; the link token is kept so the user can log in again
    pub fn end(&self) {
        let mut session = self.write();
        session.access_token = None;
        session.user = None;
        session.role = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().access_token.is_some()
    }
}
