//! # Auth Session
//!
//! The logged-in user's token, passed explicitly to whatever needs it.
//! The token is loaded from a [`TokenStore`] at startup and removed from both
//! memory and storage on logout. The role is never persisted: a restored
//! session looks it up again from the stored email.

use crate::error::{ShopError, ShopResult};
use crate::persist::{StoredLogin, TokenStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Unknown role names are treated as regular users
    pub fn parse(role: &str) -> Self {
        if role.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

pub struct AuthSession {
    token: Option<String>,
    email: Option<String>,
    role: Option<Role>,
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("logged_in", &self.token.is_some())
            .field("role", &self.role)
            .finish()
    }
}

impl AuthSession {
    /// Restore whatever token was persisted
    pub fn load(store: Arc<dyn TokenStore>) -> ShopResult<Self> {
        let (token, email) = match store.load()? {
            Some(login) => (Some(login.token), login.email),
            None => (None, None),
        };
        Ok(Self {
            token,
            email,
            role: None,
            store,
        })
    }

    /// Store a token whose account is unknown
    pub fn login(&mut self, token: impl Into<String>) -> ShopResult<()> {
        self.start(StoredLogin::new(token, None))
    }

    /// Store a token issued for `email`
    pub fn login_as(&mut self, token: impl Into<String>, email: impl Into<String>) -> ShopResult<()> {
        self.start(StoredLogin::new(token, Some(email.into())))
    }

    fn start(&mut self, login: StoredLogin) -> ShopResult<()> {
        self.store.save(&login)?;
        self.token = Some(login.token);
        self.email = login.email;
        self.role = None;
        info!("user logged in");
        Ok(())
    }

    pub fn logout(&mut self) -> ShopResult<()> {
        self.token = None;
        self.email = None;
        self.role = None;
        self.store.clear()?;
        info!("user logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Token for an authenticated request
    pub fn token(&self) -> ShopResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| ShopError::Auth("no active session".to_string()))
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> ShopResult<String> {
        Ok(format!("Bearer {}", self.token()?))
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Email whose role still has to be fetched: a token is held, its
    /// account is known and no role was looked up yet
    pub fn pending_role_lookup(&self) -> Option<&str> {
        match (&self.token, &self.role) {
            (Some(_), None) => self.email.as_deref(),
            _ => None,
        }
    }

    /// Admin pages require a logged-in admin
    pub fn require_admin(&self) -> ShopResult<()> {
        self.token()?;
        match self.role {
            Some(Role::Admin) => Ok(()),
            _ => Err(ShopError::Auth("admin role required".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryTokenStore;

    #[test]
    fn test_login_logout_clears_storage() {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::default());
        let mut session = AuthSession::load(Arc::clone(&store)).unwrap();
        assert!(!session.is_authenticated());
        assert!(matches!(session.bearer(), Err(ShopError::Auth(_))));

        session.login("tok123").unwrap();
        assert_eq!(session.bearer().unwrap(), "Bearer tok123");
        assert_eq!(store.load().unwrap().map(|l| l.token).as_deref(), Some("tok123"));

        let restored = AuthSession::load(Arc::clone(&store)).unwrap();
        assert!(restored.is_authenticated());

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_admin_gate() {
        let mut session = AuthSession::load(Arc::new(MemoryTokenStore::default())).unwrap();
        assert!(session.require_admin().is_err());

        session.login("tok").unwrap();
        session.set_role(Role::parse("user"));
        assert!(session.require_admin().is_err());

        session.set_role(Role::parse("ADMIN"));
        assert!(session.require_admin().is_ok());
    }

    #[test]
    fn test_restored_session_needs_role_lookup() {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::default());
        let mut session = AuthSession::load(Arc::clone(&store)).unwrap();
        assert_eq!(session.pending_role_lookup(), None);

        session.login_as("tok", "admin@shop.test").unwrap();
        session.set_role(Role::Admin);
        assert_eq!(session.pending_role_lookup(), None);

        let mut restored = AuthSession::load(Arc::clone(&store)).unwrap();
        assert_eq!(restored.email(), Some("admin@shop.test"));
        assert!(restored.require_admin().is_err());
        assert_eq!(restored.pending_role_lookup(), Some("admin@shop.test"));

        restored.set_role(Role::Admin);
        assert!(restored.require_admin().is_ok());

        restored.logout().unwrap();
        assert_eq!(restored.email(), None);
        assert!(AuthSession::load(store).unwrap().pending_role_lookup().is_none());
    }
}
