use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use super::{SessionError, TokenRefresher, TokenStorage};
use crate::{Error, Identity};

/// Whether a session currently holds credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

#[derive(Debug, Default, Clone)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// Token pair of one identity plus its persistence
///
/// The mutating methods are the only write path: initial [`load`](Self::load),
/// [`set_tokens`](Self::set_tokens), [`refresh_access_token`](Self::refresh_access_token)
/// and [`logout`](Self::logout).
pub struct SessionStore {
    identity: Identity,
    storage: Arc<dyn TokenStorage>,
    refresher: Arc<dyn TokenRefresher>,
    tokens: RwLock<Tokens>,
}

impl SessionStore {
    /// Create a session, seeding it from whatever `storage` already holds
    pub fn load(
        identity: Identity,
        storage: Arc<dyn TokenStorage>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let read = |key: &str| match storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(%identity, key, error = %e, "Failed to read persisted token");
                None
            }
        };
        let tokens = Tokens {
            access: read(identity.access_key()),
            refresh: read(identity.refresh_key()),
        };
        debug!(
            %identity,
            has_access = tokens.access.is_some(),
            has_refresh = tokens.refresh.is_some(),
            "Loaded session"
        );

        Self {
            identity,
            storage,
            refresher,
            tokens: RwLock::new(tokens),
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh.clone()
    }

    pub fn state(&self) -> SessionState {
        let tokens = self.read();
        if tokens.access.is_some() || tokens.refresh.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Store a freshly issued token pair
    pub fn set_tokens(&self, access: impl Into<String>, refresh: impl Into<String>) {
        let access = access.into();
        let refresh = refresh.into();
        self.persist(self.identity.access_key(), &access);
        self.persist(self.identity.refresh_key(), &refresh);

        let mut tokens = self.write();
        tokens.access = Some(access);
        tokens.refresh = Some(refresh);
        info!(identity = %self.identity, "Session tokens stored");
    }

    /// Replace the access token, keeping the refresh token
    pub fn set_access_token(&self, access: impl Into<String>) {
        let access = access.into();
        self.persist(self.identity.access_key(), &access);
        self.write().access = Some(access);
    }

    /// Drop both tokens from memory and storage
    pub fn logout(&self) {
        for key in [self.identity.access_key(), self.identity.refresh_key()] {
            if let Err(e) = self.storage.remove(key) {
                warn!(identity = %self.identity, key, error = %e, "Failed to clear persisted token");
            }
        }

        let mut tokens = self.write();
        tokens.access = None;
        tokens.refresh = None;
        info!(identity = %self.identity, "Session cleared");
    }

    /// Trade the refresh token for a new access token
    ///
    /// Any failure, including a missing refresh token, logs the session out
    /// before the error is returned. `Ok(None)` leaves the tokens untouched;
    /// callers decide what a token-less success means.
    pub async fn refresh_access_token(&self) -> Result<Option<String>, SessionError> {
        let Some(refresh_token) = self.refresh_token() else {
            self.logout();
            return Err(SessionError::Unauthenticated);
        };

        debug!(identity = %self.identity, "Refreshing access token");
        match self.refresher.refresh(self.identity, &refresh_token).await {
            Ok(Some(access)) if !access.is_empty() => {
                self.set_access_token(access.clone());
                debug!(identity = %self.identity, "Access token refreshed");
                Ok(Some(access))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(identity = %self.identity, error = %e, "Access token refresh failed");
                self.logout();
                Err(e)
            }
        }
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            warn!(identity = %self.identity, key, error = %e, "Failed to persist token");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tokens> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tokens> {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// The admin and end-user sessions side by side
#[derive(Debug, Clone)]
pub struct Sessions {
    admin: Arc<SessionStore>,
    user: Arc<SessionStore>,
}

impl Sessions {
    /// Pair two existing sessions
    ///
    /// Fails when a session sits in the other identity's slot.
    pub fn new(admin: Arc<SessionStore>, user: Arc<SessionStore>) -> crate::Result<Self> {
        for (slot, session) in [(Identity::Admin, &admin), (Identity::User, &user)] {
            if session.identity() != slot {
                return Err(Error::configuration(format!(
                    "{} session passed as the {slot} session",
                    session.identity()
                )));
            }
        }
        Ok(Self { admin, user })
    }

    /// Load both sessions from one storage backend
    pub fn load(storage: Arc<dyn TokenStorage>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            admin: Arc::new(SessionStore::load(
                Identity::Admin,
                storage.clone(),
                refresher.clone(),
            )),
            user: Arc::new(SessionStore::load(Identity::User, storage, refresher)),
        }
    }

    pub fn get(&self, identity: Identity) -> &Arc<SessionStore> {
        match identity {
            Identity::Admin => &self.admin,
            Identity::User => &self.user,
        }
    }

    pub fn admin(&self) -> &Arc<SessionStore> {
        &self.admin
    }

    pub fn user(&self) -> &Arc<SessionStore> {
        &self.user
    }
}
