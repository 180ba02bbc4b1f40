//! Session management
//!
//! A session owns the access/refresh token pair of one [`Identity`] and keeps
//! it in sync with a [`TokenStorage`]. Tokens are opaque strings; nothing here
//! inspects them.

mod storage;
mod store;

pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use store::{SessionState, SessionStore, Sessions};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::Identity;

/// Session failures
///
/// Cloneable so a single refresh outcome can be handed to every request that
/// waited on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No refresh token is held, the caller has to log in again
    #[error("No refresh token available")]
    Unauthenticated,

    /// The backend refused the refresh token
    #[error("Token refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The refresh call never produced a response
    #[error("Token refresh request failed: {0}")]
    Transport(String),

    /// The refresh call succeeded without handing out a token
    #[error("Token refresh returned no access token")]
    MissingAccessToken,

    /// The refresh call did not finish in time
    #[error("Token refresh timed out after {0:?}")]
    TimedOut(Duration),
}

impl SessionError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Exchanges a refresh token for a new access token
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Perform the exchange for `identity`.
    ///
    /// `Ok(None)` means the backend accepted the call but returned no token.
    async fn refresh(
        &self,
        identity: Identity,
        refresh_token: &str,
    ) -> Result<Option<String>, SessionError>;
}
