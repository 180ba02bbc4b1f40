//! SMM client core: identities, sessions and token persistence

pub mod error;
pub mod identity;
pub mod session;
pub mod tracing;

pub use error::{Error, Result};
pub use identity::Identity;
pub use session::{
    FileTokenStorage, MemoryTokenStorage, SessionError, SessionState, SessionStore, Sessions,
    TokenRefresher, TokenStorage,
};
