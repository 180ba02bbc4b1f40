//! SMM panel HTTP client
//!
//! Typed access to the storefront and back office API. Requests carry the
//! bearer token of the session they are made for; expired tokens are renewed
//! once per burst of 401s and the failed requests replayed.

pub mod client;
pub mod types;

pub use client::error::ClientError;
pub use client::refresh::HttpTokenRefresher;
pub use client::request::{ApiRequest, Multipart};
pub use client::{SmmClient, SmmClientBuilder};
pub use smm_core::{Identity, SessionStore, Sessions};
