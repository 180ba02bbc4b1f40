//! Tracing subscriber setup shared by the client binaries

pub mod config;
#[cfg(feature = "subscriber")]
pub mod init;

pub use config::{InstrumentationConfig, LogFormat};
#[cfg(feature = "subscriber")]
pub use init::init_tracing;
