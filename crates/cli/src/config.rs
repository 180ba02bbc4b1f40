//! CLI settings
//!
//! Resolved from built-in defaults, then an optional config file, then
//! `SMM_*` environment variables (`SMM_API_URL`, `SMM_TIMEOUT_SECS`, ...).

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base URL of the production API
pub const DEFAULT_API_URL: &str = "https://api.smslb.shop/api";

/// Config file looked up in the data directory when none is given
const CONFIG_FILE_STEM: &str = "smm";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// API base URL
    pub api_url: String,
    /// Per-request timeout (0 disables it)
    pub timeout_secs: u64,
    /// Upper bound for a token refresh
    pub refresh_timeout_secs: u64,
    /// Where tokens and logs are kept; overrides the default location
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
            refresh_timeout_secs: 30,
            data_dir: None,
        }
    }
}

impl Settings {
    /// Load settings
    ///
    /// An explicit `path` must exist. Without one, `smm.toml` or `smm.yaml`
    /// in `data_dir` is used when present.
    pub fn load(path: Option<&Path>, data_dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder
                .add_source(File::from(data_dir.join(CONFIG_FILE_STEM)).required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix("SMM").try_parsing(true))
            .build()
            .context("Failed to read settings")?;

        settings
            .try_deserialize()
            .context("Invalid settings")
    }
}

/// Default state directory: `SMM_STATE_DIR`, else the platform data dir
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SMM_STATE_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smm")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(None, dir.path()).unwrap();
        assert_eq!(settings.refresh_timeout_secs, 30);
        assert!(settings.data_dir.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("smm.toml"),
            "api_url = \"http://localhost:4000/api\"\nrefresh_timeout_secs = 5\n",
        )
        .unwrap();

        let settings = Settings::load(None, dir.path()).unwrap();
        assert_eq!(settings.refresh_timeout_secs, 5);
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Settings::load(Some(&missing), dir.path()).is_err());
    }
}
