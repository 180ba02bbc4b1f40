//! Caller identities
//!
//! The backend serves two audiences from one API: storefront users and back
//! office administrators. Each has its own token pair, and both may be signed
//! in at the same time, so every request names the identity whose credentials
//! it carries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which session a request authenticates as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    /// Back office administrator
    Admin,
    /// Storefront end user
    User,
}

impl Identity {
    /// Storage key holding this identity's access token
    pub const fn access_key(self) -> &'static str {
        match self {
            Self::Admin => "admin_token",
            Self::User => "accessToken",
        }
    }

    /// Storage key holding this identity's refresh token
    pub const fn refresh_key(self) -> &'static str {
        match self {
            Self::Admin => "admin_refresh",
            Self::User => "refreshToken",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Identity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(format!("unknown identity: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_do_not_overlap() {
        assert_ne!(Identity::Admin.access_key(), Identity::User.access_key());
        assert_ne!(Identity::Admin.refresh_key(), Identity::User.refresh_key());
        assert_ne!(Identity::User.access_key(), Identity::User.refresh_key());
    }

    #[test]
    fn test_parse_identity() {
        assert_eq!("admin".parse::<Identity>().unwrap(), Identity::Admin);
        assert_eq!("User".parse::<Identity>().unwrap(), Identity::User);
        assert!("root".parse::<Identity>().is_err());
    }
}
