//! The signed-in user's own account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    #[serde(rename = "id", alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Account standing as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityInfo {
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_accepts_either_id_field() {
        let profile: AccountProfile = serde_json::from_value(json!({
            "_id": "u1",
            "name": "Jane",
            "email": "jane@example.com",
            "balance": 12.5
        }))
        .unwrap();
        assert_eq!(profile.id, "u1");
        assert_eq!(profile.balance, 12.5);
        assert!(!profile.banned);
    }
}
