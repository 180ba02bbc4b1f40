//! Back office payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::wallet::Transaction;
use super::{HasId, string_or_number};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl HasId for AdminUser {
    fn id(&self) -> &str {
        &self.id
    }
}

/// New account created from the back office
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// `user` or `admin`
    pub role: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BanRequest {
    pub banned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BalanceAdjustment {
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Everything the back office shows about one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: AdminUser,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub orders: Vec<JsonValue>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserCounts {
    pub total: u64,
    pub active: u64,
    pub banned: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Total {
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WalletTotals {
    pub total_balance: f64,
}

/// Dashboard headline numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsOverview {
    pub users: UserCounts,
    pub orders: Total,
    pub deposits: Total,
    pub wallets: WalletTotals,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UsersGrowthResponse {
    #[serde(rename = "monthlySignups", default)]
    pub monthly_signups: Vec<MonthlySignupRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MonthlySignupRow {
    #[serde(rename = "_id")]
    pub period: YearMonth,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct YearMonth {
    pub year: i32,
    pub month: u32,
}

/// Signups in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySignups {
    /// `YYYY-MM`
    pub month: String,
    pub count: u64,
}

impl From<MonthlySignupRow> for MonthlySignups {
    fn from(row: MonthlySignupRow) -> Self {
        Self {
            month: format!("{}-{:02}", row.period.year, row.period.month),
            count: row.count,
        }
    }
}

/// One bucket of the daily deposit or order series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: String,
    /// Deposited sum, present on the deposit series
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Remaining credit at the upstream provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderBalance {
    #[serde(default, deserialize_with = "string_or_number")]
    pub balance: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Service offered by the upstream provider, before it is mapped into the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedService {
    #[serde(deserialize_with = "string_or_number")]
    pub service: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub rate: Option<String>,
    #[serde(default)]
    pub min: u64,
    #[serde(default)]
    pub max: u64,
    #[serde(default)]
    pub dripfeed: bool,
    #[serde(default)]
    pub refill: bool,
    #[serde(default)]
    pub cancel: bool,
}

/// Either a bare array or an `{items: [...]}` envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Paged { items: Vec<T> },
    Other(JsonValue),
}

impl<T> ListEnvelope<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Paged { items } => items,
            Self::Other(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_monthly_signups_label() {
        let response: UsersGrowthResponse = serde_json::from_value(json!({
            "monthlySignups": [
                {"_id": {"year": 2024, "month": 3}, "count": 12},
                {"_id": {"year": 2024, "month": 11}, "count": 40}
            ]
        }))
        .unwrap();

        let rows: Vec<MonthlySignups> = response
            .monthly_signups
            .into_iter()
            .map(MonthlySignups::from)
            .collect();
        assert_eq!(rows[0].month, "2024-03");
        assert_eq!(rows[1].month, "2024-11");
        assert_eq!(rows[1].count, 40);
    }

    #[test]
    fn test_list_envelope_shapes() {
        let bare: ListEnvelope<u32> = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(bare.into_items(), vec![1, 2]);

        let paged: ListEnvelope<u32> =
            serde_json::from_value(json!({"items": [3], "total": 1})).unwrap();
        assert_eq!(paged.into_items(), vec![3]);

        let other: ListEnvelope<u32> = serde_json::from_value(json!({"ok": true})).unwrap();
        assert!(other.into_items().is_empty());
    }

    #[test]
    fn test_overview_defaults() {
        let overview: AnalyticsOverview =
            serde_json::from_value(json!({"users": {"total": 5}})).unwrap();
        assert_eq!(overview.users.total, 5);
        assert_eq!(overview.users.banned, 0);
        assert_eq!(overview.wallets.total_balance, 0.0);
    }
}
