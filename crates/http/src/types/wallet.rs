//! Wallet transactions and deposits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::orders::UserSummary;
use super::{HasId, Ref, Upload};
use crate::client::request::Multipart;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Order,
    Adjustment,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// Funding channel of a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Whish Money transfer, in USD or LBP
    WhishMoney,
    Binance,
    Usdt,
    Wallet,
    Admin,
    #[serde(other)]
    Unknown,
}

impl PaymentMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WhishMoney => "whishmoney",
            Self::Binance => "binance",
            Self::Usdt => "usdt",
            Self::Wallet => "wallet",
            Self::Admin => "admin",
            Self::Unknown => "unknown",
        }
    }
}

/// Wallet movement; deposits in the back office use the same record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<Ref<UserSummary>>,
    pub method: PaymentMethod,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub status: TransactionStatus,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub proof: Option<String>,
    #[serde(default)]
    pub reject_reason: Option<String>,
    #[serde(default)]
    pub order_number: Option<u64>,
    #[serde(default)]
    pub deposit_number: Option<u64>,
    #[serde(default)]
    pub deposit_label: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_kind() -> TransactionKind {
    TransactionKind::Deposit
}

impl HasId for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Funds request submitted from the storefront
#[derive(Debug, Clone, PartialEq)]
pub struct DepositRequest {
    pub method: PaymentMethod,
    pub amount: f64,
    pub reference: String,
    /// Only sent for [`PaymentMethod::WhishMoney`]
    pub currency: Option<String>,
    /// Screenshot or receipt of the transfer
    pub proof: Option<Upload>,
}

impl DepositRequest {
    pub(crate) fn into_multipart(self) -> Multipart {
        let mut form = Multipart::new()
            .text("amount", self.amount.to_string())
            .text("method", self.method.as_str())
            .text("reference", self.reference)
            .file_opt("proof", self.proof);
        if self.method == PaymentMethod::WhishMoney {
            form = form.text_opt("currency", self.currency);
        }
        form
    }
}
