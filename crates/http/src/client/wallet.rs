//! Wallet history and deposits

use reqwest::Method;
use serde_json::Value as JsonValue;
use smm_core::Identity;

use super::{ClientError, SmmClient, request::segment};
use crate::types::wallet::{DepositRequest, Transaction, TransactionKind};

impl SmmClient {
    /// Deposits of the signed-in user; other transaction kinds are dropped
    pub async fn user_deposits(&self) -> Result<Vec<Transaction>, ClientError> {
        let request = self.request(Identity::User, Method::GET, "/user/transactions");
        let transactions: Vec<Transaction> = self.execute(request).await?;
        Ok(transactions
            .into_iter()
            .filter(|tx| tx.kind == TransactionKind::Deposit)
            .collect())
    }

    pub async fn user_transaction(&self, id: &str) -> Result<Transaction, ClientError> {
        let request = self.request(
            Identity::User,
            Method::GET,
            &format!("/user/transactions/{}", segment(id)),
        );
        self.execute(request).await
    }

    /// Submit a deposit for review, with an optional proof of transfer
    pub async fn create_deposit(&self, deposit: DepositRequest) -> Result<JsonValue, ClientError> {
        let request = self
            .request(Identity::User, Method::POST, "/payments/deposit")
            .multipart(deposit.into_multipart());
        self.execute(request).await
    }
}
