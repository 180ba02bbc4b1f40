//! Signed-in user's dashboard data

use reqwest::Method;
use smm_core::Identity;

use super::{ClientError, SmmClient};
use crate::types::account::{AccountProfile, SecurityInfo};
use crate::types::admin::Notification;

impl SmmClient {
    pub async fn profile(&self) -> Result<AccountProfile, ClientError> {
        let request = self.request(Identity::User, Method::GET, "/user/profile");
        self.execute(request).await
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, ClientError> {
        let request = self.request(Identity::User, Method::GET, "/user/notifications");
        self.execute(request).await
    }

    pub async fn security(&self) -> Result<SecurityInfo, ClientError> {
        let request = self.request(Identity::User, Method::GET, "/user/security");
        self.execute(request).await
    }
}
