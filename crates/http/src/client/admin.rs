//! Back office API client methods
//!
//! Everything here runs on the admin session.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use smm_core::Identity;
use tracing::info;

use super::request::{ApiRequest, segment};
use super::{ClientError, SmmClient};
use crate::types::admin::{
    AdminUser, AnalyticsOverview, BalanceAdjustment, BanRequest, CreateUserRequest, DailyPoint,
    ImportedService, ListEnvelope, MonthlySignups, ProviderBalance, UserProfile,
    UsersGrowthResponse,
};
use crate::types::catalog::{
    Category, CategoryForm, Platform, PlatformForm, Service, ServiceForm, ServiceTitle,
    ServiceTitleForm,
};
use crate::types::orders::{ConfirmOrderRequest, Order, RejectRequest};
use crate::types::wallet::{Transaction, TransactionStatus};
use crate::types::{MessageResponse, Page, Pagination};

/// Default page size of the deposit queue
pub const DEPOSITS_PAGE_SIZE: u32 = 20;
/// Default page size of the order queue
pub const ADMIN_ORDERS_PAGE_SIZE: u32 = 10;
pub const ADMIN_PLATFORMS_PAGE_SIZE: u32 = 30;
/// Service titles are fetched in one go
pub const ADMIN_SERVICE_TITLES_PAGE_SIZE: u32 = 10_000;
pub const ADMIN_SERVICES_PAGE_SIZE: u32 = 20;
pub const IMPORTED_SERVICES_PAGE_SIZE: u32 = 50;

/// Default window of the daily analytics series
pub const DEFAULT_ANALYTICS_RANGE: &str = "30d";

/// Note attached to a confirmed order when the admin gives none
pub const DEFAULT_CONFIRM_NOTES: &str = "Confirmed by admin";

impl SmmClient {
    fn admin(&self, method: Method, path: &str) -> ApiRequest {
        self.request(Identity::Admin, method, path)
    }

    /// Execute a listing that may come back bare or wrapped in `{items}`
    async fn execute_list<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Vec<T>, ClientError> {
        let envelope: ListEnvelope<T> = self.execute(request).await?;
        Ok(envelope.into_items())
    }

    // Users

    pub async fn users(&self) -> Result<Vec<AdminUser>, ClientError> {
        self.execute_list(self.admin(Method::GET, "/admin/users"))
            .await
    }

    /// Search users by name or email
    ///
    /// The backend reads the term from an unnamed parameter (`?=term`).
    pub async fn search_users(&self, query: &str) -> Result<Vec<AdminUser>, ClientError> {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let request = self
            .admin(Method::GET, "/admin/users/search")
            .raw_query(format!("={encoded}"));
        self.execute_list(request).await
    }

    pub async fn create_user(&self, user: &CreateUserRequest) -> Result<JsonValue, ClientError> {
        let request = self.admin(Method::POST, "/admin/users").json(user)?;
        let created = self.execute(request).await?;
        info!(email = %user.email, role = %user.role, "User created");
        Ok(created)
    }

    pub async fn set_user_banned(
        &self,
        id: &str,
        banned: bool,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .admin(Method::POST, &format!("/admin/users/{}/ban", segment(id)))
            .json(&BanRequest { banned })?;
        self.execute(request).await
    }

    /// Credit (positive) or debit (negative) a user's wallet
    pub async fn adjust_balance(
        &self,
        id: &str,
        amount: f64,
        reason: Option<String>,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .admin(Method::POST, &format!("/admin/users/{}/balance", segment(id)))
            .json(&BalanceAdjustment { amount, reason })?;
        self.execute(request).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let request = self.admin(Method::DELETE, &format!("/admin/users/{}", segment(id)));
        self.execute(request).await
    }

    pub async fn user_profile(&self, id: &str) -> Result<UserProfile, ClientError> {
        let request = self.admin(Method::GET, &format!("/admin/users/{}", segment(id)));
        self.execute(request).await
    }

    // Deposits

    pub async fn deposits(
        &self,
        status: Option<TransactionStatus>,
        page: Option<Pagination>,
    ) -> Result<Page<Transaction>, ClientError> {
        let page = page.unwrap_or(Pagination::first(DEPOSITS_PAGE_SIZE));
        let request = self
            .admin(Method::GET, "/admin/deposits")
            .query_opt("status", status.map(TransactionStatus::as_str))
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn search_deposits(
        &self,
        query: &str,
        page: Option<Pagination>,
    ) -> Result<Page<Transaction>, ClientError> {
        let page = page.unwrap_or(Pagination::first(DEPOSITS_PAGE_SIZE));
        let request = self
            .admin(Method::GET, "/admin/deposits/search")
            .query("query", query)
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn confirm_deposit(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let request = self.admin(Method::POST, &format!("/admin/deposits/{}/confirm", segment(id)));
        self.execute(request).await
    }

    pub async fn reject_deposit(
        &self,
        id: &str,
        reason: impl Into<String>,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .admin(Method::POST, &format!("/admin/deposits/{}/reject", segment(id)))
            .json(&RejectRequest {
                reason: reason.into(),
            })?;
        self.execute(request).await
    }

    // Orders

    pub async fn admin_orders(
        &self,
        status: Option<&str>,
        page: Option<Pagination>,
    ) -> Result<Page<Order>, ClientError> {
        let page = page.unwrap_or(Pagination::first(ADMIN_ORDERS_PAGE_SIZE));
        let request = self
            .admin(Method::GET, "/admin/orders")
            .query_opt("status", status)
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn search_admin_orders(
        &self,
        search: &str,
        page: Option<Pagination>,
    ) -> Result<Page<Order>, ClientError> {
        let page = page.unwrap_or(Pagination::first(ADMIN_ORDERS_PAGE_SIZE));
        let request = self
            .admin(Method::GET, "/admin/orders")
            .query("search", search)
            .query_pairs(page.query());
        self.execute(request).await
    }

    /// Mark a manual order fulfilled; `notes` usually carries delivered credentials
    pub async fn confirm_order(
        &self,
        id: &str,
        notes: Option<String>,
    ) -> Result<MessageResponse, ClientError> {
        let notes = notes
            .filter(|notes| !notes.is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIRM_NOTES.to_string());
        let request = self
            .admin(Method::POST, &format!("/admin/orders/{}/confirm", segment(id)))
            .json(&ConfirmOrderRequest { notes })?;
        self.execute(request).await
    }

    pub async fn reject_order(
        &self,
        id: &str,
        reason: impl Into<String>,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .admin(Method::POST, &format!("/admin/orders/{}/reject", segment(id)))
            .json(&RejectRequest {
                reason: reason.into(),
            })?;
        self.execute(request).await
    }

    // Catalog

    pub async fn admin_categories(&self) -> Result<Vec<Category>, ClientError> {
        self.execute_list(self.admin(Method::GET, "/admin/categories"))
            .await
    }

    pub async fn create_category(&self, form: CategoryForm) -> Result<JsonValue, ClientError> {
        let request = self
            .admin(Method::POST, "/admin/categories")
            .multipart(form.into_multipart());
        self.execute(request).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        form: CategoryForm,
    ) -> Result<JsonValue, ClientError> {
        let request = self
            .admin(Method::PUT, &format!("/admin/categories/{}", segment(id)))
            .multipart(form.into_multipart());
        self.execute(request).await
    }

    pub async fn delete_category(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let request = self.admin(Method::DELETE, &format!("/admin/categories/{}", segment(id)));
        self.execute(request).await
    }

    pub async fn admin_platforms(
        &self,
        category_id: Option<&str>,
        page: Option<Pagination>,
    ) -> Result<Page<Platform>, ClientError> {
        let page = page.unwrap_or(Pagination::first(ADMIN_PLATFORMS_PAGE_SIZE));
        let request = self
            .admin(Method::GET, "/admin/platforms")
            .query_pairs(page.query())
            .query_opt("categoryId", category_id);
        self.execute(request).await
    }

    /// Search platforms by name, description or category; not paginated
    pub async fn search_admin_platforms(&self, query: &str) -> Result<Vec<Platform>, ClientError> {
        let request = self
            .admin(Method::GET, "/admin/platforms/search")
            .query("query", query);
        self.execute_list(request).await
    }

    pub async fn create_platform(&self, form: PlatformForm) -> Result<JsonValue, ClientError> {
        let request = self
            .admin(Method::POST, "/admin/platforms")
            .multipart(form.into_multipart());
        self.execute(request).await
    }

    pub async fn update_platform(
        &self,
        id: &str,
        form: PlatformForm,
    ) -> Result<JsonValue, ClientError> {
        let request = self
            .admin(Method::PUT, &format!("/admin/platforms/{}", segment(id)))
            .multipart(form.into_multipart());
        self.execute(request).await
    }

    pub async fn delete_platform(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let request = self.admin(Method::DELETE, &format!("/admin/platforms/{}", segment(id)));
        self.execute(request).await
    }

    pub async fn admin_service_titles(
        &self,
        page: Option<Pagination>,
    ) -> Result<Page<ServiceTitle>, ClientError> {
        let page = page.unwrap_or(Pagination::first(ADMIN_SERVICE_TITLES_PAGE_SIZE));
        let request = self
            .admin(Method::GET, "/admin/service-titles")
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn search_admin_service_titles(
        &self,
        query: &str,
    ) -> Result<Vec<ServiceTitle>, ClientError> {
        let request = self
            .admin(Method::GET, "/admin/service-titles/search")
            .query("query", query);
        self.execute_list(request).await
    }

    pub async fn create_service_title(
        &self,
        form: ServiceTitleForm,
    ) -> Result<JsonValue, ClientError> {
        let request = self
            .admin(Method::POST, "/admin/service-titles")
            .multipart(form.into_multipart());
        self.execute(request).await
    }

    pub async fn update_service_title(
        &self,
        id: &str,
        form: ServiceTitleForm,
    ) -> Result<JsonValue, ClientError> {
        let request = self
            .admin(Method::PUT, &format!("/admin/service-titles/{}", segment(id)))
            .multipart(form.into_multipart());
        self.execute(request).await
    }

    pub async fn delete_service_title(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let request = self.admin(Method::DELETE, &format!("/admin/service-titles/{}", segment(id)));
        self.execute(request).await
    }

    pub async fn admin_services(
        &self,
        page: Option<Pagination>,
    ) -> Result<Page<Service>, ClientError> {
        let page = page.unwrap_or(Pagination::first(ADMIN_SERVICES_PAGE_SIZE));
        let request = self
            .admin(Method::GET, "/admin/services")
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn search_admin_services(&self, query: &str) -> Result<Vec<Service>, ClientError> {
        let request = self
            .admin(Method::GET, "/admin/services/search")
            .query("query", query);
        self.execute_list(request).await
    }

    pub async fn create_service(&self, form: ServiceForm) -> Result<JsonValue, ClientError> {
        let request = self
            .admin(Method::POST, "/admin/services")
            .multipart(form.into_multipart());
        self.execute(request).await
    }

    pub async fn update_service(
        &self,
        id: &str,
        form: ServiceForm,
    ) -> Result<JsonValue, ClientError> {
        let request = self
            .admin(Method::PUT, &format!("/admin/services/{}", segment(id)))
            .multipart(form.into_multipart());
        self.execute(request).await
    }

    pub async fn delete_service(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let request = self.admin(Method::DELETE, &format!("/admin/services/{}", segment(id)));
        self.execute(request).await
    }

    // Analytics

    pub async fn analytics_overview(&self) -> Result<AnalyticsOverview, ClientError> {
        let request = self.admin(Method::GET, "/admin/analytics/overview");
        self.execute(request).await
    }

    /// Deposited amount per day over `range` (`30d` when not given)
    pub async fn daily_deposits(
        &self,
        range: Option<&str>,
    ) -> Result<Vec<DailyPoint>, ClientError> {
        let request = self
            .admin(Method::GET, "/admin/deposits")
            .query("range", range.unwrap_or(DEFAULT_ANALYTICS_RANGE));
        self.execute_list(request).await
    }

    /// Orders per day over `range` (`30d` when not given)
    pub async fn daily_orders(&self, range: Option<&str>) -> Result<Vec<DailyPoint>, ClientError> {
        let request = self
            .admin(Method::GET, "/admin/orders")
            .query("range", range.unwrap_or(DEFAULT_ANALYTICS_RANGE));
        self.execute_list(request).await
    }

    /// Signups per month, labelled `YYYY-MM`
    pub async fn users_growth(&self) -> Result<Vec<MonthlySignups>, ClientError> {
        let request = self.admin(Method::GET, "/admin/analytics/users-growth");
        let response: UsersGrowthResponse = self.execute(request).await?;
        Ok(response
            .monthly_signups
            .into_iter()
            .map(MonthlySignups::from)
            .collect())
    }

    // Provider

    pub async fn provider_balance(&self) -> Result<ProviderBalance, ClientError> {
        let request = self.admin(Method::GET, "/admin/balance");
        self.execute(request).await
    }

    /// Services offered by the upstream provider
    pub async fn imported_services(
        &self,
        query: &str,
        page: Option<Pagination>,
    ) -> Result<Page<ImportedService>, ClientError> {
        let page = page.unwrap_or(Pagination::first(IMPORTED_SERVICES_PAGE_SIZE));
        let request = self
            .admin(Method::GET, "/secsers/services")
            .query("query", query)
            .query_pairs(page.query());
        self.execute(request).await
    }
}
