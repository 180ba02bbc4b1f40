//! Storefront catalog browsing

use reqwest::Method;
use smm_core::Identity;

use super::{ClientError, SmmClient, request::segment};
use crate::types::catalog::{Category, Platform, Service, ServiceTitle};
use crate::types::{Page, Pagination};

/// Default page size of the category grid
pub const CATEGORY_PAGE_SIZE: u32 = 12;
/// Default page size of platform, service title and service grids
pub const CATALOG_PAGE_SIZE: u32 = 16;

impl SmmClient {
    pub async fn categories(
        &self,
        page: Option<Pagination>,
    ) -> Result<Page<Category>, ClientError> {
        let page = page.unwrap_or(Pagination::first(CATEGORY_PAGE_SIZE));
        let request = self
            .request(Identity::User, Method::GET, "/user/categories")
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn search_categories(
        &self,
        query: &str,
        page: Option<Pagination>,
    ) -> Result<Page<Category>, ClientError> {
        let page = page.unwrap_or(Pagination::first(CATEGORY_PAGE_SIZE));
        let request = self
            .request(Identity::User, Method::GET, "/user/categories/search")
            .query("query", query)
            .query_pairs(page.query());
        self.execute(request).await
    }

    /// Platforms, optionally restricted to one category
    pub async fn platforms(
        &self,
        category_slug: Option<&str>,
        page: Option<Pagination>,
    ) -> Result<Page<Platform>, ClientError> {
        let page = page.unwrap_or(Pagination::first(CATALOG_PAGE_SIZE));
        let request = self
            .request(Identity::User, Method::GET, "/user/platforms")
            .query_opt("categorySlug", category_slug)
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn search_platforms(
        &self,
        query: &str,
        category_slug: Option<&str>,
        page: Option<Pagination>,
    ) -> Result<Page<Platform>, ClientError> {
        let page = page.unwrap_or(Pagination::first(CATALOG_PAGE_SIZE));
        let request = self
            .request(Identity::User, Method::GET, "/user/platforms/search")
            .query("query", query)
            .query_opt("categorySlug", category_slug)
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn service_titles(
        &self,
        platform_id: &str,
        page: Option<Pagination>,
    ) -> Result<Page<ServiceTitle>, ClientError> {
        let page = page.unwrap_or(Pagination::first(CATALOG_PAGE_SIZE));
        let request = self
            .request(Identity::User, Method::GET, "/user/service-titles")
            .query("platformId", platform_id)
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn search_service_titles(
        &self,
        query: &str,
        platform_id: Option<&str>,
        page: Option<Pagination>,
    ) -> Result<Page<ServiceTitle>, ClientError> {
        let page = page.unwrap_or(Pagination::first(CATALOG_PAGE_SIZE));
        let request = self
            .request(Identity::User, Method::GET, "/user/service-titles/search")
            .query("query", query)
            .query_opt("platformId", platform_id)
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn services(
        &self,
        service_title_id: &str,
        page: Option<Pagination>,
    ) -> Result<Page<Service>, ClientError> {
        let page = page.unwrap_or(Pagination::first(CATALOG_PAGE_SIZE));
        let request = self
            .request(Identity::User, Method::GET, "/user/services")
            .query("serviceTitleId", service_title_id)
            .query_pairs(page.query());
        self.execute(request).await
    }

    pub async fn search_services(
        &self,
        query: &str,
        service_title_id: Option<&str>,
        page: Option<Pagination>,
    ) -> Result<Page<Service>, ClientError> {
        let page = page.unwrap_or(Pagination::first(CATALOG_PAGE_SIZE));
        let request = self
            .request(Identity::User, Method::GET, "/user/services/search")
            .query("query", query)
            .query_opt("serviceTitleId", service_title_id)
            .query_pairs(page.query());
        self.execute(request).await
    }

    /// Look a service up by id or slug
    pub async fn service(&self, id_or_slug: &str) -> Result<Service, ClientError> {
        let request = self.request(
            Identity::User,
            Method::GET,
            &format!("/user/services/{}", segment(id_or_slug)),
        );
        self.execute(request).await
    }
}
