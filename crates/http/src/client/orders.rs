//! Storefront orders

use reqwest::Method;
use serde_json::Value as JsonValue;
use smm_core::Identity;
use tracing::info;

use super::{ClientError, SmmClient, request::segment};
use crate::types::Pagination;
use crate::types::catalog::ServiceType;
use crate::types::orders::{
    ManualOrderRequest, Order, OrderList, OrderReceipt, PlaceOrder, ProviderOrderRequest,
};

/// Default page size of the order history
pub const ORDERS_PAGE_SIZE: u32 = 20;

impl SmmClient {
    /// The signed-in user's order history
    pub async fn user_orders(&self, page: Option<Pagination>) -> Result<OrderList, ClientError> {
        let page = page.unwrap_or(Pagination::first(ORDERS_PAGE_SIZE));
        let request = self
            .request(Identity::User, Method::GET, "/orders")
            .query_pairs(page.query());
        let body: JsonValue = self.execute(request).await?;
        Ok(OrderList::normalize(body, page.page)?)
    }

    pub async fn user_order(&self, id: &str) -> Result<Order, ClientError> {
        let path = format!("/orders/{}", segment(id));
        let request = self.request(Identity::User, Method::GET, &path);
        self.execute(request).await
    }

    /// Place an order
    ///
    /// Provider-backed services go through the provider bridge; local ones
    /// are queued for manual fulfilment. The backend reports some refusals
    /// with a 2xx status and an `error` field, which is returned as
    /// [`ClientError::Rejected`].
    pub async fn place_order(&self, order: &PlaceOrder) -> Result<OrderReceipt, ClientError> {
        let request = match order.service_type {
            ServiceType::Api => self
                .request(Identity::User, Method::POST, "/secsers/order")
                .json(&ProviderOrderRequest {
                    service: &order.service,
                    provider_service_id: order.provider_service_id.as_deref(),
                    link: order.link.as_deref(),
                    quantity: order.quantity,
                })?,
            ServiceType::Local => self
                .request(Identity::User, Method::POST, "/orders")
                .json(&ManualOrderRequest {
                    service: &order.service,
                    quantity: order.quantity,
                    provider: "manual",
                })?,
        };

        let body: JsonValue = self.execute(request).await?;
        if let Some(error) = body.get("error").filter(|error| !error.is_null()) {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ClientError::Rejected(message));
        }

        let receipt = OrderReceipt::from_body(body);
        info!(
            service = %order.service,
            quantity = order.quantity,
            order_id = receipt.order_id.as_deref().unwrap_or("unknown"),
            "Order placed"
        );
        Ok(receipt)
    }
}
