//! Orders placed against catalog services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::catalog::ServiceType;
use super::{HasId, Ref, string_or_number};

/// Service as populated inside an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderService {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
}

impl HasId for OrderService {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Account as populated inside admin order and deposit listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub balance: Option<f64>,
}

impl HasId for UserSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<Ref<UserSummary>>,
    pub service: Ref<OrderService>,
    #[serde(default)]
    pub quantity: Option<u64>,
    /// `Pending`, `Processing`, `Completed`, `Rejected` or a provider status
    pub status: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub charge: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    /// `secsers` or `manual`
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub order_number: Option<u64>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl HasId for Order {
    fn id(&self) -> &str {
        &self.id
    }
}

/// The signed-in user's orders, with paging filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderList {
    pub items: Vec<Order>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl OrderList {
    /// Fill in paging the backend left out
    ///
    /// A body without an `items` array reads as an empty first page; a zero
    /// or missing total falls back to the number of items.
    pub(crate) fn normalize(body: JsonValue, requested_page: u32) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            items: Vec<Order>,
            #[serde(default)]
            total: Option<u64>,
            #[serde(default)]
            page: Option<u32>,
            #[serde(default)]
            total_pages: Option<u32>,
        }

        if !body.get("items").is_some_and(JsonValue::is_array) {
            return Ok(Self {
                items: Vec::new(),
                total: 0,
                page: 1,
                total_pages: 1,
            });
        }

        let raw: Raw = serde_json::from_value(body)?;
        let total = raw
            .total
            .filter(|total| *total > 0)
            .unwrap_or(raw.items.len() as u64);
        Ok(Self {
            total,
            page: raw.page.filter(|page| *page > 0).unwrap_or(requested_page),
            total_pages: raw.total_pages.filter(|pages| *pages > 0).unwrap_or(1),
            items: raw.items,
        })
    }
}

/// A new order from the storefront
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrder {
    /// Slug or id of the service being bought
    pub service: String,
    pub quantity: u64,
    pub service_type: ServiceType,
    /// Upstream service id, required for [`ServiceType::Api`]
    pub provider_service_id: Option<String>,
    /// Target profile or post, required for [`ServiceType::Api`]
    pub link: Option<String>,
}

/// What the backend answered to a placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Id of the new order, whichever field carried it
    pub order_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Full response body
    pub body: JsonValue,
}

impl OrderReceipt {
    pub(crate) fn from_body(body: JsonValue) -> Self {
        let order_id = ["order_id", "orderId", "id", "order"]
            .iter()
            .find_map(|key| match body.get(*key) {
                Some(JsonValue::String(id)) => Some(id.clone()),
                Some(JsonValue::Number(id)) => Some(id.to_string()),
                _ => None,
            });
        let message = body
            .get("message")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        Self {
            order_id,
            message,
            body,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProviderOrderRequest<'a> {
    pub service: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_service_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<&'a str>,
    pub quantity: u64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ManualOrderRequest<'a> {
    pub service: &'a str,
    pub quantity: u64,
    pub provider: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ConfirmOrderRequest {
    pub notes: String,
}

/// Reason attached to a rejected order or deposit
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RejectRequest {
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_with_populated_service() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o1",
            "userId": "u1",
            "service": {"_id": "s1", "name": "Followers", "serviceType": "api"},
            "quantity": 500,
            "status": "Processing",
            "charge": "1",
            "currency": "USD",
            "provider": "secsers",
            "orderNumber": 1042,
            "createdAt": "2024-05-01T10:00:00.000Z",
            "updatedAt": "2024-05-01T10:05:00.000Z"
        }))
        .unwrap();

        assert_eq!(order.service.id(), "s1");
        assert_eq!(order.user_id.as_ref().map(Ref::id), Some("u1"));
        assert_eq!(order.charge.as_deref(), Some("1"));
        assert_eq!(order.order_number, Some(1042));
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_order_list_fills_missing_paging() {
        let list = OrderList::normalize(
            json!({"items": [{"_id": "o1", "service": "s1", "status": "Pending"}], "total": 0}),
            3,
        )
        .unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.page, 3);
        assert_eq!(list.total_pages, 1);

        let empty = OrderList::normalize(json!({"message": "nothing here"}), 2).unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.page, 1);
    }

    #[test]
    fn test_receipt_picks_up_any_id_field() {
        assert_eq!(
            OrderReceipt::from_body(json!({"order": 88123})).order_id.as_deref(),
            Some("88123")
        );
        assert_eq!(
            OrderReceipt::from_body(json!({"orderId": "abc", "id": "ignored"}))
                .order_id
                .as_deref(),
            Some("abc")
        );
        assert!(OrderReceipt::from_body(json!({})).order_id.is_none());
    }

    #[test]
    fn test_order_with_numeric_charge() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o2",
            "service": "s2",
            "status": "Pending",
            "charge": 2.75
        }))
        .unwrap();

        assert_eq!(order.service, Ref::Id("s2".to_string()));
        assert_eq!(order.charge.as_deref(), Some("2.75"));
    }
}
