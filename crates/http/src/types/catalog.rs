//! Catalog records: categories, platforms, service titles and services

use serde::{Deserialize, Serialize};

use super::{ActiveStatus, HasId, NamedRef, Ref, Upload, string_or_number};
use crate::client::request::Multipart;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<Ref<NamedRef>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTitle {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub platform_id: Option<Ref<NamedRef>>,
}

/// How an order for a service is fulfilled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// Forwarded to the upstream provider API
    Api,
    /// Fulfilled by hand from the back office
    Local,
}

impl ServiceType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Local => "local",
        }
    }
}

/// Service title as populated inside an admin service listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTitleSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub platform: Option<PlatformSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<NamedRef>,
}

/// A purchasable service
///
/// The storefront sends `userPrice`; the back office additionally sees the
/// cost `price` and the provider mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub user_price: Option<f64>,
    #[serde(default)]
    pub stock: Option<u64>,
    #[serde(default)]
    pub min: u64,
    #[serde(default)]
    pub max: u64,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub provider_service_id: Option<String>,
    #[serde(default)]
    pub service_title_id: Option<String>,
    #[serde(default)]
    pub service_title: Option<ServiceTitleSummary>,
}

impl Service {
    /// Whether `quantity` is inside the allowed order range
    pub fn accepts_quantity(&self, quantity: u64) -> bool {
        quantity >= self.min && (self.max == 0 || quantity <= self.max)
    }
}

macro_rules! impl_has_id {
    ($($ty:ty),+) => {
        $(impl HasId for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })+
    };
}

impl_has_id!(Category, Platform, ServiceTitle, Service);

/// Create/update payload for a category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryForm {
    pub name: String,
    pub description: Option<String>,
    pub status: ActiveStatus,
    pub image: Option<Upload>,
}

impl CategoryForm {
    pub(crate) fn into_multipart(self) -> Multipart {
        Multipart::new()
            .text("name", self.name)
            .text_opt("description", self.description)
            .text("status", self.status.as_str())
            .file_opt("image", self.image)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformForm {
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub status: ActiveStatus,
    pub image: Option<Upload>,
}

impl PlatformForm {
    pub(crate) fn into_multipart(self) -> Multipart {
        Multipart::new()
            .text("name", self.name)
            .text("description", self.description.unwrap_or_default())
            .text("categoryId", self.category_id)
            .text("status", self.status.as_str())
            .file_opt("image", self.image)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTitleForm {
    pub platform_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ActiveStatus,
    pub image: Option<Upload>,
}

impl ServiceTitleForm {
    pub(crate) fn into_multipart(self) -> Multipart {
        Multipart::new()
            .text("platformId", self.platform_id)
            .text("name", self.name)
            .text("description", self.description.unwrap_or_default())
            .text("status", self.status.as_str())
            .file_opt("image", self.image)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceForm {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub min: u64,
    pub max: u64,
    pub service_title_id: String,
    pub status: ActiveStatus,
    pub service_type: ServiceType,
    /// Upstream provider name, only sent for [`ServiceType::Api`]
    pub provider: Option<String>,
    pub provider_service_id: Option<String>,
    pub image: Option<Upload>,
}

impl ServiceForm {
    pub(crate) fn into_multipart(self) -> Multipart {
        let mut form = Multipart::new()
            .text("name", self.name)
            .text("price", self.price.to_string())
            .text("min", self.min.to_string())
            .text("max", self.max.to_string())
            .text("description", self.description)
            .text("serviceTitleId", self.service_title_id)
            .text("status", self.status.as_str())
            .text("serviceType", self.service_type.as_str());
        if self.service_type == ServiceType::Api {
            form = form
                .text("provider", self.provider.unwrap_or_default())
                .text(
                    "providerServiceId",
                    self.provider_service_id.unwrap_or_default(),
                );
        }
        form.file_opt("image", self.image)
    }
}
