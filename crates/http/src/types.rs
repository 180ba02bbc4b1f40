//! Request and response types of the marketplace API
//!
//! The backend is a MongoDB service: identifiers arrive as `_id`, fields are
//! camelCase, and related records are sometimes populated inline and
//! sometimes sent as a bare id.

pub mod account;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod orders;
pub mod wallet;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: None,
            page_size: None,
            total_pages: None,
        }
    }
}

/// Page number and size sent as query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub const fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// First page with the given size
    pub const fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }

    pub(crate) fn query(self) -> [(&'static str, String); 2] {
        [
            ("page", self.page.to_string()),
            ("pageSize", self.page_size.to_string()),
        ]
    }
}

/// A related record that may or may not be populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Populated(T),
    Id(String),
}

impl<T: HasId> Ref<T> {
    /// Id of the referenced record either way
    pub fn id(&self) -> &str {
        match self {
            Self::Populated(record) => record.id(),
            Self::Id(id) => id,
        }
    }
}

/// Records carrying a backend id
pub trait HasId {
    fn id(&self) -> &str;
}

/// Minimal populated reference: id and display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl HasId for NamedRef {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Visibility of a catalog entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveStatus {
    #[default]
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl ActiveStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Unknown => "unknown",
        }
    }
}

/// A file attached to a multipart request
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Plain acknowledgement returned by mutating endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Accept a JSON string or number, keeping its textual form
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ref_accepts_id_or_record() {
        let bare: Ref<NamedRef> = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(bare.id(), "abc");

        let populated: Ref<NamedRef> =
            serde_json::from_value(json!({"_id": "def", "name": "Instagram"})).unwrap();
        assert_eq!(populated.id(), "def");
        assert!(matches!(populated, Ref::Populated(NamedRef { ref name, .. }) if name == "Instagram"));
    }

    #[test]
    fn test_page_tolerates_missing_fields() {
        let page: Page<NamedRef> = serde_json::from_value(json!({"items": []})).unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, None);
    }

    #[test]
    fn test_unknown_status() {
        let status: ActiveStatus = serde_json::from_value(json!("archived")).unwrap();
        assert_eq!(status, ActiveStatus::Unknown);
    }
}
