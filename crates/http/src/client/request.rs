//! Replayable request descriptions
//!
//! A `reqwest::RequestBuilder` is consumed on send and cannot always be
//! cloned (multipart bodies are streams), so requests are described with
//! owned data and turned into a builder for every attempt.

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value as JsonValue;
use smm_core::Identity;

use super::error::ClientError;
use crate::types::Upload;

/// Percent-encode one path segment, so ids cannot reach other endpoints
pub fn segment(raw: &str) -> String {
    // form encoding turns spaces into `+` and escapes literal `+` as `%2B`
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// One multipart field
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: Option<String>,
        bytes: Bytes,
    },
}

/// Multipart body kept as owned parts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Multipart {
    parts: Vec<FormPart>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a text field only when a value is present
    pub fn text_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.text(name, value),
            None => self,
        }
    }

    pub fn file(mut self, name: impl Into<String>, upload: Upload) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: upload.file_name,
            content_type: upload.content_type,
            bytes: upload.bytes,
        });
        self
    }

    pub fn file_opt(self, name: impl Into<String>, upload: Option<Upload>) -> Self {
        match upload {
            Some(upload) => self.file(name, upload),
            None => self,
        }
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    #[cfg(test)]
    pub(crate) fn field(&self, wanted: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            FormPart::Text { name, value } if name == wanted => Some(value.as_str()),
            _ => None,
        })
    }

    #[cfg(test)]
    pub(crate) fn has_file(&self, wanted: &str) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, FormPart::File { name, .. } if name == wanted))
    }

    fn to_form(&self) -> Result<reqwest::multipart::Form, ClientError> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mut file = reqwest::multipart::Part::bytes(bytes.to_vec())
                        .file_name(file_name.clone());
                    if let Some(content_type) = content_type {
                        file = file.mime_str(content_type)?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(JsonValue),
    Multipart(Multipart),
}

/// A request bound to the identity whose credentials it carries
#[derive(Debug, Clone)]
pub struct ApiRequest {
    identity: Identity,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    raw_query: Option<String>,
    body: RequestBody,
}

impl ApiRequest {
    pub fn new(identity: Identity, method: Method, path: impl Into<String>) -> Self {
        Self {
            identity,
            method,
            path: path.into(),
            query: Vec::new(),
            raw_query: None,
            body: RequestBody::Empty,
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter if present
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn query_pairs<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    /// Use a pre-encoded query string verbatim
    ///
    /// Some endpoints expect shapes `serde_urlencoded` cannot produce,
    /// such as `?=term`.
    pub fn raw_query(mut self, query: impl Into<String>) -> Self {
        self.raw_query = Some(query.into());
        self
    }

    /// Send `body` as JSON
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, form: Multipart) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub(crate) fn url(&self, base_url: &str) -> String {
        match &self.raw_query {
            Some(raw) => format!("{base_url}{}?{raw}", self.path),
            None => format!("{base_url}{}", self.path),
        }
    }

    /// Build a fresh builder for one attempt
    pub(crate) fn build(
        &self,
        client: &reqwest::Client,
        base_url: &str,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let mut builder = client.request(self.method.clone(), self.url(base_url));
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        builder = match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
        };
        Ok(builder)
    }
}
