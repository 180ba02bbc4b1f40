//! SMM panel HTTP client
//!
//! Every request names the [`Identity`] it runs as. The matching session's
//! access token is attached as a bearer credential; a 401 triggers one
//! shared refresh for that session and a single replay of the request.

pub mod account;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod error;
pub mod orders;
pub mod refresh;
pub mod request;
pub mod wallet;

use std::sync::Arc;
use std::time::Duration;

use error::ClientError;
use refresh::{HttpTokenRefresher, Refreshers};
use request::ApiRequest;
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode, header};
use serde_json::Value as JsonValue;
use smm_core::{Identity, MemoryTokenStorage, SessionStore, Sessions, TokenStorage};
use tracing::debug;

/// Default upper bound for a token refresh
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("smm-client/", env!("CARGO_PKG_VERSION"));

/// Marketplace API client
#[derive(Clone)]
pub struct SmmClient {
    client: Client,
    base_url: String,
    sessions: Sessions,
    refreshers: Arc<Refreshers>,
}

impl SmmClient {
    /// Create a new client with default configuration and in-memory sessions
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> SmmClientBuilder {
        SmmClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub fn session(&self, identity: Identity) -> &Arc<SessionStore> {
        self.sessions.get(identity)
    }

    /// Start describing a request made as `identity`
    pub fn request(&self, identity: Identity, method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(identity, method, path)
    }

    /// Send a request, recovering once from an expired access token
    ///
    /// Returns the response only if its status is a success.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let identity = request.identity();
        let session = self.sessions.get(identity);

        let token = session.access_token();
        let response = self.dispatch(request, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check(response).await;
        }

        // A refresh that finished while this attempt was on the wire already
        // replaced the rejected token
        let token = match session.access_token() {
            Some(current) if token.as_deref() != Some(current.as_str()) => {
                debug!(
                    %identity,
                    path = request.path(),
                    "Access token replaced meanwhile, replaying"
                );
                current
            }
            _ => {
                debug!(%identity, path = request.path(), "Access token rejected, refreshing");
                self.refreshers.get(identity).recover(session).await?
            }
        };

        // Second and last attempt: a repeated 401 is returned as is
        let response = self.dispatch(request, Some(&token)).await?;
        Self::check(response).await
    }

    /// Execute a request and decode its JSON body
    ///
    /// An empty body decodes as JSON `null`, or as `{}` for types that only
    /// accept objects.
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        let response = self.send(&request).await?;
        let body = response.bytes().await?;
        if body.is_empty() {
            Ok(serde_json::from_value(JsonValue::Null)
                .or_else(|_| serde_json::from_value(JsonValue::Object(Default::default())))?)
        } else {
            Ok(serde_json::from_slice(&body)?)
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut builder = request.build(&self.client, &self.base_url)?;
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        debug!(
            identity = %request.identity(),
            method = %request.method(),
            path = request.path(),
            authenticated = token.is_some(),
            "Sending request"
        );
        Ok(builder.send().await?)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }
}

impl std::fmt::Debug for SmmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmmClient")
            .field("base_url", &self.base_url)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

/// Builder for SmmClient
#[derive(Default)]
pub struct SmmClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    refresh_timeout: Option<Duration>,
    user_agent: Option<String>,
    sessions: Option<Sessions>,
    token_storage: Option<Arc<dyn TokenStorage>>,
}

impl SmmClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bound how long a token refresh may take before it counts as failed
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use existing sessions instead of loading new ones
    pub fn sessions(mut self, sessions: Sessions) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Load sessions from this storage; ignored when sessions are given
    pub fn token_storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.token_storage = Some(storage);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<SmmClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url}: {e}")))?;

        let mut client_builder = ClientBuilder::new()
            .user_agent(self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT));
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let client = client_builder.build()?;

        let sessions = match self.sessions {
            Some(sessions) => sessions,
            None => {
                let storage = self
                    .token_storage
                    .unwrap_or_else(|| Arc::new(MemoryTokenStorage::new()));
                let refresher = HttpTokenRefresher::new(client.clone(), base_url.clone());
                Sessions::load(storage, Arc::new(refresher))
            }
        };

        let refresh_timeout = self.refresh_timeout.unwrap_or(DEFAULT_REFRESH_TIMEOUT);

        Ok(SmmClient {
            client,
            base_url,
            sessions,
            refreshers: Arc::new(Refreshers::new(refresh_timeout)),
        })
    }
}
