//! HTTP client
//!
//! Thin wrapper over `reqwest`: joins paths onto the base URL, attaches the
//! bearer token, and turns non-success statuses into [`ApiError::Http`]
//! with the backend's message extracted from the body.

use crate::error::ApiError;
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL, e.g. `https://api.example.com/api`
    pub base_url: String,
    /// Per-request timeout; `None` waits indefinitely
    #[serde(default, with = "opt_secs")]
    pub timeout: Option<Duration>,
    /// `User-Agent` header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("numero/{}", crate::VERSION)
}

impl ApiConfig {
    /// Config for a base URL with defaults
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            user_agent: default_user_agent(),
        }
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000/api")
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

/// REST client for the numerology backend
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.has_token())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client
    ///
    /// # Errors
    /// - `ApiError::InvalidUrl` if the base URL does not parse
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    /// Base URL without trailing slash
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a bearer token is set
    #[inline]
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// Replace the bearer token
    pub fn set_token(&self, token: Option<&str>) {
        *self.token.write() = token.map(str::to_string);
    }

    /// Absolute URL for an API path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request builder with auth header attached
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.token.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Request builder that fails without a session
    pub(crate) fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        if !self.has_token() {
            return Err(ApiError::NotAuthenticated);
        }
        Ok(self.request(method, path))
    }

    /// Send and decode a JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = self.execute(req).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ApiError::from)
    }

    /// Send and decode, mapping 404 to `None`
    pub(crate) async fn send_optional<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        match self.send_json(req).await {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::Http { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Send and ignore the body
    pub(crate) async fn send_empty(&self, req: RequestBuilder) -> Result<(), ApiError> {
        self.execute(req).await.map(|_| ())
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        tracing::debug!(url = %resp.url(), status = status.as_u16(), "API response");

        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::from_response(status.as_u16(), &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        let err = ApiClient::new(ApiConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn joins_paths() {
        let client = ApiClient::new(ApiConfig::new("https://api.example.com/api/")).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/api");
        assert_eq!(
            client.url("/auth/login/"),
            "https://api.example.com/api/auth/login/"
        );
        assert_eq!(
            client.url("users/profile/"),
            "https://api.example.com/api/users/profile/"
        );
    }

    #[test]
    fn bearer_token_is_attached() {
        let client = ApiClient::new(ApiConfig::default()).unwrap();
        let anonymous = client.request(Method::GET, "/users/profile/").build().unwrap();
        assert!(anonymous.headers().get("authorization").is_none());

        client.set_token(Some("tok"));
        let authed = client.request(Method::GET, "/users/profile/").build().unwrap();
        assert_eq!(authed.headers()["authorization"], "Bearer tok");
    }

    #[test]
    fn authed_requires_token() {
        let client = ApiClient::new(ApiConfig::default()).unwrap();
        assert!(matches!(
            client.authed(Method::GET, "/users/profile/"),
            Err(ApiError::NotAuthenticated)
        ));
    }

    #[test]
    fn debug_hides_token() {
        let client = ApiClient::new(ApiConfig::default()).unwrap();
        client.set_token(Some("secret-token"));
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("authenticated: true"));
    }

    #[test]
    fn config_timeout_in_seconds() {
        let config: ApiConfig =
            serde_json::from_str(r#"{"base_url": "http://x", "timeout": 30}"#).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert!(config.user_agent.starts_with("numero/"));
    }
}
