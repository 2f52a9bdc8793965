//! # API Client
//!
//! Shared HTTP plumbing for every storefront API call: URL building, bearer
//! auth and mapping of non-2xx responses onto `ShopError`.

use crate::config::ApiConfig;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shop_core::{AuthSession, ShopError, ShopResult};
use tracing::{debug, error};

pub(crate) const PROVIDER: &str = "storefront-api";

/// Client for the storefront REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ShopError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(ApiConfig::from_env()?)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Request for the API path made of `segments`
    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> ShopResult<RequestBuilder> {
        Ok(self.client.request(method, self.config.url(segments)?))
    }

    /// Request carrying the session's bearer token
    pub(crate) fn authed(
        &self,
        method: Method,
        segments: &[&str],
        session: &AuthSession,
    ) -> ShopResult<RequestBuilder> {
        let bearer = session.bearer()?;
        Ok(self
            .request(method, segments)?
            .header("Authorization", bearer))
    }

    /// Send and decode a JSON body
    pub(crate) async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ShopResult<T> {
        let body = self.send_raw(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse API response: {}", e))
        })
    }

    /// Send and ignore the response body
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> ShopResult<()> {
        self.send_raw(request).await.map(|_| ())
    }

    async fn send_raw(&self, request: RequestBuilder) -> ShopResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        let url = response.url().path().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("API error: {} {} body={}", status, url, body);
            return Err(error_for_status(status, &body));
        }

        debug!("API {} {}", status, url);
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub(crate) fn error_for_status(status: StatusCode, body: &str) -> ShopError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ShopError::Auth(message),
        StatusCode::NOT_FOUND => ShopError::NotFound(message),
        _ => ShopError::Provider {
            provider: PROVIDER.to_string(),
            message,
        },
    }
}
