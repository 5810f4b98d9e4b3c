//! HTTP transport for the SecurityTrails API.
//!
//! Handlers only describe requests ([`ApiRequest`]); a [`Transport`] sends
//! them. Production code uses [`HttpTransport`], tests plug in a mock.

use crate::error::TrailsError;
use crate::types::TrailsConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "APIKEY";

/// HTTP method of an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
}

/// A request relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    /// Path (and query) appended to the base URL, without a leading `/`
    pub path: String,
    /// JSON body for POST requests
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Create a GET request.
    pub fn get<P: Into<String>>(path: P) -> Self {
        Self {
            method: ApiMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    /// Create a POST request with a JSON body.
    pub fn post<P: Into<String>>(path: P, body: serde_json::Value) -> Self {
        Self {
            method: ApiMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Raw response: status plus body text. Status classification and decoding
/// happen in the command layer so every transport behaves the same.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new<B: Into<String>>(status: u16, body: B) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns the raw response.
///
/// `label` identifies the item(s) the request is for; it is attached to
/// any error so failures stay traceable.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest, label: &str) -> Result<ApiResponse, TrailsError>;
}

/// reqwest-backed transport authenticating with the `APIKEY` header.
#[derive(Clone)]
pub struct HttpTransport {
    /// HTTP client, shared by all workers
    http_client: reqwest::Client,
    /// Base URL ending with `/`
    base_url: String,
    /// SecurityTrails API key
    api_key: String,
    /// Per-request timeout, if any
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Create a transport from the resolved configuration.
    pub fn from_config(config: &TrailsConfig) -> Result<Self, TrailsError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("haktrails/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90));

        let timeout = config.timeout.filter(|t| !t.is_zero());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder.build().map_err(|e| {
            TrailsError::config(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    /// Full URL for a request path.
    pub fn url_for(&self, request: &ApiRequest) -> String {
        format!(
            "{}{}",
            self.base_url,
            request.path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest, label: &str) -> Result<ApiResponse, TrailsError> {
        let url = self.url_for(request);
        tracing::debug!("{:?} {} ({})", request.method, url, label);

        let builder = match request.method {
            ApiMethod::Get => self.http_client.get(&url),
            ApiMethod::Post => self.http_client.post(&url),
        };
        let mut builder = builder
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e, label))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_error(e, label))?;

        tracing::debug!("{} -> HTTP {} ({} bytes)", url, status, body.len());
        Ok(ApiResponse { status, body })
    }
}

impl HttpTransport {
    fn map_error(&self, err: reqwest::Error, label: &str) -> TrailsError {
        if err.is_timeout() {
            TrailsError::timeout(label, self.timeout.unwrap_or_default())
        } else {
            TrailsError::from(err).for_item(label)
        }
    }
}
