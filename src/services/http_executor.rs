//! Outbound HTTP transport for remote handlers
//!
//! Channel-agnostic: the [`InvocationTransport`] trait only knows how to post
//! a JSON body to an [`Endpoint`] and hand back the raw response. Status
//! interpretation and body parsing belong to the
//! [`HandlerInvoker`](crate::services::HandlerInvoker).
//!
//! # Example
//!
//! ```rust,no_run
//! use dynamcp::models::Endpoint;
//! use dynamcp::services::{HttpExecutor, InvocationTransport};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = HttpExecutor::new();
//! let endpoint = Endpoint::new("https://handlers.example.com/echo");
//!
//! let response = executor.call(&endpoint, &json!({"msg": "hi"})).await?;
//! println!("Status: {} {}", response.status, response.status_text);
//! # Ok(())
//! # }
//! ```

use crate::error::TransportError;
use crate::models::Endpoint;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Raw response of a handler endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code (e.g., 200, 404, 500)
    pub status: u16,
    /// Canonical reason phrase for the status
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one request against a handler endpoint
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait InvocationTransport: Send + Sync {
    async fn call(
        &self,
        endpoint: &Endpoint,
        body: &Value,
    ) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed [`InvocationTransport`]
///
/// Posts the JSON body and enforces a timeout on every call, so a hung handler
/// cannot hold a request forever. The per-endpoint `timeoutMs` wins over the
/// executor default.
#[derive(Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpExecutor {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    pub fn with_timeout(default_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            default_timeout,
        }
    }

    fn render_headers(&self, endpoint: &Endpoint) -> Result<HeaderMap, TransportError> {
        let mut header_map = HeaderMap::new();

        for (key, value) in &endpoint.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| TransportError::InvalidHeaders(e.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidHeaders(e.to_string()))?;
            header_map.insert(header_name, header_value);
        }

        Ok(header_map)
    }

    async fn format_response(
        &self,
        response: reqwest::Response,
    ) -> Result<TransportResponse, TransportError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::ResponseBody(e.to_string()))?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            content_type,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl InvocationTransport for HttpExecutor {
    async fn call(
        &self,
        endpoint: &Endpoint,
        body: &Value,
    ) -> Result<TransportResponse, TransportError> {
        let headers = self.render_headers(endpoint)?;
        let timeout = endpoint
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);

        let request = self
            .client
            .post(&endpoint.url)
            .headers(headers)
            .json(body)
            .timeout(timeout)
            .build()
            .map_err(TransportError::RequestFailed)?;

        tracing::debug!(url = %endpoint.url, "Invoking remote handler");

        let response = self.client.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(timeout.as_millis() as u64)
            } else {
                TransportError::RequestFailed(e)
            }
        })?;

        self.format_response(response).await
    }
}
