//! Handler references and raw handler output
//!
//! A capability never executes anything itself. It points at a handler, which
//! is either a remote HTTP endpoint (the only form a config document can
//! express) or an in-process [`LocalHandler`] supplied by code that builds a
//! configuration directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Untyped argument map passed to handlers
pub type JsonObject = Map<String, Value>;

/// Output of a handler before it is shaped into a protocol response
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Text(String),
    Json(Value),
    Binary(Vec<u8>),
}

impl RawResult {
    /// Classifies a parsed JSON value; a JSON string is plain text.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => RawResult::Text(text),
            other => RawResult::Json(other),
        }
    }

    /// Renders the result as text. Structured data is pretty-printed and
    /// binary data is base64-encoded.
    pub fn into_text(self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        match self {
            RawResult::Text(text) => text,
            RawResult::Json(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
            RawResult::Binary(bytes) => STANDARD.encode(bytes),
        }
    }
}

impl From<String> for RawResult {
    fn from(text: String) -> Self {
        RawResult::Text(text)
    }
}

impl From<&str> for RawResult {
    fn from(text: &str) -> Self {
        RawResult::Text(text.to_string())
    }
}

impl From<Value> for RawResult {
    fn from(value: Value) -> Self {
        RawResult::from_json(value)
    }
}

impl From<Vec<u8>> for RawResult {
    fn from(bytes: Vec<u8>) -> Self {
        RawResult::Binary(bytes)
    }
}

/// In-process handler for configurations built in code
#[async_trait]
pub trait LocalHandler: Send + Sync {
    async fn invoke(&self, args: JsonObject) -> anyhow::Result<RawResult>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> LocalHandler for FnHandler<F>
where
    F: Fn(JsonObject) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<RawResult>> + Send + 'static,
{
    async fn invoke(&self, args: JsonObject) -> anyhow::Result<RawResult> {
        (self.0)(args).await
    }
}

/// Shared pointer to a [`LocalHandler`]
///
/// Two `LocalFn`s are equal only when they point at the same handler value,
/// so rebuilding a static config with fresh closures counts as a change.
#[derive(Clone)]
pub struct LocalFn(Arc<dyn LocalHandler>);

impl LocalFn {
    pub fn new(handler: impl LocalHandler + 'static) -> Self {
        Self(Arc::new(handler))
    }

    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<RawResult>> + Send + 'static,
    {
        Self(Arc::new(FnHandler(f)))
    }

    pub fn handler(&self) -> Arc<dyn LocalHandler> {
        Arc::clone(&self.0)
    }
}

impl PartialEq for LocalFn {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl fmt::Debug for LocalFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LocalFn(..)")
    }
}

/// Remote handler address
///
/// Accepts either a bare URL string or an object form in config documents:
///
/// ```json
/// "https://handlers.example.com/echo"
/// { "url": "https://handlers.example.com/echo", "headers": {"X-Api-Key": "k"}, "timeoutMs": 5000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EndpointRepr", rename_all = "camelCase")]
pub struct Endpoint {
    pub url: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Url(String),
    #[serde(rename_all = "camelCase")]
    Full {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
}

impl From<EndpointRepr> for Endpoint {
    fn from(repr: EndpointRepr) -> Self {
        match repr {
            EndpointRepr::Url(url) => Endpoint::new(url),
            EndpointRepr::Full {
                url,
                headers,
                timeout_ms,
            } => Endpoint {
                url,
                headers,
                timeout_ms,
            },
        }
    }
}

/// What a capability delegates execution to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HandlerRef {
    Remote(Endpoint),
    #[serde(skip)]
    Local(LocalFn),
}

impl HandlerRef {
    pub fn remote(url: impl Into<String>) -> Self {
        HandlerRef::Remote(Endpoint::new(url))
    }

    pub fn local<F, Fut>(f: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<RawResult>> + Send + 'static,
    {
        HandlerRef::Local(LocalFn::from_fn(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_from_bare_url() {
        let handler: HandlerRef = serde_json::from_value(json!("http://localhost/echo")).unwrap();
        assert_eq!(handler, HandlerRef::remote("http://localhost/echo"));
    }

    #[test]
    fn test_endpoint_from_object() {
        let handler: HandlerRef = serde_json::from_value(json!({
            "url": "http://localhost/echo",
            "headers": {"X-Api-Key": "secret"},
            "timeoutMs": 1500,
            "retries": 3
        }))
        .unwrap();

        let HandlerRef::Remote(endpoint) = handler else {
            panic!("expected remote handler");
        };
        assert_eq!(endpoint.url, "http://localhost/echo");
        assert_eq!(endpoint.headers.get("X-Api-Key").map(String::as_str), Some("secret"));
        assert_eq!(endpoint.timeout_ms, Some(1500));
    }

    #[test]
    fn test_local_handlers_compare_by_identity() {
        let a = HandlerRef::local(|_| async { Ok(RawResult::from("a")) });
        let b = HandlerRef::local(|_| async { Ok(RawResult::from("a")) });

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_raw_result_text_rendering() {
        assert_eq!(RawResult::from(json!("hi")).into_text(), "hi");
        assert_eq!(
            RawResult::from(json!({"a": 1})).into_text(),
            "{\n  \"a\": 1\n}"
        );
        assert_eq!(RawResult::Binary(vec![0, 1, 2]).into_text(), "AAEC");
    }
}
