//! Handler invocation
//!
//! Bridges a capability's [`HandlerRef`] to the transport that executes it and
//! normalizes every failure into an [`InvokeError`].
//!
//! ```text
//! HandlerRef::Remote ──> InvocationTransport::call ──> status check ──> body decode
//! HandlerRef::Local  ──> spawned LocalHandler::invoke (panics caught)
//! ```
//!
//! Each invocation is a single attempt. Retries, if wanted, belong in the
//! transport.

use crate::error::InvokeError;
use crate::models::{Endpoint, HandlerRef, JsonObject, LocalFn, RawResult};
use crate::services::http_executor::{InvocationTransport, TransportResponse};
use serde_json::Value;
use std::sync::Arc;

const BINARY_MEDIA_TYPES: &[&str] = &[
    "application/octet-stream",
    "application/pdf",
    "application/zip",
];
const BINARY_MEDIA_PREFIXES: &[&str] = &["image/", "audio/", "video/"];

#[derive(Clone)]
pub struct HandlerInvoker {
    transport: Arc<dyn InvocationTransport>,
}

impl HandlerInvoker {
    pub fn new(transport: Arc<dyn InvocationTransport>) -> Self {
        Self { transport }
    }

    /// Invokes a handler with the given arguments
    ///
    /// `None` arguments are sent as an empty JSON object.
    pub async fn invoke(
        &self,
        handler: &HandlerRef,
        args: Option<JsonObject>,
    ) -> Result<RawResult, InvokeError> {
        let args = args.unwrap_or_default();
        match handler {
            HandlerRef::Remote(endpoint) => self.invoke_remote(endpoint, args).await,
            HandlerRef::Local(local) => invoke_local(local, args).await,
        }
    }

    async fn invoke_remote(
        &self,
        endpoint: &Endpoint,
        args: JsonObject,
    ) -> Result<RawResult, InvokeError> {
        let response = self.transport.call(endpoint, &Value::Object(args)).await?;

        if !response.is_success() {
            tracing::warn!(
                url = %endpoint.url,
                status = response.status,
                "Remote handler returned non-success status"
            );
            return Err(InvokeError::Unavailable(format!(
                "HTTP {} {}",
                response.status, response.status_text
            )));
        }

        decode_body(response)
    }
}

async fn invoke_local(local: &LocalFn, args: JsonObject) -> Result<RawResult, InvokeError> {
    let handler = local.handler();
    let task = tokio::spawn(async move { handler.invoke(args).await });

    match task.await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(InvokeError::Failed(e.to_string())),
        Err(e) if e.is_panic() => Err(InvokeError::Failed("handler panicked".to_string())),
        Err(e) => Err(InvokeError::Failed(e.to_string())),
    }
}

fn is_binary_media_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    BINARY_MEDIA_TYPES.contains(&media_type.as_str())
        || BINARY_MEDIA_PREFIXES
            .iter()
            .any(|prefix| media_type.starts_with(prefix))
}

/// Turns a successful response body into a [`RawResult`]
///
/// Binary media types are passed through untouched. Anything else is read as
/// UTF-8 text and parsed as JSON; an empty body is empty text.
fn decode_body(response: TransportResponse) -> Result<RawResult, InvokeError> {
    if response
        .content_type
        .as_deref()
        .is_some_and(is_binary_media_type)
    {
        return Ok(RawResult::Binary(response.body));
    }

    let text = String::from_utf8(response.body)
        .map_err(|e| InvokeError::MalformedResponse(format!("body is not UTF-8: {}", e)))?;

    if text.trim().is_empty() {
        return Ok(RawResult::Text(String::new()));
    }

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| InvokeError::MalformedResponse(format!("body is not valid JSON: {}", e)))?;

    Ok(RawResult::from_json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::services::http_executor::MockInvocationTransport;
    use serde_json::json;

    fn response(status: u16, content_type: Option<&str>, body: &[u8]) -> TransportResponse {
        TransportResponse {
            status,
            status_text: match status {
                200 => "OK",
                503 => "Service Unavailable",
                _ => "",
            }
            .to_string(),
            content_type: content_type.map(str::to_string),
            body: body.to_vec(),
        }
    }

    fn invoker_returning(response: TransportResponse) -> HandlerInvoker {
        let mut transport = MockInvocationTransport::new();
        transport.expect_call().times(1).returning(move |_, _| {
            let response = response.clone();
            Box::pin(async move { Ok(response) })
        });
        HandlerInvoker::new(Arc::new(transport))
    }

    #[tokio::test]
    async fn test_remote_sends_empty_object_when_args_omitted() {
        let mut transport = MockInvocationTransport::new();
        transport
            .expect_call()
            .withf(|endpoint, body| {
                endpoint.url == "http://h/echo" && body.as_object().is_some_and(|o| o.is_empty())
            })
            .times(1)
            .returning(|_, _| {
                Box::pin(async { Ok(response(200, Some("application/json"), b"\"ok\"")) })
            });

        let invoker = HandlerInvoker::new(Arc::new(transport));
        let result = invoker
            .invoke(&HandlerRef::remote("http://h/echo"), None)
            .await
            .unwrap();

        assert_eq!(result, RawResult::Text("ok".to_string()));
    }

    #[tokio::test]
    async fn test_remote_structured_result() {
        let invoker = invoker_returning(response(200, Some("application/json"), br#"{"n": 3}"#));
        let result = invoker
            .invoke(&HandlerRef::remote("http://h/x"), None)
            .await
            .unwrap();

        assert_eq!(result, RawResult::Json(json!({"n": 3})));
    }

    #[tokio::test]
    async fn test_remote_non_success_is_unavailable() {
        let invoker = invoker_returning(response(503, None, b"down"));
        let err = invoker
            .invoke(&HandlerRef::remote("http://h/x"), None)
            .await
            .unwrap_err();

        match err {
            InvokeError::Unavailable(msg) => assert_eq!(msg, "HTTP 503 Service Unavailable"),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_transport_fault_is_unavailable() {
        let mut transport = MockInvocationTransport::new();
        transport
            .expect_call()
            .returning(|_, _| Box::pin(async { Err(TransportError::Timeout(100)) }));

        let invoker = HandlerInvoker::new(Arc::new(transport));
        let err = invoker
            .invoke(&HandlerRef::remote("http://h/x"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::Unavailable(msg) if msg.contains("100ms")));
    }

    #[tokio::test]
    async fn test_remote_invalid_json_is_malformed() {
        let invoker = invoker_returning(response(200, Some("text/plain"), b"not json"));
        let err = invoker
            .invoke(&HandlerRef::remote("http://h/x"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_remote_binary_media_type_is_passed_through() {
        let invoker = invoker_returning(response(200, Some("image/png; q=1"), &[0x89, 0x50]));
        let result = invoker
            .invoke(&HandlerRef::remote("http://h/x"), None)
            .await
            .unwrap();

        assert_eq!(result, RawResult::Binary(vec![0x89, 0x50]));
    }

    #[tokio::test]
    async fn test_remote_empty_body_is_empty_text() {
        let invoker = invoker_returning(response(204, None, b""));
        let result = invoker
            .invoke(&HandlerRef::remote("http://h/x"), None)
            .await
            .unwrap();

        assert_eq!(result, RawResult::Text(String::new()));
    }

    #[tokio::test]
    async fn test_local_handler_receives_arguments() {
        let invoker = HandlerInvoker::new(Arc::new(MockInvocationTransport::new()));
        let handler = HandlerRef::local(|args| async move {
            Ok(RawResult::from(args.get("msg").cloned().unwrap_or_default()))
        });

        let mut args = JsonObject::new();
        args.insert("msg".to_string(), json!("hi"));

        let result = invoker.invoke(&handler, Some(args)).await.unwrap();
        assert_eq!(result, RawResult::Text("hi".to_string()));
    }

    #[tokio::test]
    async fn test_local_handler_error_and_panic_are_failures() {
        let invoker = HandlerInvoker::new(Arc::new(MockInvocationTransport::new()));

        let failing = HandlerRef::local(|_| async { Err(anyhow::anyhow!("boom")) });
        let err = invoker.invoke(&failing, None).await.unwrap_err();
        assert!(matches!(err, InvokeError::Failed(msg) if msg == "boom"));

        let panicking = HandlerRef::local(|_| async {
            if true {
                panic!("unexpected");
            }
            Ok(RawResult::from("unreachable"))
        });
        let err = invoker.invoke(&panicking, None).await.unwrap_err();
        assert!(matches!(err, InvokeError::Failed(msg) if msg == "handler panicked"));
    }
}
