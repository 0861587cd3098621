//! Protocol adapter
//!
//! Stateless translation between the active [`CapabilityConfig`] and MCP
//! request/response shapes. Every function takes the config it should answer
//! from; nothing here holds on to a config between calls.
//!
//! | Request          | Lookup key | Handler args  | Failure kind            |
//! |------------------|------------|---------------|-------------------------|
//! | `tools/call`     | name       | call args     | `ToolExecutionFailed`   |
//! | `resources/read` | uri        | none          | `ResourceReadFailed`    |
//! | `prompts/get`    | name       | prompt args   | `PromptExecutionFailed` |

use crate::error::{CapabilityError, CapabilityKind};
use crate::models::{CapabilityConfig, JsonObject, PromptSpec, RawResult, ResourceSpec, ToolSpec};
use crate::services::HandlerInvoker;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, GetPromptResult, Prompt, PromptMessage,
    PromptMessageRole, RawResource, ReadResourceResult, Resource, ResourceContents, Tool,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const DEFAULT_TEXT_MIME_TYPE: &str = "text/plain";
pub const DEFAULT_BINARY_MIME_TYPE: &str = "application/octet-stream";

// ============================================================================
// Tools
// ============================================================================

pub fn list_tools(config: &CapabilityConfig) -> Vec<Tool> {
    config.tools.iter().map(tool_definition).collect()
}

fn tool_definition(spec: &ToolSpec) -> Tool {
    let schema = match &spec.input_schema {
        Value::Object(map) => map.clone(),
        _ => JsonObject::new(),
    };

    Tool::new(spec.name.clone(), spec.description.clone(), Arc::new(schema))
}

/// Invokes a tool and wraps its output as a single text content
///
/// # Errors
///
/// * `CapabilityError::NotFound` - no tool with that name; nothing is invoked
/// * `CapabilityError::ToolExecutionFailed` - the handler failed
pub async fn call_tool(
    config: &CapabilityConfig,
    invoker: &HandlerInvoker,
    name: &str,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, CapabilityError> {
    let spec = config
        .tool(name)
        .ok_or_else(|| CapabilityError::NotFound(CapabilityKind::Tool, name.to_string()))?;

    let raw = invoker
        .invoke(&spec.handler, arguments)
        .await
        .map_err(|e| CapabilityError::ToolExecutionFailed {
            name: name.to_string(),
            message: e.to_string(),
        })?;

    Ok(CallToolResult::success(vec![Content::text(raw.into_text())]))
}

// ============================================================================
// Resources
// ============================================================================

pub fn list_resources(config: &CapabilityConfig) -> Vec<Resource> {
    config.resources.iter().map(resource_definition).collect()
}

fn resource_definition(spec: &ResourceSpec) -> Resource {
    let mut raw = RawResource::new(spec.uri.clone(), spec.name.clone());
    raw.description = spec.description.clone();
    raw.mime_type = spec.mime_type.clone();
    raw.no_annotation()
}

/// Reads a resource through its zero-argument handler
///
/// Binary output is returned base64-encoded under `blob`; anything else under
/// `text`. An unset mime type becomes `text/plain` for text and
/// `application/octet-stream` for binary content.
///
/// # Errors
///
/// * `CapabilityError::NotFound` - no resource with that uri; nothing is invoked
/// * `CapabilityError::ResourceReadFailed` - the handler failed
pub async fn read_resource(
    config: &CapabilityConfig,
    invoker: &HandlerInvoker,
    uri: &str,
) -> Result<ReadResourceResult, CapabilityError> {
    let spec = config
        .resource(uri)
        .ok_or_else(|| CapabilityError::NotFound(CapabilityKind::Resource, uri.to_string()))?;

    let read_failed = |message: String| CapabilityError::ResourceReadFailed {
        uri: uri.to_string(),
        message,
    };

    let raw = invoker
        .invoke(&spec.handler, None)
        .await
        .map_err(|e| read_failed(e.to_string()))?;

    let contents = match raw {
        RawResult::Binary(bytes) => json!({
            "uri": uri,
            "mimeType": spec.mime_type.as_deref().unwrap_or(DEFAULT_BINARY_MIME_TYPE),
            "blob": STANDARD.encode(bytes),
        }),
        other => json!({
            "uri": uri,
            "mimeType": spec.mime_type.as_deref().unwrap_or(DEFAULT_TEXT_MIME_TYPE),
            "text": other.into_text(),
        }),
    };

    let contents: ResourceContents =
        serde_json::from_value(contents).map_err(|e| read_failed(e.to_string()))?;

    Ok(ReadResourceResult {
        contents: vec![contents],
    })
}

// ============================================================================
// Prompts
// ============================================================================

pub fn list_prompts(config: &CapabilityConfig) -> Result<Vec<Prompt>, CapabilityError> {
    config.prompts.iter().map(prompt_definition).collect()
}

fn prompt_definition(spec: &PromptSpec) -> Result<Prompt, CapabilityError> {
    let mut definition = json!({
        "name": spec.name,
        "arguments": spec.arguments,
    });
    if !spec.description.is_empty() {
        definition["description"] = json!(spec.description);
    }

    serde_json::from_value(definition).map_err(|e| CapabilityError::PromptExecutionFailed {
        name: spec.name.clone(),
        message: format!("invalid prompt definition: {}", e),
    })
}

/// Renders a prompt through its handler
///
/// # Errors
///
/// * `CapabilityError::NotFound` - no prompt with that name; nothing is invoked
/// * `CapabilityError::PromptExecutionFailed` - the handler failed or its
///   output could not be turned into messages
pub async fn get_prompt(
    config: &CapabilityConfig,
    invoker: &HandlerInvoker,
    name: &str,
    arguments: Option<JsonObject>,
) -> Result<GetPromptResult, CapabilityError> {
    let spec = config
        .prompt(name)
        .ok_or_else(|| CapabilityError::NotFound(CapabilityKind::Prompt, name.to_string()))?;

    let failed = |message: String| CapabilityError::PromptExecutionFailed {
        name: name.to_string(),
        message,
    };

    let raw = invoker
        .invoke(&spec.handler, arguments)
        .await
        .map_err(|e| failed(e.to_string()))?;

    let messages = prompt_messages(raw).map_err(failed)?;

    Ok(GetPromptResult {
        description: Some(spec.description.clone()).filter(|d| !d.is_empty()),
        messages,
    })
}

/// Normalizes handler output into a message sequence
///
/// Accepts a message array, a `{messages: [...]}` object, a single message
/// object or plain text. Other scalars become one user message holding their
/// JSON rendering.
fn prompt_messages(raw: RawResult) -> Result<Vec<PromptMessage>, String> {
    match raw {
        RawResult::Text(text) => Ok(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            text,
        )]),
        RawResult::Binary(_) => Err("binary output cannot be used as prompt messages".to_string()),
        RawResult::Json(Value::Array(items)) => items.into_iter().map(prompt_message).collect(),
        RawResult::Json(Value::Object(mut map)) => match map.remove("messages") {
            Some(Value::Array(items)) => items.into_iter().map(prompt_message).collect(),
            Some(_) => Err("'messages' is not an array".to_string()),
            None => prompt_message(Value::Object(map)).map(|message| vec![message]),
        },
        RawResult::Json(other) => Ok(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            other.to_string(),
        )]),
    }
}

fn prompt_message(mut value: Value) -> Result<PromptMessage, String> {
    if let Some(Value::String(text)) = value.get("content").cloned() {
        value["content"] = json!({ "type": "text", "text": text });
    }

    serde_json::from_value(value).map_err(|e| format!("invalid prompt message: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messages_json(raw: RawResult) -> Value {
        serde_json::to_value(prompt_messages(raw).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_text_becomes_user_message() {
        let messages = messages_json(RawResult::Text("Say hi".to_string()));
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"]["type"], "text");
        assert_eq!(messages[0]["content"]["text"], "Say hi");
    }

    #[test]
    fn test_message_array_used_as_is() {
        let messages = messages_json(RawResult::Json(json!([
            {"role": "user", "content": {"type": "text", "text": "Q"}},
            {"role": "assistant", "content": {"type": "text", "text": "A"}}
        ])));

        assert_eq!(messages.as_array().map(Vec::len), Some(2));
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"]["text"], "A");
    }

    #[test]
    fn test_single_message_is_wrapped() {
        let messages = messages_json(RawResult::Json(
            json!({"role": "assistant", "content": "shorthand"}),
        ));

        assert_eq!(messages.as_array().map(Vec::len), Some(1));
        assert_eq!(messages[0]["role"], "assistant");
        assert_eq!(messages[0]["content"]["text"], "shorthand");
    }

    #[test]
    fn test_messages_envelope() {
        let messages = messages_json(RawResult::Json(json!({
            "description": "ignored",
            "messages": [{"role": "user", "content": "hello"}]
        })));

        assert_eq!(messages[0]["content"]["text"], "hello");
    }

    #[test]
    fn test_non_message_object_is_rejected() {
        let result = prompt_messages(RawResult::Json(json!({"foo": "bar"})));
        assert!(result.unwrap_err().contains("invalid prompt message"));
    }

    #[test]
    fn test_binary_is_rejected() {
        assert!(prompt_messages(RawResult::Binary(vec![1, 2])).is_err());
    }

    #[test]
    fn test_tool_definition_passes_schema_through() {
        let schema = json!({"type": "object", "properties": {"msg": {"type": "string"}}});
        let spec = ToolSpec::new("echo", crate::models::HandlerRef::remote("http://h/echo"))
            .with_description("Echo")
            .with_input_schema(schema.clone());

        let tool = serde_json::to_value(tool_definition(&spec)).unwrap();
        assert_eq!(tool["name"], "echo");
        assert_eq!(tool["description"], "Echo");
        assert_eq!(tool["inputSchema"], schema);
    }
}
