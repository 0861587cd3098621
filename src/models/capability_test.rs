use super::capability::*;
use super::handler::HandlerRef;
use crate::error::ConfigError;
use serde_json::json;

const DOCUMENT: &str = r#"{
    "tools": [
        {
            "name": "echo",
            "description": "Echo a message",
            "inputSchema": {"type": "object", "properties": {"msg": {"type": "string"}}},
            "handler": "http://handlers.local/echo"
        }
    ],
    "resources": [
        {
            "uri": "docs://readme",
            "name": "Readme",
            "mimeType": "text/markdown",
            "handler": {"url": "http://handlers.local/readme", "timeoutMs": 500}
        }
    ],
    "prompts": [
        {
            "name": "greet",
            "description": "Greet someone",
            "arguments": [{"name": "who", "required": true}],
            "handler": "http://handlers.local/greet"
        }
    ],
    "version": 7
}"#;

#[test]
fn test_parse_full_document() {
    let config = CapabilityConfig::from_json_str(DOCUMENT).unwrap();

    assert_eq!(config.tools.len(), 1);
    assert_eq!(config.tools[0].name, "echo");
    assert_eq!(
        config.tools[0].input_schema["properties"]["msg"]["type"],
        "string"
    );
    assert_eq!(
        config.tools[0].handler,
        HandlerRef::remote("http://handlers.local/echo")
    );

    let resource = config.resource("docs://readme").unwrap();
    assert_eq!(resource.mime_type.as_deref(), Some("text/markdown"));
    assert!(resource.description.is_none());

    let prompt = config.prompt("greet").unwrap();
    let args = prompt.arguments.as_ref().unwrap();
    assert_eq!(args[0].name, "who");
    assert_eq!(args[0].required, Some(true));
}

#[test]
fn test_missing_sections_default_to_empty() {
    let config = CapabilityConfig::from_json_str(r#"{"tools": []}"#).unwrap();
    assert!(config.is_empty());
}

#[test]
fn test_missing_input_schema_defaults_to_empty_object() {
    let config = CapabilityConfig::from_json_str(
        r#"{"tools": [{"name": "noop", "handler": "http://h/noop"}]}"#,
    )
    .unwrap();

    assert_eq!(
        config.tools[0].input_schema,
        json!({"type": "object", "properties": {}})
    );
}

#[test]
fn test_duplicate_tool_names_rejected() {
    let result = CapabilityConfig::from_json_str(
        r#"{"tools": [
            {"name": "a", "handler": "http://h/1"},
            {"name": "a", "handler": "http://h/2"}
        ]}"#,
    );

    match result {
        Err(ConfigError::Invalid(msg)) => assert!(msg.contains("duplicate tool name")),
        other => panic!("expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_duplicate_resource_uris_rejected() {
    let config = CapabilityConfig {
        resources: vec![
            ResourceSpec::new("r://1", "one", HandlerRef::remote("http://h/1")),
            ResourceSpec::new("r://1", "two", HandlerRef::remote("http://h/2")),
        ],
        ..Default::default()
    };

    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_non_object_schema_rejected() {
    let result = CapabilityConfig::from_json_str(
        r#"{"tools": [{"name": "a", "inputSchema": "string", "handler": "http://h/1"}]}"#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_malformed_document() {
    let result = CapabilityConfig::from_json_str(r#"{"tools": [{"name": 1}]"#);
    assert!(matches!(result, Err(ConfigError::Malformed(_))));
}

#[test]
fn test_structural_equality_ignores_instance_identity() {
    let a = CapabilityConfig::from_json_str(DOCUMENT).unwrap();
    let b = CapabilityConfig::from_json_str(DOCUMENT).unwrap();
    assert_eq!(a, b);

    let mut forward = a.clone();
    forward
        .tools
        .push(ToolSpec::new("second", HandlerRef::remote("http://h/2")));
    let mut reversed = forward.clone();
    reversed.tools.reverse();
    assert_ne!(forward, reversed);
}
