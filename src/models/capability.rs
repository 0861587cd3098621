use crate::error::ConfigError;
use crate::models::handler::HandlerRef;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

/// The full set of capabilities served at one point in time
///
/// Swapped into the registry as a unit. Field order inside each sequence is
/// significant both for listing and for change detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
    #[serde(default)]
    pub prompts: Vec<PromptSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_input_schema")]
    pub input_schema: Value,
    pub handler: HandlerRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub handler: HandlerRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<PromptArgumentSpec>>,
    pub handler: HandlerRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptArgumentSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

fn default_input_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, handler: HandlerRef) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: default_input_schema(),
            handler,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

impl ResourceSpec {
    pub fn new(uri: impl Into<String>, name: impl Into<String>, handler: HandlerRef) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            handler,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

impl PromptSpec {
    pub fn new(name: impl Into<String>, handler: HandlerRef) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            arguments: None,
            handler,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_argument(
        mut self,
        name: impl Into<String>,
        description: Option<&str>,
        required: bool,
    ) -> Self {
        self.arguments
            .get_or_insert_with(Vec::new)
            .push(PromptArgumentSpec {
                name: name.into(),
                description: description.map(str::to_string),
                required: Some(required),
            });
        self
    }
}

impl CapabilityConfig {
    /// Parses and validates a config document
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks key uniqueness and tool schema shape
    ///
    /// Duplicate tool names, resource URIs or prompt names are rejected
    /// rather than resolved by position.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_unique("tool name", self.tools.iter().map(|t| t.name.as_str()))?;
        ensure_unique("resource uri", self.resources.iter().map(|r| r.uri.as_str()))?;
        ensure_unique("prompt name", self.prompts.iter().map(|p| p.name.as_str()))?;

        if let Some(tool) = self.tools.iter().find(|t| !t.input_schema.is_object()) {
            return Err(ConfigError::Invalid(format!(
                "inputSchema of tool '{}' is not an object",
                tool.name
            )));
        }

        Ok(())
    }

    pub fn tool(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn resource(&self, uri: &str) -> Option<&ResourceSpec> {
        self.resources.iter().find(|r| r.uri == uri)
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptSpec> {
        self.prompts.iter().find(|p| p.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty() && self.prompts.is_empty()
    }
}

fn ensure_unique<'a>(
    label: &str,
    keys: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(ConfigError::Invalid(format!("duplicate {}: '{}'", label, key)));
        }
    }
    Ok(())
}
