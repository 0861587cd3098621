use std::fmt;
use thiserror::Error;

/// Failure to obtain a usable capability configuration
///
/// Fatal when it happens on the initial load; logged and ignored by the
/// refresh loop afterwards.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration unavailable: source unreachable: {0}")]
    Unreachable(String),

    #[error("Configuration unavailable: HTTP {0} {1}")]
    Status(u16, String),

    #[error("Configuration unavailable: malformed document: {0}")]
    Malformed(String),

    #[error("Configuration unavailable: invalid document: {0}")]
    Invalid(String),

    #[error("Configuration unavailable: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the outbound HTTP transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid headers format: {0}")]
    InvalidHeaders(String),

    #[error("Response body read failed: {0}")]
    ResponseBody(String),
}

/// Errors raised while invoking a handler
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Endpoint unreachable or answered with a non-success status
    #[error("Handler unavailable: {0}")]
    Unavailable(String),

    /// Response body could not be interpreted
    #[error("Malformed handler response: {0}")]
    MalformedResponse(String),

    /// In-process handler returned an error or panicked
    #[error("Handler failed: {0}")]
    Failed(String),
}

impl From<TransportError> for InvokeError {
    fn from(err: TransportError) -> Self {
        InvokeError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    Tool,
    Resource,
    Prompt,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::Tool => f.write_str("Tool"),
            CapabilityKind::Resource => f.write_str("Resource"),
            CapabilityKind::Prompt => f.write_str("Prompt"),
        }
    }
}

/// Error types for capability requests
///
/// Every variant is surfaced to the client as an `rmcp::ErrorData` via the
/// `From<CapabilityError>` implementation below.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// No configuration has been loaded yet
    #[error("Capability configuration not loaded")]
    NotLoaded,

    #[error("{0} not found: {1}")]
    NotFound(CapabilityKind, String),

    #[error("Tool '{name}' execution failed: {message}")]
    ToolExecutionFailed { name: String, message: String },

    #[error("Resource '{uri}' read failed: {message}")]
    ResourceReadFailed { uri: String, message: String },

    #[error("Prompt '{name}' execution failed: {message}")]
    PromptExecutionFailed { name: String, message: String },
}

impl CapabilityError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CapabilityError::NotFound(..))
    }
}

/// Convert CapabilityError to rmcp::ErrorData for MCP protocol responses
///
/// | CapabilityError Variant | MCP Error Code     |
/// |-------------------------|--------------------|
/// | NotFound(Tool/Prompt)   | INVALID_PARAMS     |
/// | NotFound(Resource)      | RESOURCE_NOT_FOUND |
/// | *ExecutionFailed        | INTERNAL_ERROR     |
/// | ResourceReadFailed      | INTERNAL_ERROR     |
/// | NotLoaded               | INTERNAL_ERROR     |
impl From<CapabilityError> for rmcp::ErrorData {
    fn from(err: CapabilityError) -> Self {
        use rmcp::model::{ErrorCode, ErrorData};

        let code = match &err {
            CapabilityError::NotFound(CapabilityKind::Resource, _) => {
                ErrorCode::RESOURCE_NOT_FOUND
            }
            CapabilityError::NotFound(_, _) => ErrorCode::INVALID_PARAMS,
            CapabilityError::NotLoaded
            | CapabilityError::ToolExecutionFailed { .. }
            | CapabilityError::ResourceReadFailed { .. }
            | CapabilityError::PromptExecutionFailed { .. } => ErrorCode::INTERNAL_ERROR,
        };

        ErrorData {
            code,
            message: err.to_string().into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_not_found_mapping() {
        let data: rmcp::ErrorData =
            CapabilityError::NotFound(CapabilityKind::Tool, "echo".to_string()).into();
        assert_eq!(data.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(data.message, "Tool not found: echo");

        let data: rmcp::ErrorData =
            CapabilityError::NotFound(CapabilityKind::Resource, "r://x".to_string()).into();
        assert_eq!(data.code, ErrorCode::RESOURCE_NOT_FOUND);
    }

    #[test]
    fn test_execution_failure_keeps_underlying_message() {
        let err = CapabilityError::ToolExecutionFailed {
            name: "echo".to_string(),
            message: InvokeError::Unavailable("HTTP 503 Service Unavailable".to_string())
                .to_string(),
        };
        let data: rmcp::ErrorData = err.into();

        assert_eq!(data.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(
            data.message,
            "Tool 'echo' execution failed: Handler unavailable: HTTP 503 Service Unavailable"
        );
    }
}
