//! MCP domain errors and their JSON-RPC mapping

use thiserror::Error;
use turul_gateway_json_rpc::{JsonRpcErrorCode, JsonRpcErrorObject};

use crate::capability::CapabilityKind;

/// Result type for MCP session operations
pub type McpResult<T> = std::result::Result<T, McpError>;

/// Errors raised by sessions, registrars, handlers and the transport
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionError(String),

    #[error("Resource execution failed: {0}")]
    ResourceExecutionError(String),

    #[error("Prompt execution failed: {0}")]
    PromptExecutionError(String),

    #[error("{kind} '{name}' is already registered")]
    DuplicateCapability { kind: CapabilityKind, name: String },

    #[error("Registration failed: {0}")]
    RegistrationError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl McpError {
    pub fn registration(message: impl Into<String>) -> Self {
        Self::RegistrationError(message.into())
    }

    pub fn tool_execution(message: impl Into<String>) -> Self {
        Self::ToolExecutionError(message.into())
    }

    /// Convert to the JSON-RPC error object sent inside a protocol response
    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        let code = match self {
            McpError::ToolNotFound(_)
            | McpError::ResourceNotFound(_)
            | McpError::PromptNotFound(_)
            | McpError::InvalidParameters(_)
            | McpError::MissingParameter(_) => JsonRpcErrorCode::InvalidParams,
            McpError::SerializationError(_) => JsonRpcErrorCode::ParseError,
            _ => JsonRpcErrorCode::InternalError,
        };
        JsonRpcErrorObject::new(code, Some(self.to_string()), None)
    }
}
