//! Parsing of raw bodies into a single incoming JSON-RPC message

use serde_json::Value;

use crate::error::JsonRpcTransportError;
use crate::notification::JsonRpcNotification;
use crate::request::JsonRpcRequest;

/// A message received from a client
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// Expects a response
    Request(JsonRpcRequest),
    /// Fire-and-forget
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    pub fn method(&self) -> &str {
        match self {
            IncomingMessage::Request(request) => &request.method,
            IncomingMessage::Notification(notification) => &notification.method,
        }
    }
}

/// Parse a JSON-RPC message from a UTF-8 string
pub fn parse_json_rpc_message(json_str: &str) -> Result<IncomingMessage, JsonRpcTransportError> {
    let value: Value = serde_json::from_str(json_str)?;
    parse_json_rpc_value(value)
}

/// Interpret an already-decoded JSON value as a single JSON-RPC message.
///
/// Batches are rejected: each gateway exchange carries exactly one message.
pub fn parse_json_rpc_value(value: Value) -> Result<IncomingMessage, JsonRpcTransportError> {
    let object = match &value {
        Value::Object(object) => object,
        Value::Array(_) => {
            return Err(JsonRpcTransportError::InvalidMessage(
                "batch requests are not supported".to_string(),
            ));
        }
        _ => {
            return Err(JsonRpcTransportError::InvalidMessage(
                "expected a JSON object".to_string(),
            ));
        }
    };

    if !object.get("method").is_some_and(Value::is_string) {
        return Err(JsonRpcTransportError::InvalidMessage(
            "missing method".to_string(),
        ));
    }

    let has_id = object.get("id").is_some_and(|id| !id.is_null());
    if has_id {
        serde_json::from_value(value)
            .map(IncomingMessage::Request)
            .map_err(|e| JsonRpcTransportError::InvalidMessage(e.to_string()))
    } else {
        serde_json::from_value(value)
            .map(IncomingMessage::Notification)
            .map_err(|e| JsonRpcTransportError::InvalidMessage(e.to_string()))
    }
}
