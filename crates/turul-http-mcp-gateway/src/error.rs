//! Gateway errors and their HTTP mapping
//!
//! Every rejection and fault the gateway can produce is a [`GatewayError`].
//! [`GatewayError::to_response`] is the single place that turns one into an
//! HTTP response: a fixed status, a JSON-RPC error envelope with `id: null`,
//! and a log line at a level that matches the kind of failure. Internal detail
//! goes to the log only.

use std::any::Any;
use std::net::SocketAddr;

use http::{HeaderValue, Method, Response, StatusCode, header::CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, error, warn};
use turul_gateway_json_rpc::{JsonRpcError, error_codes};
use turul_mcp_stateless::McpError;

use crate::body::{GatewayBody, full};
use crate::config::ConfigError;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Fallback when an envelope cannot be serialized
const FALLBACK_ENVELOPE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal server error"},"id":null}"#;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request body exceeds the {limit_mb}MB limit")]
    PayloadTooLarge { limit_mb: u64 },

    #[error("Unauthorized: Missing API key")]
    MissingCredential,

    #[error("Forbidden: Invalid API key")]
    InvalidCredential,

    #[error("Method {method} not allowed")]
    MethodNotAllowed { method: Method },

    #[error("Missing required path parameter for route {route}")]
    MissingPathParameter { route: String },

    #[error("No MCP endpoint at {path}")]
    NotFound { path: String },

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Request body is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Capability registration failed: {0}")]
    Registration(McpError),

    #[error("Protocol exchange failed: {0}")]
    Exchange(McpError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::MissingCredential => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidCredential => StatusCode::FORBIDDEN,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::MissingPathParameter { .. }
            | GatewayError::BodyRead(_)
            | GatewayError::Parse(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Registration(_)
            | GatewayError::Exchange(_)
            | GatewayError::Internal(_)
            | GatewayError::Config(_)
            | GatewayError::Bind { .. }
            | GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON-RPC error code carried in the envelope
    pub fn error_code(&self) -> i64 {
        match self {
            GatewayError::PayloadTooLarge { .. } => error_codes::PAYLOAD_TOO_LARGE,
            GatewayError::MissingCredential => error_codes::UNAUTHENTICATED,
            GatewayError::InvalidCredential => error_codes::FORBIDDEN,
            GatewayError::MethodNotAllowed { .. } => error_codes::METHOD_NOT_ALLOWED,
            GatewayError::MissingPathParameter { .. } => error_codes::INVALID_PARAMS,
            GatewayError::NotFound { .. } => error_codes::METHOD_NOT_FOUND,
            GatewayError::BodyRead(_) | GatewayError::Parse(_) => error_codes::PARSE_ERROR,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Message shown to the client; never carries internal detail
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::PayloadTooLarge { limit_mb } => {
                format!("Request body too large. Maximum size is {}MB", limit_mb)
            }
            GatewayError::MissingCredential => "Unauthorized: Missing API key".to_string(),
            GatewayError::InvalidCredential => "Forbidden: Invalid API key".to_string(),
            GatewayError::MethodNotAllowed { .. } => "Method not allowed.".to_string(),
            GatewayError::MissingPathParameter { route } => {
                format!("Missing required path parameter. Use {}", route)
            }
            GatewayError::NotFound { .. } => "Not found".to_string(),
            GatewayError::BodyRead(_) => "Parse error: unable to read request body".to_string(),
            GatewayError::Parse(_) => "Parse error: request body is not valid JSON".to_string(),
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }

    pub fn to_envelope(&self) -> JsonRpcError {
        JsonRpcError::envelope(self.error_code(), self.client_message())
    }

    /// Log the failure and build its HTTP response
    pub fn to_response(&self) -> Response<GatewayBody> {
        match self {
            err if err.is_internal() => error!(error = %err, "Request failed"),
            GatewayError::MissingCredential | GatewayError::InvalidCredential => {
                warn!(status = %self.status(), "Rejected request: {}", self)
            }
            GatewayError::PayloadTooLarge { .. } | GatewayError::MethodNotAllowed { .. } => {
                warn!(status = %self.status(), "Rejected request: {}", self)
            }
            _ => debug!(status = %self.status(), "Rejected request: {}", self),
        }

        let body = serde_json::to_vec(&self.to_envelope())
            .unwrap_or_else(|_| FALLBACK_ENVELOPE.as_bytes().to_vec());

        let mut response = Response::new(full(body));
        *response.status_mut() = self.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl From<McpError> for GatewayError {
    fn from(err: McpError) -> Self {
        GatewayError::Exchange(err)
    }
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    async fn envelope(err: GatewayError) -> (StatusCode, Value) {
        let response = err.to_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_credential_envelopes() {
        let (status, body) = envelope(GatewayError::MissingCredential).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32010, "message": "Unauthorized: Missing API key"},
                "id": null
            })
        );

        let (status, body) = envelope(GatewayError::InvalidCredential).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], -32011);
        assert_eq!(body["error"]["message"], "Forbidden: Invalid API key");
    }

    #[tokio::test]
    async fn test_status_code_table() {
        let cases = [
            (GatewayError::PayloadTooLarge { limit_mb: 15 }, 413, -32001),
            (
                GatewayError::MethodNotAllowed { method: Method::GET },
                405,
                -32000,
            ),
            (
                GatewayError::MissingPathParameter {
                    route: "/mcp/:tenant".to_string(),
                },
                400,
                -32602,
            ),
            (
                GatewayError::NotFound {
                    path: "/other".to_string(),
                },
                404,
                -32601,
            ),
            (GatewayError::BodyRead("reset".to_string()), 400, -32700),
            (GatewayError::Internal("boom".to_string()), 500, -32603),
        ];

        for (err, status, code) in cases {
            let (got_status, body) = envelope(err).await;
            assert_eq!(got_status.as_u16(), status);
            assert_eq!(body["error"]["code"], code);
            assert_eq!(body["id"], Value::Null);
        }
    }

    #[tokio::test]
    async fn test_messages() {
        let (_, body) = envelope(GatewayError::PayloadTooLarge { limit_mb: 15 }).await;
        assert!(body["error"]["message"].as_str().unwrap().contains("15MB"));

        let (_, body) = envelope(GatewayError::MethodNotAllowed { method: Method::GET }).await;
        assert_eq!(body["error"]["message"], "Method not allowed.");

        let (_, body) = envelope(GatewayError::MissingPathParameter {
            route: "/mcp/:tenant".to_string(),
        })
        .await;
        assert_eq!(
            body["error"]["message"],
            "Missing required path parameter. Use /mcp/:tenant"
        );
    }

    #[tokio::test]
    async fn test_internal_detail_not_exposed() {
        let err = GatewayError::Registration(McpError::registration("database password rejected"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.to_response();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("password"));
        assert!(text.contains(INTERNAL_ERROR_MESSAGE));
    }
}
