//! # JSON-RPC 2.0 Types
//!
//! Transport-agnostic JSON-RPC 2.0 types used by the stateless MCP gateway.
//! This crate has no HTTP or session knowledge; it only describes messages.
//!
//! ## Features
//! - Request, notification and response types
//! - Error objects and the null-id error envelope returned for rejected requests
//! - Parsing of a raw JSON value into a single incoming message

pub mod dispatch;
pub mod error;
pub mod notification;
pub mod request;
pub mod response;
pub mod types;

// Re-export main types
pub use dispatch::{IncomingMessage, parse_json_rpc_message, parse_json_rpc_value};
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcTransportError};
pub use notification::JsonRpcNotification;
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcResponse, ResponseResult};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes plus the gateway's server-error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;

    /// HTTP method not accepted on the endpoint
    pub const METHOD_NOT_ALLOWED: i64 = -32000;
    /// Request body exceeded the configured limit
    pub const PAYLOAD_TOO_LARGE: i64 = -32001;
    /// No credential supplied
    pub const UNAUTHENTICATED: i64 = -32010;
    /// Credential supplied but rejected
    pub const FORBIDDEN: i64 = -32011;
}
