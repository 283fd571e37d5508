//! Connection-less transport carrying exactly one exchange
//!
//! The transport issues no session id and keeps nothing between requests. It is bound
//! to one session, processes one message, and is then closed. Closing the transport
//! also closes its session; both closes are idempotent.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use turul_gateway_json_rpc::{
    IncomingMessage, JsonRpcError, JsonRpcMessage, parse_json_rpc_value,
};

use crate::error::{McpError, McpResult};
use crate::session::McpSession;

/// How the single response is framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// `application/json` body
    #[default]
    Json,
    /// One `text/event-stream` event carrying the response
    EventStream,
}

impl ResponseMode {
    /// Pick a framing from the request's `Accept` header.
    ///
    /// JSON is preferred whenever acceptable; event streams are used only when the
    /// client asks for them and not for JSON. Unknown or missing values fall back to
    /// JSON rather than being rejected.
    pub fn from_accept(accept: Option<&str>) -> Self {
        let accept = accept.unwrap_or_default().to_ascii_lowercase();
        let wants_json = accept.contains("application/json") || accept.contains("*/*");
        if accept.contains("text/event-stream") && !wants_json {
            ResponseMode::EventStream
        } else {
            ResponseMode::Json
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ResponseMode::Json => "application/json",
            ResponseMode::EventStream => "text/event-stream",
        }
    }
}

/// Outcome of the exchange
#[derive(Debug, Clone)]
pub enum TransportResponse {
    /// Response to a request (success or protocol-level error)
    Message(JsonRpcMessage),
    /// A notification was consumed; nothing to send back
    Accepted,
    /// The body was not a usable JSON-RPC message
    Invalid(JsonRpcError),
}

#[derive(Default)]
pub struct StatelessTransport {
    session: OnceLock<Arc<McpSession>>,
    exchanged: AtomicBool,
    closed: AtomicBool,
}

impl StatelessTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always `None`: this transport never issues resumable session ids
    pub fn session_id(&self) -> Option<&str> {
        None
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Bind the transport to its one session
    pub fn connect(&self, session: Arc<McpSession>) -> McpResult<()> {
        if self.is_closed() {
            return Err(McpError::TransportError("transport is closed".to_string()));
        }
        if self.session.get().is_some() {
            return Err(McpError::TransportError(
                "transport is already connected".to_string(),
            ));
        }
        session.mark_connected()?;
        self.session
            .set(session)
            .map_err(|_| McpError::TransportError("transport is already connected".to_string()))
    }

    /// Process the single message of this exchange
    pub async fn handle_message(&self, body: Value) -> McpResult<TransportResponse> {
        if self.is_closed() {
            return Err(McpError::TransportError("transport is closed".to_string()));
        }
        let session = self
            .session
            .get()
            .ok_or_else(|| McpError::TransportError("transport is not connected".to_string()))?;
        if self.exchanged.swap(true, Ordering::AcqRel) {
            return Err(McpError::TransportError(
                "stateless transport already completed its exchange".to_string(),
            ));
        }

        let message = match parse_json_rpc_value(body) {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, "Rejecting malformed message");
                return Ok(TransportResponse::Invalid(err.to_json_rpc_error()));
            }
        };

        match message {
            IncomingMessage::Request(request) => Ok(TransportResponse::Message(
                session.handle_request(request).await,
            )),
            IncomingMessage::Notification(notification) => {
                session.handle_notification(notification).await;
                Ok(TransportResponse::Accepted)
            }
        }
    }

    /// Close the transport and its session. Returns `true` only for the releasing call.
    pub fn close(&self) -> bool {
        let released = !self.closed.swap(true, Ordering::AcqRel);
        if let Some(session) = self.session.get() {
            session.close();
        }
        if released {
            debug!("Transport closed");
        }
        released
    }
}

/// Frame a response as one server-sent event
pub fn encode_sse_event(message: &JsonRpcMessage) -> McpResult<String> {
    let data = serde_json::to_string(message)?;
    Ok(format!("event: message\ndata: {}\n\n", data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turul_gateway_json_rpc::error_codes;

    fn connected() -> (Arc<McpSession>, StatelessTransport) {
        let session = Arc::new(McpSession::new("t", "1"));
        let transport = StatelessTransport::new();
        transport.connect(Arc::clone(&session)).unwrap();
        (session, transport)
    }

    #[test]
    fn test_accept_negotiation() {
        assert_eq!(ResponseMode::from_accept(None), ResponseMode::Json);
        assert_eq!(
            ResponseMode::from_accept(Some("application/json, text/event-stream")),
            ResponseMode::Json
        );
        assert_eq!(
            ResponseMode::from_accept(Some("text/event-stream")),
            ResponseMode::EventStream
        );
        assert_eq!(ResponseMode::from_accept(Some("text/html")), ResponseMode::Json);
    }

    #[tokio::test]
    async fn test_single_exchange() {
        let (_session, transport) = connected();
        assert!(transport.session_id().is_none());

        let response = transport
            .handle_message(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .await
            .unwrap();
        assert!(matches!(response, TransportResponse::Message(ref m) if !m.is_error()));

        let second = transport
            .handle_message(json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}))
            .await;
        assert!(matches!(second, Err(McpError::TransportError(_))));
    }

    #[tokio::test]
    async fn test_notification_and_invalid_bodies() {
        let (_session, transport) = connected();
        let accepted = transport
            .handle_message(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await
            .unwrap();
        assert!(matches!(accepted, TransportResponse::Accepted));

        let (_session, transport) = connected();
        let invalid = transport.handle_message(json!([1, 2])).await.unwrap();
        match invalid {
            TransportResponse::Invalid(err) => {
                assert_eq!(err.error.code, error_codes::INVALID_REQUEST)
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_connect_rules() {
        let (session, transport) = connected();

        let other = StatelessTransport::new();
        assert!(other.connect(Arc::clone(&session)).is_err());

        let another_session = Arc::new(McpSession::new("t", "1"));
        assert!(transport.connect(another_session).is_err());
    }

    #[test]
    fn test_close_releases_both_once() {
        let (session, transport) = connected();

        assert!(transport.close());
        assert!(session.is_closed());
        assert!(!transport.close());
        assert!(!session.close());
    }

    #[test]
    fn test_sse_framing() {
        let message = JsonRpcMessage::success(1.into(), json!({}));
        let event = encode_sse_event(&message).unwrap();
        assert!(event.starts_with("event: message\ndata: {"));
        assert!(event.ends_with("\n\n"));
    }
}
