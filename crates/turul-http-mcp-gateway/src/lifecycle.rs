//! Per-request session lifecycle
//!
//! Every admitted request gets a brand-new [`McpSession`] and
//! [`StatelessTransport`]. The caller's registrar attaches capabilities, the
//! transport runs the single exchange, and a [`ReleaseGuard`] closes both
//! objects exactly once, whether the exchange completes, fails, or the client
//! disconnects before the response is written.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderValue, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tracing::debug;
use turul_mcp_stateless::{
    CapabilityRegistrar, McpSession, ResponseMode, StatelessTransport, TransportResponse,
    encode_sse_event,
};

use crate::admission::AdmittedRequest;
use crate::body::{ExchangeBody, GatewayBody, empty, full};
use crate::config::ServerConfig;
use crate::error::{GatewayError, panic_message};

/// Closes a transport and its session when dropped
///
/// Both closes are idempotent, so calling [`ReleaseGuard::release`] early and
/// then dropping the guard releases each object once.
pub struct ReleaseGuard {
    transport: Arc<StatelessTransport>,
    session: Option<Arc<McpSession>>,
}

impl ReleaseGuard {
    pub fn new(transport: Arc<StatelessTransport>) -> Self {
        Self {
            transport,
            session: None,
        }
    }

    /// Release `session` together with the transport
    pub fn attach(&mut self, session: Arc<McpSession>) {
        self.session = Some(session);
    }

    pub fn release(&self) {
        self.transport.close();
        if let Some(session) = &self.session {
            session.close();
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Builds, drives and releases the session for each admitted request
#[derive(Clone)]
pub struct SessionLifecycleManager {
    config: Arc<ServerConfig>,
    registrar: Arc<dyn CapabilityRegistrar>,
}

impl SessionLifecycleManager {
    pub fn new(config: Arc<ServerConfig>, registrar: Arc<dyn CapabilityRegistrar>) -> Self {
        Self { config, registrar }
    }

    /// Run one exchange for an admitted request
    pub async fn handle(
        &self,
        request: AdmittedRequest,
    ) -> Result<Response<GatewayBody>, GatewayError> {
        let message: Value = serde_json::from_slice(&request.body)?;
        let mode = ResponseMode::from_accept(
            request
                .parts
                .headers
                .get(ACCEPT)
                .and_then(|value| value.to_str().ok()),
        );

        let transport = Arc::new(StatelessTransport::new());
        let mut guard = ReleaseGuard::new(Arc::clone(&transport));

        let session = self.build_session(request.path_param.as_deref()).await?;
        guard.attach(Arc::clone(&session));
        transport.connect(session)?;

        let outcome = AssertUnwindSafe(transport.handle_message(message))
            .catch_unwind()
            .await
            .map_err(|panic| {
                GatewayError::Internal(format!(
                    "exchange handler panicked: {}",
                    panic_message(panic.as_ref())
                ))
            })??;

        respond(outcome, mode, guard)
    }

    async fn build_session(
        &self,
        path_param: Option<&str>,
    ) -> Result<Arc<McpSession>, GatewayError> {
        let mut session = McpSession::new(&self.config.server_name, &self.config.server_version);

        let registered = AssertUnwindSafe(self.registrar.register(&mut session, path_param))
            .catch_unwind()
            .await;

        match registered {
            Ok(Ok(())) => {
                debug!(
                    capabilities = session.capabilities().len(),
                    path_param = path_param.unwrap_or_default(),
                    "Session ready"
                );
                Ok(Arc::new(session))
            }
            Ok(Err(err)) => Err(GatewayError::Registration(err)),
            Err(panic) => Err(GatewayError::Internal(format!(
                "capability registrar panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }
}

fn respond(
    outcome: TransportResponse,
    mode: ResponseMode,
    guard: ReleaseGuard,
) -> Result<Response<GatewayBody>, GatewayError> {
    match outcome {
        TransportResponse::Accepted => {
            guard.release();
            let mut response = Response::new(empty());
            *response.status_mut() = StatusCode::ACCEPTED;
            Ok(response)
        }
        TransportResponse::Invalid(error) => {
            guard.release();
            debug!(code = error.error.code, "Body is not a single JSON-RPC message");
            let body = serde_json::to_vec(&error).map_err(internal)?;
            Ok(json_response(StatusCode::BAD_REQUEST, full(body)))
        }
        TransportResponse::Message(message) => match mode {
            ResponseMode::Json => {
                let body = serde_json::to_vec(&message).map_err(internal)?;
                guard.release();
                Ok(json_response(StatusCode::OK, full(body)))
            }
            ResponseMode::EventStream => {
                // The guard lives in the body until the event has been written.
                let event = encode_sse_event(&message)?;
                let mut response = Response::new(ExchangeBody::new(event, guard).boxed_unsync());
                let headers = response.headers_mut();
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(ResponseMode::EventStream.content_type()),
                );
                headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                Ok(response)
            }
        },
    }
}

fn json_response(status: StatusCode, body: GatewayBody) -> Response<GatewayBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(ResponseMode::Json.content_type()),
    );
    response
}

fn internal(err: serde_json::Error) -> GatewayError {
    GatewayError::Internal(format!("failed to serialize response: {}", err))
}
