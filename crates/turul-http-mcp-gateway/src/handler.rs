//! HTTP request handling for the MCP endpoint

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, Response};
use http_body::Body;
use http_body_util::BodyExt;
use tracing::{Instrument, debug, info, info_span};
use turul_mcp_stateless::CapabilityRegistrar;
use uuid::Uuid;

use crate::admission::{AdmissionContext, AdmissionPipeline, AdmissionResult};
use crate::auth::ApiKeyGuard;
use crate::body::{BoxError, GatewayBody, empty};
use crate::config::{AuthPolicy, ServerConfig};
use crate::cors::CorsLayer;
use crate::error::GatewayError;
use crate::lifecycle::SessionLifecycleManager;

/// Handles requests for one gateway configuration
///
/// Cheap to clone; every clone shares the same pipeline and registrar.
#[derive(Clone)]
pub struct GatewayHandler {
    inner: Arc<HandlerInner>,
}

struct HandlerInner {
    config: Arc<ServerConfig>,
    pipeline: AdmissionPipeline,
    lifecycle: SessionLifecycleManager,
    cors: Option<CorsLayer>,
}

impl GatewayHandler {
    /// Build a handler, resolving any environment credential from the process environment
    pub fn new(
        config: ServerConfig,
        registrar: Arc<dyn CapabilityRegistrar>,
    ) -> Result<Self, GatewayError> {
        Self::with_credential_lookup(config, registrar, |name| std::env::var(name).ok())
    }

    /// Build a handler with an explicit environment lookup for the API key
    pub fn with_credential_lookup(
        config: ServerConfig,
        registrar: Arc<dyn CapabilityRegistrar>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, GatewayError> {
        let config = Arc::new(config);

        let guard = match &config.auth_policy {
            AuthPolicy::NoAuth => None,
            AuthPolicy::ApiKey(auth) => Some(Arc::new(ApiKeyGuard::with_resolver(auth, lookup)?)),
        };
        let cors = config
            .cors_enabled
            .then(|| CorsLayer::new(guard.as_ref().map(|guard| guard.header_name())));
        let pipeline = AdmissionPipeline::for_config(&config, guard);
        let lifecycle = SessionLifecycleManager::new(Arc::clone(&config), registrar);

        info!(
            stages = ?pipeline.stage_names(),
            auth = config.auth_policy.name(),
            "Admission pipeline ready"
        );

        Ok(Self {
            inner: Arc::new(HandlerInner {
                config,
                pipeline,
                lifecycle,
                cors,
            }),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub(crate) fn shared_config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.inner.config)
    }

    pub fn pipeline(&self) -> &AdmissionPipeline {
        &self.inner.pipeline
    }

    /// Handle one HTTP request; failures become JSON-RPC error responses
    pub async fn handle<B>(&self, req: Request<B>) -> Response<GatewayBody>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let span = info_span!(
            "mcp_request",
            request_id = %Uuid::now_v7(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        async move {
            let mut response = match self.route(req).await {
                Ok(response) => response,
                Err(err) => err.to_response(),
            };
            if let Some(cors) = &self.inner.cors {
                cors.apply_cors_headers(response.headers_mut());
            }
            debug!(status = %response.status(), "Request complete");
            response
        }
        .instrument(span)
        .await
    }

    async fn route<B>(&self, req: Request<B>) -> Result<Response<GatewayBody>, GatewayError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        if !self.is_mcp_route(req.uri().path()) {
            return Err(GatewayError::NotFound {
                path: req.uri().path().to_string(),
            });
        }

        let method = req.method();
        let preflight = method == Method::OPTIONS && self.inner.cors.is_some();
        if method != Method::POST && !preflight {
            return Err(GatewayError::MethodNotAllowed {
                method: method.clone(),
            });
        }

        let (parts, body) = req.into_parts();
        let body: GatewayBody = body.map_err(|err| err.into()).boxed_unsync();

        match self.inner.pipeline.run(AdmissionContext::new(parts, body)).await {
            AdmissionResult::Accepted(admitted) => self.inner.lifecycle.handle(admitted).await,
            AdmissionResult::Preflight => Ok(Response::new(empty())),
            AdmissionResult::Rejected(err) => Err(err),
        }
    }

    /// The base path, or base path plus one segment when a URL parameter is configured
    fn is_mcp_route(&self, path: &str) -> bool {
        let config = &self.inner.config;
        match path.strip_prefix(config.mcp_path.as_str()) {
            Some("") | Some("/") => true,
            Some(rest) => {
                config.url_param_name.is_some()
                    && rest.strip_prefix('/').is_some_and(|segment| {
                        let segment = segment.strip_suffix('/').unwrap_or(segment);
                        !segment.contains('/')
                    })
            }
            None => false,
        }
    }
}
