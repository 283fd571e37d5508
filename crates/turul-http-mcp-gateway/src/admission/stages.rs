//! Built-in admission stages

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use http::header::CONTENT_LENGTH;
use bytes::Bytes;
use http_body_util::{BodyExt, Collected, LengthLimitError, Limited};
use tracing::trace;

use super::{AdmissionContext, AdmissionStage, StageOutcome};
use crate::body::{BoxError, GatewayBody};
use crate::auth::{ApiKeyGuard, CredentialCheckResult};
use crate::error::GatewayError;

/// Rejects bodies over the limit and collects the rest
///
/// A declared `Content-Length` over the limit is rejected without reading
/// anything. Otherwise the body is read through a [`Limited`] wrapper, so
/// chunked or mis-declared bodies are cut off at the limit as well. A body of
/// exactly the limit is accepted.
pub struct BodyLimitStage {
    limit_mb: u64,
    limit_bytes: usize,
}

impl BodyLimitStage {
    pub fn new(limit_mb: u64, limit_bytes: usize) -> Self {
        Self {
            limit_mb,
            limit_bytes,
        }
    }

    fn too_large(&self) -> GatewayError {
        GatewayError::PayloadTooLarge {
            limit_mb: self.limit_mb,
        }
    }
}

#[async_trait]
impl AdmissionStage for BodyLimitStage {
    fn name(&self) -> &'static str {
        "body-limit"
    }

    async fn admit(&self, ctx: &mut AdmissionContext) -> Result<StageOutcome, GatewayError> {
        let declared = ctx
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        if let Some(declared) = declared
            && declared > self.limit_bytes as u64
        {
            return Err(self.too_large());
        }

        let body = ctx
            .take_body()
            .ok_or_else(|| GatewayError::Internal("request body already consumed".to_string()))?;

        let collected = collect_limited(body, self.limit_bytes).await;
        match collected {
            Ok(collected) => {
                let bytes = collected.to_bytes();
                trace!(len = bytes.len(), "Collected request body");
                ctx.set_collected_body(bytes);
                Ok(StageOutcome::Continue)
            }
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(self.too_large()),
            Err(err) => Err(GatewayError::BodyRead(err.to_string())),
        }
    }
}

// Named `Send` future so the async-trait Send check sees concrete error types
fn collect_limited(
    body: GatewayBody,
    limit: usize,
) -> impl Future<Output = Result<Collected<Bytes>, BoxError>> + Send {
    Limited::new(body, limit).collect()
}

/// Answers CORS preflight requests
///
/// The CORS headers themselves are added to every response by the gateway.
pub struct CorsStage;

#[async_trait]
impl AdmissionStage for CorsStage {
    fn name(&self) -> &'static str {
        "cors"
    }

    async fn admit(&self, ctx: &mut AdmissionContext) -> Result<StageOutcome, GatewayError> {
        if ctx.method() == Method::OPTIONS {
            Ok(StageOutcome::Preflight)
        } else {
            Ok(StageOutcome::Continue)
        }
    }
}

/// Extracts the single URL segment after the MCP base path
pub struct PathParameterStage {
    base_path: String,
    route: String,
}

impl PathParameterStage {
    pub fn new(base_path: &str, param_name: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            route: format!("{}/:{}", base_path, param_name),
        }
    }

    /// Decoded, trimmed segment after the base path; `None` when missing or blank
    pub fn extract(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(self.base_path.as_str())?;
        let segment = rest.strip_prefix('/').unwrap_or(rest);
        let segment = segment.strip_suffix('/').unwrap_or(segment);
        let decoded = urlencoding::decode(segment).ok()?;
        let value = decoded.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

#[async_trait]
impl AdmissionStage for PathParameterStage {
    fn name(&self) -> &'static str {
        "path-parameter"
    }

    async fn admit(&self, ctx: &mut AdmissionContext) -> Result<StageOutcome, GatewayError> {
        match self.extract(ctx.uri().path()) {
            Some(value) => {
                ctx.set_path_param(value);
                Ok(StageOutcome::Continue)
            }
            None => Err(GatewayError::MissingPathParameter {
                route: self.route.clone(),
            }),
        }
    }
}

/// Requires a valid API key
pub struct AuthStage {
    guard: Arc<ApiKeyGuard>,
}

impl AuthStage {
    pub fn new(guard: Arc<ApiKeyGuard>) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl AdmissionStage for AuthStage {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn admit(&self, ctx: &mut AdmissionContext) -> Result<StageOutcome, GatewayError> {
        match self.guard.check(ctx.headers(), ctx.uri().query()) {
            CredentialCheckResult::Valid => Ok(StageOutcome::Continue),
            CredentialCheckResult::Missing => Err(GatewayError::MissingCredential),
            CredentialCheckResult::Invalid => Err(GatewayError::InvalidCredential),
        }
    }
}
