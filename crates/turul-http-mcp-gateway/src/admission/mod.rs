//! Request admission pipeline
//!
//! Before any MCP work is done, a request passes through an ordered list of
//! [`AdmissionStage`]s. Each stage can let the request through, end it early
//! with a successful preflight response, or reject it with a
//! [`GatewayError`](crate::GatewayError). The first rejection stops the chain.
//!
//! The gateway assembles the stages from its configuration in this order:
//!
//! 1. [`BodyLimitStage`] - always; collects the body under the size limit
//! 2. [`CorsStage`] - when CORS is enabled; answers `OPTIONS` preflights
//! 3. [`PathParameterStage`] - when a URL parameter is configured
//! 4. [`AuthStage`] - when API-key auth is configured with a resolved credential
//!
//! # Examples
//!
//! ```rust,no_run
//! use turul_http_mcp_gateway::admission::{AdmissionContext, AdmissionStage, StageOutcome};
//! use turul_http_mcp_gateway::GatewayError;
//! use async_trait::async_trait;
//!
//! struct RequireJson;
//!
//! #[async_trait]
//! impl AdmissionStage for RequireJson {
//!     fn name(&self) -> &'static str {
//!         "require-json"
//!     }
//!
//!     async fn admit(&self, ctx: &mut AdmissionContext) -> Result<StageOutcome, GatewayError> {
//!         match ctx.headers().get("content-type") {
//!             Some(_) => Ok(StageOutcome::Continue),
//!             None => Err(GatewayError::Internal("content-type required".into())),
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod stack;
pub mod stages;
pub mod traits;

pub use context::{AdmissionContext, AdmittedRequest};
pub use stack::{AdmissionPipeline, AdmissionResult};
pub use stages::{AuthStage, BodyLimitStage, CorsStage, PathParameterStage};
pub use traits::{AdmissionStage, StageOutcome};
