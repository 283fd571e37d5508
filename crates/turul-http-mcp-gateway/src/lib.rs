//! # Stateless HTTP MCP Gateway
//!
//! Serves the Model Context Protocol over plain HTTP without keeping any state
//! between requests. Every accepted `POST` gets its own freshly built session,
//! runs exactly one JSON-RPC exchange, and is torn down again.
//!
//! ## Request flow
//! 1. Route match on the MCP path (404 otherwise)
//! 2. Method guard: `POST`, plus `OPTIONS` when CORS is enabled (405 otherwise)
//! 3. [`admission`] pipeline: body size, CORS preflight, URL parameter, API key
//! 4. [`lifecycle`]: new session, caller's registrar, one exchange, release
//!
//! Every failure is answered with a JSON-RPC error envelope carrying `id: null`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use turul_http_mcp_gateway::{GatewayServer, ServerConfig};
//! use turul_mcp_stateless::{CallToolResult, SyncRegistrar, Tool, tool_fn};
//!
//! # async fn example() -> turul_http_mcp_gateway::Result<()> {
//! let config = ServerConfig::builder("hello-gateway").port(8080).build()?;
//!
//! let registrar = SyncRegistrar::new(|registry, _path_param| {
//!     registry.register_tool(
//!         Tool::new("hello"),
//!         tool_fn(|_args| async { Ok(CallToolResult::from_text("hello")) }),
//!     )
//! });
//!
//! GatewayServer::builder()
//!     .config(config)
//!     .registrar(registrar)
//!     .build()?
//!     .run()
//!     .await
//! # }
//! ```

pub mod admission;
pub mod auth;
pub mod body;
pub mod config;
pub mod cors;
pub mod diagnostics;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod server;

#[cfg(test)]
mod tests;

pub use admission::{AdmissionPipeline, AdmissionResult, AdmissionStage, AdmittedRequest};
pub use auth::{ApiKeyGuard, CredentialCheckResult};
pub use body::{BoxError, ExchangeBody, GatewayBody};
pub use config::{
    ApiKeyAuth, AuthPolicy, ConfigError, CredentialSource, ServerConfig, ServerConfigBuilder,
};
pub use cors::CorsLayer;
pub use diagnostics::{DiagnosticReport, LoggingRegistry, StartupDiagnostics};
pub use error::GatewayError;
pub use handler::GatewayHandler;
pub use lifecycle::{ReleaseGuard, SessionLifecycleManager};
pub use server::{BoundGatewayServer, GatewayServer, GatewayServerBuilder};

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
