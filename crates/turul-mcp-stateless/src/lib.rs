//! # Stateless MCP Sessions
//!
//! Building blocks for serving the Model Context Protocol one exchange at a time.
//!
//! - [`McpSession`] - an ephemeral session holding registered tools, resources and prompts
//! - [`CapabilityRegistry`] - the registration surface a session exposes
//! - [`CapabilityRegistrar`] - caller-supplied logic that populates a registry
//! - [`StatelessTransport`] - carries exactly one JSON-RPC exchange, no session id
//!
//! Sessions are never resumed: build one, register capabilities, connect it to a
//! transport, run one exchange, close both.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use turul_mcp_stateless::{
//!     CallToolResult, CapabilityRegistrar, McpSession, StatelessTransport, SyncRegistrar, Tool,
//!     tool_fn,
//! };
//!
//! # async fn example() -> turul_mcp_stateless::McpResult<()> {
//! let registrar = SyncRegistrar::new(|registry, _path_param| {
//!     registry.register_tool(
//!         Tool::new("echo"),
//!         tool_fn(|args| async move { Ok(CallToolResult::from_text(args.to_string())) }),
//!     )
//! });
//!
//! let mut session = McpSession::new("echo-server", "1.0.0");
//! registrar.register(&mut session, None).await?;
//!
//! let session = Arc::new(session);
//! let transport = StatelessTransport::new();
//! transport.connect(Arc::clone(&session))?;
//! let _response = transport
//!     .handle_message(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
//!     .await?;
//! transport.close();
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod content;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod registrar;
pub mod registry;
pub mod session;
pub mod transport;

pub use capability::{CapabilityKind, Prompt, PromptArgument, Resource, Tool};
pub use content::{
    CallToolResult, Content, GetPromptResult, PromptMessage, ReadResourceResult,
    ResourceContents, Role,
};
pub use error::{McpError, McpResult};
pub use handler::{
    PromptHandler, ResourceHandler, ToolHandler, prompt_fn, resource_fn, tool_fn,
};
pub use protocol::{Implementation, InitializeResult, ServerCapabilities};
pub use registrar::{CapabilityRegistrar, SyncRegistrar};
pub use registry::{CapabilityRegistry, CapabilitySet};
pub use session::McpSession;
pub use transport::{ResponseMode, StatelessTransport, TransportResponse, encode_sse_event};
