//! Ephemeral MCP session
//!
//! A session lives for one exchange. It is populated through [`CapabilityRegistry`]
//! while exclusively owned, then shared (behind `Arc`) with exactly one transport.
//! Closing is idempotent: the first call releases, later calls are no-ops.

use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use turul_gateway_json_rpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, RequestParams,
};

use crate::capability::{Prompt, Resource, Tool};
use crate::content::CallToolResult;
use crate::error::{McpError, McpResult};
use crate::handler::{PromptHandler, ResourceHandler, ToolHandler};
use crate::protocol::{Implementation, InitializeResult, ServerCapabilities, negotiate_version};
use crate::registry::{CapabilityRegistry, CapabilitySet};

pub struct McpSession {
    implementation: Implementation,
    capabilities: CapabilitySet,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl McpSession {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            implementation: Implementation::new(name, version),
            capabilities: CapabilitySet::new(),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Record the session's single transport binding
    pub(crate) fn mark_connected(&self) -> McpResult<()> {
        if self.is_closed() {
            return Err(McpError::SessionError("session is closed".to_string()));
        }
        self.connected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| {
                McpError::SessionError("session is already connected to a transport".to_string())
            })
    }

    /// Close the session. Returns `true` only for the call that performed the release.
    pub fn close(&self) -> bool {
        let released = !self.closed.swap(true, Ordering::AcqRel);
        if released {
            debug!(
                server = %self.implementation.name,
                capabilities = self.capabilities.len(),
                "Session closed"
            );
        }
        released
    }

    /// Dispatch one JSON-RPC request and produce its response
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        let id = request.id.clone();
        if self.is_closed() {
            return JsonRpcError::internal_error(Some(id), Some("Session is closed".to_string()))
                .into();
        }

        debug!(method = %request.method, id = %id, "Dispatching request");
        let params = request.params.as_ref();
        let result = match request.method.as_str() {
            "initialize" => self.initialize(params),
            "ping" => Ok(json!({})),
            "tools/list" => listing("tools", self.capabilities.tools()),
            "tools/call" => self.call_tool(params).await,
            "resources/list" => listing("resources", self.capabilities.resources()),
            "resources/read" => self.read_resource(params).await,
            "prompts/list" => listing("prompts", self.capabilities.prompts()),
            "prompts/get" => self.get_prompt(params).await,
            method => return JsonRpcError::method_not_found(id, method).into(),
        };

        match result {
            Ok(value) => JsonRpcMessage::success(id, value),
            Err(err) => {
                warn!(method = %request.method, error = %err, "Request failed");
                JsonRpcError::new(Some(id), err.to_error_object()).into()
            }
        }
    }

    /// Notifications carry no response; a stateless session only logs them
    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        debug!(method = %notification.method, "Notification received");
    }

    fn initialize(&self, params: Option<&RequestParams>) -> McpResult<Value> {
        let requested = params.and_then(|p| p.get_str("protocolVersion"));
        to_value(InitializeResult {
            protocol_version: negotiate_version(requested).to_string(),
            capabilities: ServerCapabilities::from_set(&self.capabilities),
            server_info: self.implementation.clone(),
        })
    }

    async fn call_tool(&self, params: Option<&RequestParams>) -> McpResult<Value> {
        let name = required_str(params, "name")?;
        let handler = self
            .capabilities
            .tool(name)
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
        let args = params
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let result = match handler.call(args).await {
            Ok(result) => result,
            Err(err) => {
                warn!(tool = %name, error = %err, "Tool call failed");
                CallToolResult::error_text(err.to_string())
            }
        };
        to_value(result)
    }

    async fn read_resource(&self, params: Option<&RequestParams>) -> McpResult<Value> {
        let uri = required_str(params, "uri")?;
        let (_, handler) = self
            .capabilities
            .resource(uri)
            .ok_or_else(|| McpError::ResourceNotFound(uri.to_string()))?;
        to_value(handler.read(uri).await?)
    }

    async fn get_prompt(&self, params: Option<&RequestParams>) -> McpResult<Value> {
        let name = required_str(params, "name")?;
        let handler = self
            .capabilities
            .prompt(name)
            .ok_or_else(|| McpError::PromptNotFound(name.to_string()))?;

        let mut arguments = HashMap::new();
        if let Some(Value::Object(raw)) = params.and_then(|p| p.get("arguments")) {
            for (key, value) in raw {
                let value = value.as_str().ok_or_else(|| {
                    McpError::InvalidParameters(format!(
                        "prompt argument '{}' must be a string",
                        key
                    ))
                })?;
                arguments.insert(key.clone(), value.to_string());
            }
        }
        to_value(handler.get(arguments).await?)
    }
}

impl CapabilityRegistry for McpSession {
    fn register_tool(&mut self, tool: Tool, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        self.ensure_open()?;
        self.capabilities.register_tool(tool, handler)
    }

    fn register_resource(
        &mut self,
        resource: Resource,
        handler: Arc<dyn ResourceHandler>,
    ) -> McpResult<()> {
        self.ensure_open()?;
        self.capabilities.register_resource(resource, handler)
    }

    fn register_prompt(
        &mut self,
        prompt: Prompt,
        handler: Arc<dyn PromptHandler>,
    ) -> McpResult<()> {
        self.ensure_open()?;
        self.capabilities.register_prompt(prompt, handler)
    }
}

impl McpSession {
    fn ensure_open(&self) -> McpResult<()> {
        if self.is_closed() {
            Err(McpError::SessionError(
                "cannot register on a closed session".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl Drop for McpSession {
    // A session abandoned mid-registration is still released once.
    fn drop(&mut self) {
        self.close();
    }
}

fn required_str<'a>(params: Option<&'a RequestParams>, key: &str) -> McpResult<&'a str> {
    params
        .and_then(|p| p.get_str(key))
        .ok_or_else(|| McpError::MissingParameter(key.to_string()))
}

fn to_value<T: Serialize>(value: T) -> McpResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// `{"<key>": [..]}` result for the list methods
fn listing<'a, T>(key: &str, items: impl Iterator<Item = &'a T>) -> McpResult<Value>
where
    T: Serialize + 'a,
{
    let items = items
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    let mut result = Map::new();
    result.insert(key.to_string(), Value::Array(items));
    Ok(Value::Object(result))
}
