//! Shared fixtures: a recording registrar, log-line checks and request helpers

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{Value, json};
use turul_mcp_stateless::{
    CallToolResult, CapabilityRegistrar, CapabilityRegistry, McpError, McpResult, Tool, tool_fn,
};

use crate::body::GatewayBody;
use crate::config::ServerConfig;
use crate::handler::GatewayHandler;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Behaviour {
    Register,
    Fail,
    Panic,
}

/// Registers tools `a` and `b`; `b` echoes the path parameter it was built with
#[derive(Clone)]
pub struct RecordingRegistrar {
    calls: Arc<Mutex<Vec<Option<String>>>>,
    behaviour: Behaviour,
}

impl RecordingRegistrar {
    pub fn new() -> Self {
        Self::with_behaviour(Behaviour::Register)
    }

    pub fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            behaviour,
        }
    }

    /// Path parameter of every invocation, in order
    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CapabilityRegistrar for RecordingRegistrar {
    async fn register(
        &self,
        registry: &mut dyn CapabilityRegistry,
        path_param: Option<&str>,
    ) -> McpResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(path_param.map(str::to_string));

        match self.behaviour {
            Behaviour::Register => {}
            Behaviour::Fail => return Err(McpError::registration("backend password rejected")),
            Behaviour::Panic => panic!("registrar exploded"),
        }

        registry.register_tool(
            Tool::new("a"),
            tool_fn(|_| async { Ok(CallToolResult::from_text("a")) }),
        )?;

        let param = path_param.unwrap_or_default().to_string();
        registry.register_tool(
            Tool::new("b"),
            tool_fn(move |_| {
                let param = param.clone();
                async move { Ok(CallToolResult::from_text(param)) }
            }),
        )
    }
}

/// Lines containing `needle` must number exactly `expected`
///
/// For use inside `logs_assert`, whose lines are already scoped to the running test.
pub fn expect_count(lines: &[&str], needle: &str, expected: usize) -> Result<(), String> {
    let found = lines.iter().filter(|line| line.contains(needle)).count();
    if found == expected {
        Ok(())
    } else {
        Err(format!("expected {} lines containing {:?}, found {}", expected, needle, found))
    }
}

/// The first line containing `earlier` comes before the first containing `later`
pub fn expect_before(lines: &[&str], earlier: &str, later: &str) -> Result<(), String> {
    let first = |needle: &str| {
        lines
            .iter()
            .position(|line| line.contains(needle))
            .ok_or_else(|| format!("no line contains {:?}", needle))
    };
    if first(earlier)? < first(later)? {
        Ok(())
    } else {
        Err(format!("{:?} was not logged before {:?}", earlier, later))
    }
}

/// Some warning line contains `needle`
pub fn expect_warning(lines: &[&str], needle: &str) -> Result<(), String> {
    if lines
        .iter()
        .any(|line| line.contains("WARN") && line.contains(needle))
    {
        Ok(())
    } else {
        Err(format!("no warning containing {:?}", needle))
    }
}

pub fn handler(config: ServerConfig, registrar: &RecordingRegistrar) -> GatewayHandler {
    GatewayHandler::with_credential_lookup(config, Arc::new(registrar.clone()), |_| None).unwrap()
}

pub fn post(uri: &str, body: impl Into<Bytes>) -> Request<Full<Bytes>> {
    Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(body.into()))
        .unwrap()
}

pub fn rpc(id: i64, method: &str, params: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
}

pub fn call_tool(name: &str) -> String {
    rpc(1, "tools/call", json!({"name": name, "arguments": {}}))
}

pub async fn body_bytes(response: Response<GatewayBody>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn read_json(response: Response<GatewayBody>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
