//! Startup registration dry-run
//!
//! Before the listener binds, the gateway can run the capability registrar
//! once against a throwaway session wrapped in a [`LoggingRegistry`]. Every
//! tool, resource and prompt is logged as it is registered, so a broken
//! registrar shows up in the startup log rather than on the first request.
//! Failures are reported and logged but never stop the server.

use std::sync::Arc;

use tracing::{Instrument, info, warn};
use turul_mcp_stateless::{
    CapabilityKind, CapabilityRegistrar, CapabilityRegistry, McpResult, McpSession, Prompt,
    PromptHandler, Resource, ResourceHandler, Tool, ToolHandler,
};

use crate::config::ServerConfig;
use crate::error::panic_message;

/// Registry decorator that logs each registration before delegating
pub struct LoggingRegistry<'a> {
    inner: &'a mut dyn CapabilityRegistry,
    registered: Vec<(CapabilityKind, String)>,
}

impl<'a> LoggingRegistry<'a> {
    pub fn new(inner: &'a mut dyn CapabilityRegistry) -> Self {
        Self {
            inner,
            registered: Vec::new(),
        }
    }

    /// Capabilities the inner registry accepted, in registration order
    pub fn into_registered(self) -> Vec<(CapabilityKind, String)> {
        self.registered
    }

    fn record(
        &mut self,
        kind: CapabilityKind,
        name: String,
        result: McpResult<()>,
    ) -> McpResult<()> {
        match &result {
            Ok(()) => self.registered.push((kind, name)),
            Err(err) => warn!(kind = %kind, name = %name, error = %err, "Registration rejected"),
        }
        result
    }
}

impl CapabilityRegistry for LoggingRegistry<'_> {
    fn register_tool(&mut self, tool: Tool, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        info!(kind = "tool", name = %tool.name, "Registering tool: {}", tool.name);
        let name = tool.name.clone();
        let result = self.inner.register_tool(tool, handler);
        self.record(CapabilityKind::Tool, name, result)
    }

    fn register_resource(
        &mut self,
        resource: Resource,
        handler: Arc<dyn ResourceHandler>,
    ) -> McpResult<()> {
        info!(
            kind = "resource",
            name = %resource.name,
            uri = %resource.uri,
            "Registering resource: {} ({})",
            resource.name,
            resource.uri
        );
        let uri = resource.uri.clone();
        let result = self.inner.register_resource(resource, handler);
        self.record(CapabilityKind::Resource, uri, result)
    }

    fn register_prompt(
        &mut self,
        prompt: Prompt,
        handler: Arc<dyn PromptHandler>,
    ) -> McpResult<()> {
        info!(kind = "prompt", name = %prompt.name, "Registering prompt: {}", prompt.name);
        let name = prompt.name.clone();
        let result = self.inner.register_prompt(prompt, handler);
        self.record(CapabilityKind::Prompt, name, result)
    }
}

/// What the dry-run saw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    /// Tool and prompt names, resource URIs
    pub registered: Vec<(CapabilityKind, String)>,
    /// Registrar error or panic text, if registration did not complete
    pub error: Option<String>,
    /// Whether the throwaway session was closed afterwards
    pub session_closed: bool,
}

impl DiagnosticReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn count(&self, kind: CapabilityKind) -> usize {
        self.registered.iter().filter(|(k, _)| *k == kind).count()
    }
}

pub struct StartupDiagnostics {
    config: Arc<ServerConfig>,
    registrar: Arc<dyn CapabilityRegistrar>,
}

impl StartupDiagnostics {
    pub fn new(config: Arc<ServerConfig>, registrar: Arc<dyn CapabilityRegistrar>) -> Self {
        Self { config, registrar }
    }

    /// Stand-in URL parameter value, e.g. `:tenant`
    pub fn placeholder_path_param(&self) -> Option<String> {
        self.config
            .url_param_name
            .as_ref()
            .map(|name| format!(":{}", name))
    }

    /// Run the dry-run on its own task and wait for it
    pub async fn run(&self) -> DiagnosticReport {
        let config = Arc::clone(&self.config);
        let registrar = Arc::clone(&self.registrar);
        let placeholder = self.placeholder_path_param();

        let task = dry_run(config, registrar, placeholder).in_current_span();
        let report = match tokio::spawn(task).await {
            Ok(report) => report,
            Err(err) => {
                let message = if err.is_panic() {
                    let panic = err.into_panic();
                    format!("capability registrar panicked: {}", panic_message(panic.as_ref()))
                } else {
                    format!("diagnostics task did not complete: {}", err)
                };
                DiagnosticReport {
                    error: Some(message),
                    // the session is dropped, and so closed, during unwinding
                    session_closed: true,
                    ..DiagnosticReport::default()
                }
            }
        };

        match &report.error {
            None => info!(
                tools = report.count(CapabilityKind::Tool),
                resources = report.count(CapabilityKind::Resource),
                prompts = report.count(CapabilityKind::Prompt),
                "Startup registration check passed"
            ),
            Some(error) => warn!(
                error = %error,
                "Startup registration check failed; the server will start anyway"
            ),
        }
        report
    }
}

async fn dry_run(
    config: Arc<ServerConfig>,
    registrar: Arc<dyn CapabilityRegistrar>,
    placeholder: Option<String>,
) -> DiagnosticReport {
    let mut session = McpSession::new(&config.server_name, &config.server_version);

    let (result, registered) = {
        let mut registry = LoggingRegistry::new(&mut session);
        let result = registrar.register(&mut registry, placeholder.as_deref()).await;
        (result, registry.into_registered())
    };

    session.close();
    DiagnosticReport {
        registered,
        error: result.err().map(|err| err.to_string()),
        session_closed: session.is_closed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turul_mcp_stateless::{CallToolResult, CapabilitySet, tool_fn};

    #[test]
    fn test_logging_registry_records_and_delegates() {
        let mut set = CapabilitySet::new();
        let mut registry = LoggingRegistry::new(&mut set);
        let handler = tool_fn(|_| async { Ok(CallToolResult::from_text("ok")) });

        registry
            .register_tool(Tool::new("echo"), Arc::clone(&handler))
            .unwrap();
        assert!(registry.register_tool(Tool::new("echo"), handler).is_err());

        assert_eq!(
            registry.into_registered(),
            vec![(CapabilityKind::Tool, "echo".to_string())]
        );
        assert_eq!(set.len(), 1);
    }
}
