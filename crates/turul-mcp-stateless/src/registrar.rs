//! Caller-supplied registration logic

use async_trait::async_trait;

use crate::error::McpResult;
use crate::registry::CapabilityRegistry;

/// Attaches capabilities to a freshly built session.
///
/// Invoked once per request by the gateway, and once at startup against an
/// instrumented registry for diagnostics. `path_param` carries the trimmed URL
/// segment when the gateway is configured with a path parameter.
///
/// Asynchronous registrars implement this trait directly; synchronous logic can be
/// wrapped in [`SyncRegistrar`].
#[async_trait]
pub trait CapabilityRegistrar: Send + Sync {
    async fn register(
        &self,
        registry: &mut dyn CapabilityRegistry,
        path_param: Option<&str>,
    ) -> McpResult<()>;
}

/// Adapter for registrars that do no asynchronous work
pub struct SyncRegistrar<F> {
    register_fn: F,
}

impl<F> SyncRegistrar<F>
where
    F: Fn(&mut dyn CapabilityRegistry, Option<&str>) -> McpResult<()> + Send + Sync,
{
    pub fn new(register_fn: F) -> Self {
        Self { register_fn }
    }
}

#[async_trait]
impl<F> CapabilityRegistrar for SyncRegistrar<F>
where
    F: Fn(&mut dyn CapabilityRegistry, Option<&str>) -> McpResult<()> + Send + Sync,
{
    async fn register(
        &self,
        registry: &mut dyn CapabilityRegistry,
        path_param: Option<&str>,
    ) -> McpResult<()> {
        (self.register_fn)(registry, path_param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Tool;
    use crate::content::CallToolResult;
    use crate::handler::tool_fn;
    use crate::registry::CapabilitySet;

    #[tokio::test]
    async fn test_sync_registrar_receives_path_param() {
        let registrar = SyncRegistrar::new(|registry, path_param| {
            let name = format!("tool-{}", path_param.unwrap_or("none"));
            registry.register_tool(
                Tool::new(name),
                tool_fn(|_| async { Ok(CallToolResult::from_text("ok")) }),
            )
        });

        let mut set = CapabilitySet::new();
        registrar.register(&mut set, Some("abc")).await.unwrap();

        assert!(set.tool("tool-abc").is_some());
    }
}
