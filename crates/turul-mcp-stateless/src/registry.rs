//! The capability registration surface exposed by a session

use std::sync::Arc;

use crate::capability::{CapabilityKind, Prompt, Resource, Tool};
use crate::error::{McpError, McpResult};
use crate::handler::{PromptHandler, ResourceHandler, ToolHandler};

/// Registration surface handed to a [`CapabilityRegistrar`](crate::CapabilityRegistrar).
///
/// Implemented by [`McpSession`](crate::McpSession) and by decorators that wrap
/// another registry (for example to observe registrations).
pub trait CapabilityRegistry: Send {
    fn register_tool(&mut self, tool: Tool, handler: Arc<dyn ToolHandler>) -> McpResult<()>;

    fn register_resource(
        &mut self,
        resource: Resource,
        handler: Arc<dyn ResourceHandler>,
    ) -> McpResult<()>;

    fn register_prompt(&mut self, prompt: Prompt, handler: Arc<dyn PromptHandler>)
    -> McpResult<()>;
}

/// Capabilities registered on one session, in registration order
#[derive(Default, Clone)]
pub struct CapabilitySet {
    tools: Vec<(Tool, Arc<dyn ToolHandler>)>,
    resources: Vec<(Resource, Arc<dyn ResourceHandler>)>,
    prompts: Vec<(Prompt, Arc<dyn PromptHandler>)>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter().map(|(tool, _)| tool)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().map(|(resource, _)| resource)
    }

    pub fn prompts(&self) -> impl Iterator<Item = &Prompt> {
        self.prompts.iter().map(|(prompt, _)| prompt)
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.tools
            .iter()
            .find(|(tool, _)| tool.name == name)
            .map(|(_, handler)| handler)
    }

    pub fn resource(&self, uri: &str) -> Option<(&Resource, &Arc<dyn ResourceHandler>)> {
        self.resources
            .iter()
            .find(|(resource, _)| resource.uri == uri)
            .map(|(resource, handler)| (resource, handler))
    }

    pub fn prompt(&self, name: &str) -> Option<&Arc<dyn PromptHandler>> {
        self.prompts
            .iter()
            .find(|(prompt, _)| prompt.name == name)
            .map(|(_, handler)| handler)
    }

    pub fn has(&self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::Tool => !self.tools.is_empty(),
            CapabilityKind::Resource => !self.resources.is_empty(),
            CapabilityKind::Prompt => !self.prompts.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len() + self.resources.len() + self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CapabilityRegistry for CapabilitySet {
    fn register_tool(&mut self, tool: Tool, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        if self.tool(&tool.name).is_some() {
            return Err(McpError::DuplicateCapability {
                kind: CapabilityKind::Tool,
                name: tool.name,
            });
        }
        self.tools.push((tool, handler));
        Ok(())
    }

    fn register_resource(
        &mut self,
        resource: Resource,
        handler: Arc<dyn ResourceHandler>,
    ) -> McpResult<()> {
        if self.resource(&resource.uri).is_some() {
            return Err(McpError::DuplicateCapability {
                kind: CapabilityKind::Resource,
                name: resource.uri,
            });
        }
        self.resources.push((resource, handler));
        Ok(())
    }

    fn register_prompt(
        &mut self,
        prompt: Prompt,
        handler: Arc<dyn PromptHandler>,
    ) -> McpResult<()> {
        if self.prompt(&prompt.name).is_some() {
            return Err(McpError::DuplicateCapability {
                kind: CapabilityKind::Prompt,
                name: prompt.name,
            });
        }
        self.prompts.push((prompt, handler));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CallToolResult;
    use crate::handler::tool_fn;

    fn noop_tool() -> Arc<dyn ToolHandler> {
        tool_fn(|_| async { Ok(CallToolResult::from_text("ok")) })
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let mut set = CapabilitySet::new();
        set.register_tool(Tool::new("b"), noop_tool()).unwrap();
        set.register_tool(Tool::new("a"), noop_tool()).unwrap();

        let names: Vec<_> = set.tools().map(|tool| tool.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(set.has(CapabilityKind::Tool));
        assert!(!set.has(CapabilityKind::Prompt));
    }

    #[test]
    fn test_duplicate_tool_is_rejected() {
        let mut set = CapabilitySet::new();
        set.register_tool(Tool::new("echo"), noop_tool()).unwrap();

        let err = set.register_tool(Tool::new("echo"), noop_tool()).unwrap_err();
        assert!(matches!(
            err,
            McpError::DuplicateCapability {
                kind: CapabilityKind::Tool,
                ..
            }
        ));
        assert_eq!(set.len(), 1);
    }
}
