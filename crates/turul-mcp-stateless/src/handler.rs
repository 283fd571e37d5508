//! Handler traits invoked by a session, plus closure adapters

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::content::{CallToolResult, GetPromptResult, ReadResourceResult};
use crate::error::McpResult;

/// Executes a registered tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value) -> McpResult<CallToolResult>;
}

/// Reads a registered resource
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, uri: &str) -> McpResult<ReadResourceResult>;
}

/// Renders a registered prompt
#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn get(&self, arguments: HashMap<String, String>) -> McpResult<GetPromptResult>;
}

struct FnTool<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnTool<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = McpResult<CallToolResult>> + Send + 'static,
{
    async fn call(&self, args: Value) -> McpResult<CallToolResult> {
        (self.0)(args).await
    }
}

struct FnResource<F>(F);

#[async_trait]
impl<F, Fut> ResourceHandler for FnResource<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = McpResult<ReadResourceResult>> + Send + 'static,
{
    async fn read(&self, uri: &str) -> McpResult<ReadResourceResult> {
        (self.0)(uri.to_string()).await
    }
}

struct FnPrompt<F>(F);

#[async_trait]
impl<F, Fut> PromptHandler for FnPrompt<F>
where
    F: Fn(HashMap<String, String>) -> Fut + Send + Sync,
    Fut: Future<Output = McpResult<GetPromptResult>> + Send + 'static,
{
    async fn get(&self, arguments: HashMap<String, String>) -> McpResult<GetPromptResult> {
        (self.0)(arguments).await
    }
}

/// Wrap an async closure as a tool handler
pub fn tool_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = McpResult<CallToolResult>> + Send + 'static,
{
    Arc::new(FnTool(f))
}

/// Wrap an async closure as a resource handler; the closure receives the requested URI
pub fn resource_fn<F, Fut>(f: F) -> Arc<dyn ResourceHandler>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = McpResult<ReadResourceResult>> + Send + 'static,
{
    Arc::new(FnResource(f))
}

/// Wrap an async closure as a prompt handler
pub fn prompt_fn<F, Fut>(f: F) -> Arc<dyn PromptHandler>
where
    F: Fn(HashMap<String, String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = McpResult<GetPromptResult>> + Send + 'static,
{
    Arc::new(FnPrompt(f))
}
