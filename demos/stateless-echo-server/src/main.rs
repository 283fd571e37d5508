//! Stateless Echo Server
//!
//! Serves a few tools, a resource and a prompt through the stateless gateway.
//! Every POST builds a fresh session, so nothing survives between requests.
//!
//! # Usage
//!
//! ```bash
//! # Open server on the default port
//! cargo run --bin stateless-echo-server
//!
//! # Per-tenant routes, API key from the environment
//! MCP_API_KEY_VALUE=secret cargo run --bin stateless-echo-server -- \
//!   --url-param tenant --api-key-env MCP_API_KEY_VALUE
//!
//! curl -X POST http://localhost:3000/mcp/acme \
//!   -H "Content-Type: application/json" \
//!   -H "Authorization: Bearer secret" \
//!   -d '{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"whoami","arguments":{}}}'
//! ```

use std::net::IpAddr;

use anyhow::Context;
use clap::Parser;
use serde_json::{Value, json};
use tracing::info;
use turul_http_mcp_gateway::{ApiKeyAuth, GatewayServer, ServerConfig};
use turul_mcp_stateless::{
    CallToolResult, CapabilityRegistry, GetPromptResult, McpError, McpResult, Prompt,
    PromptArgument, PromptMessage, ReadResourceResult, Resource, SyncRegistrar, Tool, prompt_fn,
    resource_fn, tool_fn,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, env = "MCP_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    #[arg(long, env = "MCP_PORT", default_value = "3000")]
    port: u16,

    /// Base route for MCP requests
    #[arg(long, env = "MCP_PATH", default_value = "/mcp")]
    path: String,

    /// Maximum request body size in megabytes
    #[arg(long, default_value = "15")]
    body_limit_mb: u64,

    /// Name of a trailing URL segment handed to the registrar, e.g. `tenant`
    #[arg(long)]
    url_param: Option<String>,

    /// Require an API key read from this environment variable
    #[arg(long)]
    api_key_env: Option<String>,

    /// Query parameter accepted as a fallback credential
    #[arg(long, requires = "api_key_env")]
    api_key_query: Option<String>,

    #[arg(long)]
    no_cors: bool,

    #[arg(long)]
    quiet_startup: bool,
}

fn register(registry: &mut dyn CapabilityRegistry, tenant: Option<&str>) -> McpResult<()> {
    let tenant = tenant.unwrap_or("default").to_string();

    registry.register_tool(
        Tool::new("echo")
            .with_description("Echo back the supplied text")
            .with_input_schema(json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })),
        tool_fn(|args: Value| async move {
            let text = args
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| McpError::MissingParameter("text".to_string()))?;
            Ok(CallToolResult::from_text(text))
        }),
    )?;

    registry.register_tool(
        Tool::new("add")
            .with_description("Add two numbers")
            .with_input_schema(json!({
                "type": "object",
                "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                "required": ["a", "b"]
            })),
        tool_fn(|args: Value| async move {
            let operand = |name: &str| {
                args.get(name)
                    .and_then(Value::as_f64)
                    .ok_or_else(|| McpError::MissingParameter(name.to_string()))
            };
            let sum = operand("a")? + operand("b")?;
            Ok(CallToolResult::from_structured(json!({ "sum": sum })))
        }),
    )?;

    let whoami = tenant.clone();
    registry.register_tool(
        Tool::new("whoami").with_description("Report the tenant this session was built for"),
        tool_fn(move |_| {
            let tenant = whoami.clone();
            async move { Ok(CallToolResult::from_text(tenant)) }
        }),
    )?;

    let uri = format!("tenant://{}/profile", tenant);
    let profile = json!({ "tenant": tenant }).to_string();
    registry.register_resource(
        Resource::new(uri, "profile")
            .with_description("Tenant profile")
            .with_mime_type("application/json"),
        resource_fn(move |uri| {
            let profile = profile.clone();
            async move { Ok(ReadResourceResult::text(uri, Some("application/json"), profile)) }
        }),
    )?;

    registry.register_prompt(
        Prompt::new("greet")
            .with_description("Greet someone by name")
            .with_argument(PromptArgument::required("name")),
        prompt_fn(|arguments| async move {
            let name = arguments
                .get("name")
                .cloned()
                .ok_or_else(|| McpError::MissingParameter("name".to_string()))?;
            Ok(GetPromptResult {
                description: None,
                messages: vec![PromptMessage::user(format!("Say hello to {}", name))],
            })
        }),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = "stateless_echo_server=info,turul_http_mcp_gateway=info";
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let mut builder = ServerConfig::builder("stateless-echo-server")
        .server_version(env!("CARGO_PKG_VERSION"))
        .host(args.host)
        .port(args.port)
        .mcp_path(args.path)
        .body_limit_mb(args.body_limit_mb)
        .cors(!args.no_cors)
        .log_registrations(!args.quiet_startup);

    if let Some(name) = args.url_param {
        builder = builder.url_param(name);
    }
    if let Some(variable) = args.api_key_env {
        let mut auth = ApiKeyAuth::from_env(variable);
        if let Some(query) = args.api_key_query {
            auth = auth.query_param(query);
        }
        builder = builder.api_key(auth);
    }
    let config = builder.build().context("invalid server configuration")?;

    let server = GatewayServer::builder()
        .config(config)
        .registrar(SyncRegistrar::new(register))
        .build()?;

    info!("Starting stateless-echo-server");
    let bound = server.bind().await.context("failed to start listener")?;
    bound.serve().await?;
    Ok(())
}
