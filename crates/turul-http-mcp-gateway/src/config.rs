//! Gateway configuration
//!
//! [`ServerConfig`] is immutable once built. Every field has a default, so the
//! smallest useful configuration is just a server name:
//!
//! ```rust
//! use turul_http_mcp_gateway::{AuthPolicy, ServerConfig};
//!
//! let config = ServerConfig::builder("my-server")
//!     .port(8080)
//!     .url_param("tenant")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.route_hint(), "/mcp/:tenant");
//! assert_eq!(config.body_limit_bytes, 15 * 1024 * 1024);
//! assert_eq!(config.auth_policy, AuthPolicy::NoAuth);
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use http::HeaderName;
use thiserror::Error;

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MCP_PATH: &str = "/mcp";
pub const DEFAULT_BODY_LIMIT_MB: u64 = 15;
pub const DEFAULT_API_KEY_ENV: &str = "mcp_api_key";
pub const DEFAULT_AUTH_HEADER: &str = "Authorization";
pub const DEFAULT_AUTH_SCHEME: &str = "Bearer";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Invalid configuration values, reported by [`ServerConfigBuilder::build`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("server name must not be empty")]
    EmptyServerName,

    #[error("port must be between 1 and 65535, got 0")]
    InvalidPort,

    #[error("MCP path must start with '/' and name at least one segment: {0:?}")]
    InvalidMcpPath(String),

    #[error("body limit must be between 1MB and {max}MB, got {got}MB")]
    InvalidBodyLimit { got: u64, max: u64 },

    #[error("URL parameter name must be a non-empty identifier: {0:?}")]
    InvalidUrlParamName(String),

    #[error("invalid credential header name: {0:?}")]
    InvalidHeaderName(String),

    #[error("authentication scheme must be a single non-empty token: {0:?}")]
    InvalidAuthScheme(String),

    #[error("credential query parameter name must not be empty")]
    EmptyQueryParamName,

    #[error("credential source must name a variable or carry a value")]
    EmptyCredentialSource,

    #[error("no capability registrar was provided")]
    MissingRegistrar,
}

/// Where the expected API key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read from the named process environment variable at startup
    Env(String),
    /// A literal value carried in the configuration
    Literal(String),
}

impl CredentialSource {
    /// Resolve the expected credential, looking environment variables up with `lookup`
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        match self {
            CredentialSource::Env(name) => lookup(name),
            CredentialSource::Literal(value) => Some(value.clone()),
        }
    }

    /// A log-safe description that never includes a literal secret
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::Env(name) => format!("environment variable '{}'", name),
            CredentialSource::Literal(_) => "configured literal".to_string(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            CredentialSource::Env(name) => name.trim().is_empty(),
            CredentialSource::Literal(value) => value.is_empty(),
        }
    }
}

impl Default for CredentialSource {
    fn default() -> Self {
        CredentialSource::Env(DEFAULT_API_KEY_ENV.to_string())
    }
}

/// API-key authentication settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyAuth {
    /// Header carrying `<scheme> <credential>`
    pub header_name: String,
    /// Expected first token of the header value
    pub scheme: String,
    pub credential_source: CredentialSource,
    /// Query parameter checked when the header does not yield a credential
    pub query_param_name: Option<String>,
}

impl Default for ApiKeyAuth {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_AUTH_HEADER.to_string(),
            scheme: DEFAULT_AUTH_SCHEME.to_string(),
            credential_source: CredentialSource::default(),
            query_param_name: None,
        }
    }
}

impl ApiKeyAuth {
    /// Bearer auth on the `Authorization` header, key read from `mcp_api_key`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env(variable: impl Into<String>) -> Self {
        Self {
            credential_source: CredentialSource::Env(variable.into()),
            ..Self::default()
        }
    }

    pub fn with_literal(value: impl Into<String>) -> Self {
        Self {
            credential_source: CredentialSource::Literal(value.into()),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn query_param(mut self, name: impl Into<String>) -> Self {
        self.query_param_name = Some(name.into());
        self
    }

    /// Parsed header name; validated by [`ServerConfigBuilder::build`]
    pub fn header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.header_name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(self.header_name.clone()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.header_name()?;
        if self.scheme.is_empty() || self.scheme.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidAuthScheme(self.scheme.clone()));
        }
        if matches!(&self.query_param_name, Some(name) if name.is_empty()) {
            return Err(ConfigError::EmptyQueryParamName);
        }
        if self.credential_source.is_empty() {
            return Err(ConfigError::EmptyCredentialSource);
        }
        Ok(())
    }
}

/// Request authentication policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthPolicy {
    #[default]
    NoAuth,
    ApiKey(ApiKeyAuth),
}

impl AuthPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            AuthPolicy::NoAuth => "none",
            AuthPolicy::ApiKey(_) => "api-key",
        }
    }
}

/// Immutable gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Reported in `initialize` results and log lines
    pub server_name: String,
    pub server_version: String,
    pub host: IpAddr,
    pub port: u16,
    /// Base path of the MCP endpoint
    pub mcp_path: String,
    pub body_limit_mb: u64,
    /// `body_limit_mb` in bytes
    pub body_limit_bytes: usize,
    pub cors_enabled: bool,
    /// Run the startup registration dry-run and log every registration
    pub log_registrations: bool,
    pub auth_policy: AuthPolicy,
    /// Name of the single trailing path segment, e.g. `tenant` for `/mcp/:tenant`
    pub url_param_name: Option<String>,
}

impl ServerConfig {
    pub fn builder(server_name: impl Into<String>) -> ServerConfigBuilder {
        ServerConfigBuilder::new(server_name)
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Route as shown to clients, e.g. `/mcp/:tenant`
    pub fn route_hint(&self) -> String {
        match &self.url_param_name {
            Some(name) => format!("{}/:{}", self.mcp_path, name),
            None => self.mcp_path.clone(),
        }
    }
}

/// Builder for [`ServerConfig`]
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    server_name: String,
    server_version: String,
    host: IpAddr,
    port: u16,
    mcp_path: String,
    body_limit_mb: u64,
    cors_enabled: bool,
    log_registrations: bool,
    auth_policy: AuthPolicy,
    url_param_name: Option<String>,
}

impl ServerConfigBuilder {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            server_version: "1.0.0".to_string(),
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            mcp_path: DEFAULT_MCP_PATH.to_string(),
            body_limit_mb: DEFAULT_BODY_LIMIT_MB,
            cors_enabled: true,
            log_registrations: true,
            auth_policy: AuthPolicy::NoAuth,
            url_param_name: None,
        }
    }

    pub fn server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = version.into();
        self
    }

    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Must be nonzero; serve on an ephemeral port through `GatewayServer::bind_listener`
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn mcp_path(mut self, path: impl Into<String>) -> Self {
        self.mcp_path = path.into();
        self
    }

    pub fn body_limit_mb(mut self, limit: u64) -> Self {
        self.body_limit_mb = limit;
        self
    }

    pub fn cors(mut self, enable: bool) -> Self {
        self.cors_enabled = enable;
        self
    }

    pub fn log_registrations(mut self, enable: bool) -> Self {
        self.log_registrations = enable;
        self
    }

    pub fn auth(mut self, policy: AuthPolicy) -> Self {
        self.auth_policy = policy;
        self
    }

    pub fn api_key(self, auth: ApiKeyAuth) -> Self {
        self.auth(AuthPolicy::ApiKey(auth))
    }

    pub fn url_param(mut self, name: impl Into<String>) -> Self {
        self.url_param_name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        if self.server_name.trim().is_empty() {
            return Err(ConfigError::EmptyServerName);
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let mcp_path = normalize_mcp_path(&self.mcp_path)?;

        let max_mb = usize::MAX as u64 / BYTES_PER_MB;
        if self.body_limit_mb == 0 || self.body_limit_mb > max_mb {
            return Err(ConfigError::InvalidBodyLimit {
                got: self.body_limit_mb,
                max: max_mb,
            });
        }
        let body_limit_bytes = usize::try_from(self.body_limit_mb * BYTES_PER_MB).map_err(|_| {
            ConfigError::InvalidBodyLimit {
                got: self.body_limit_mb,
                max: max_mb,
            }
        })?;

        if let Some(name) = &self.url_param_name
            && !is_param_name(name)
        {
            return Err(ConfigError::InvalidUrlParamName(name.clone()));
        }

        if let AuthPolicy::ApiKey(auth) = &self.auth_policy {
            auth.validate()?;
        }

        Ok(ServerConfig {
            server_name: self.server_name,
            server_version: self.server_version,
            host: self.host,
            port: self.port,
            mcp_path,
            body_limit_mb: self.body_limit_mb,
            body_limit_bytes,
            cors_enabled: self.cors_enabled,
            log_registrations: self.log_registrations,
            auth_policy: self.auth_policy,
            url_param_name: self.url_param_name,
        })
    }
}

/// Leading slash required, trailing slash dropped, root path refused
fn normalize_mcp_path(path: &str) -> Result<String, ConfigError> {
    let trimmed = path.trim_end_matches('/');
    if !path.starts_with('/')
        || trimmed.is_empty()
        || trimmed.contains("//")
        || trimmed.contains(['?', '#', ':'])
    {
        return Err(ConfigError::InvalidMcpPath(path.to_string()));
    }
    Ok(trimmed.to_string())
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::builder("test").build().unwrap();

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 3000);
        assert_eq!(config.mcp_path, "/mcp");
        assert_eq!(config.body_limit_mb, 15);
        assert_eq!(config.body_limit_bytes, 15 * 1024 * 1024);
        assert!(config.cors_enabled);
        assert!(config.log_registrations);
        assert_eq!(config.auth_policy, AuthPolicy::NoAuth);
        assert_eq!(config.url_param_name, None);
        assert_eq!(config.bind_address().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_route_hint() {
        let config = ServerConfig::builder("test")
            .mcp_path("/gateway/")
            .url_param("tenant")
            .build()
            .unwrap();

        assert_eq!(config.mcp_path, "/gateway");
        assert_eq!(config.route_hint(), "/gateway/:tenant");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert_eq!(
            ServerConfig::builder("  ").build().unwrap_err(),
            ConfigError::EmptyServerName
        );
        assert!(matches!(
            ServerConfig::builder("t").mcp_path("mcp").build(),
            Err(ConfigError::InvalidMcpPath(_))
        ));
        assert!(matches!(
            ServerConfig::builder("t").body_limit_mb(0).build(),
            Err(ConfigError::InvalidBodyLimit { got: 0, .. })
        ));
        assert!(matches!(
            ServerConfig::builder("t").url_param("a/b").build(),
            Err(ConfigError::InvalidUrlParamName(_))
        ));
        assert!(matches!(
            ServerConfig::builder("t")
                .api_key(ApiKeyAuth::new().header("bad header"))
                .build(),
            Err(ConfigError::InvalidHeaderName(_))
        ));
        assert!(matches!(
            ServerConfig::builder("t")
                .api_key(ApiKeyAuth::new().scheme("Two Words"))
                .build(),
            Err(ConfigError::InvalidAuthScheme(_))
        ));
    }

    #[test]
    fn test_port_must_be_nonzero() {
        assert_eq!(
            ServerConfig::builder("t").port(0).build().unwrap_err(),
            ConfigError::InvalidPort
        );

        let config = ServerConfig::builder("t").port(1).build().unwrap();
        assert_eq!(config.bind_address().port(), 1);
    }

    #[test]
    fn test_credential_source_resolution() {
        let env = CredentialSource::Env("mcp_api_key".to_string());
        let resolved =
            env.resolve_with(|name| (name == "mcp_api_key").then(|| "s3cret".to_string()));
        assert_eq!(resolved.as_deref(), Some("s3cret"));
        assert_eq!(env.resolve_with(|_| None), None);

        let literal = CredentialSource::Literal("abc".to_string());
        assert_eq!(literal.resolve_with(|_| None).as_deref(), Some("abc"));
        assert!(!literal.describe().contains("abc"));
    }
}
