//! Gateway server: startup diagnostics, listener and accept loop

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use turul_mcp_stateless::CapabilityRegistrar;

use crate::config::{ConfigError, ServerConfig};
use crate::diagnostics::{DiagnosticReport, StartupDiagnostics};
use crate::handler::GatewayHandler;
use crate::{GatewayError, Result};

type CredentialLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builder for [`GatewayServer`]
#[derive(Default)]
pub struct GatewayServerBuilder {
    config: Option<ServerConfig>,
    registrar: Option<Arc<dyn CapabilityRegistrar>>,
    credential_lookup: Option<CredentialLookup>,
}

impl GatewayServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn registrar(mut self, registrar: impl CapabilityRegistrar + 'static) -> Self {
        self.registrar = Some(Arc::new(registrar));
        self
    }

    pub fn shared_registrar(mut self, registrar: Arc<dyn CapabilityRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    /// Replace the process-environment lookup used to resolve an `Env` credential
    pub fn credential_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.credential_lookup = Some(Box::new(lookup));
        self
    }

    pub fn build(self) -> Result<GatewayServer> {
        let registrar = self.registrar.ok_or(ConfigError::MissingRegistrar)?;
        let config = match self.config {
            Some(config) => config,
            None => ServerConfig::builder("turul-mcp-gateway").build()?,
        };

        let handler = match self.credential_lookup {
            Some(lookup) => {
                GatewayHandler::with_credential_lookup(config, Arc::clone(&registrar), lookup)?
            }
            None => GatewayHandler::new(config, Arc::clone(&registrar))?,
        };
        let diagnostics = StartupDiagnostics::new(handler.shared_config(), registrar);

        Ok(GatewayServer {
            handler,
            diagnostics,
        })
    }
}

/// A configured gateway that has not bound its listener yet
pub struct GatewayServer {
    handler: GatewayHandler,
    diagnostics: StartupDiagnostics,
}

impl GatewayServer {
    pub fn builder() -> GatewayServerBuilder {
        GatewayServerBuilder::new()
    }

    pub fn handler(&self) -> &GatewayHandler {
        &self.handler
    }

    pub fn config(&self) -> &ServerConfig {
        self.handler.config()
    }

    /// Run the registration dry-run if enabled
    pub async fn run_diagnostics(&self) -> Option<DiagnosticReport> {
        if self.config().log_registrations {
            Some(self.diagnostics.run().await)
        } else {
            None
        }
    }

    /// Run diagnostics, then bind the configured address
    pub async fn bind(self) -> Result<BoundGatewayServer> {
        self.run_diagnostics().await;

        let addr = self.config().bind_address();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        self.into_bound(listener)
    }

    /// Run diagnostics, then serve on an already-bound listener
    pub async fn bind_listener(self, listener: TcpListener) -> Result<BoundGatewayServer> {
        self.run_diagnostics().await;
        self.into_bound(listener)
    }

    /// Bind and serve until the process ends
    pub async fn run(self) -> Result<()> {
        self.bind().await?.serve().await
    }

    fn into_bound(self, listener: TcpListener) -> Result<BoundGatewayServer> {
        let local_addr = listener.local_addr()?;
        let config = self.handler.config();
        info!(
            "MCP gateway '{}' listening on http://{}{}",
            config.server_name,
            local_addr,
            config.route_hint()
        );
        Ok(BoundGatewayServer {
            handler: self.handler,
            listener,
            local_addr,
        })
    }
}

/// A gateway with a bound listener, ready to accept connections
pub struct BoundGatewayServer {
    handler: GatewayHandler,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl BoundGatewayServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept connections until `shutdown` completes
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve_with_shutdown(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        error!("Failed to accept connection: {}", err);
                        continue;
                    }
                },
            };
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    // Clients dropping the connection mid-exchange is routine
                    if err.is_incomplete_message() || err.is_canceled() {
                        debug!("Client disconnected: {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
