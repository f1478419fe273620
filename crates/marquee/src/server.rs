//! `MarqueeServer` builder and server loop.
//!
//! This is the entry point for running the relay. It ties together all the
//! layers: transport → protocol → hub → lobby.

use std::future::Future;
use std::sync::Arc;

use marquee_protocol::{Codec, JsonCodec};
use marquee_transport::{Transport, WebSocketTransport};

use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::hub::{HubHandle, spawn_hub};
use crate::MarqueeError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<K: Codec> {
    pub(crate) hub: HubHandle,
    pub(crate) codec: K,
}

/// Builder for configuring and starting a Marquee server.
///
/// # Example
///
/// ```rust,no_run
/// use marquee::prelude::*;
///
/// # async fn start() -> Result<(), MarqueeError> {
/// let server = MarqueeServer::builder()
///     .config(&ServerConfig::from_env()?)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct MarqueeServerBuilder {
    bind_addr: String,
}

impl MarqueeServerBuilder {
    /// Creates a new builder bound to the default config's address.
    pub fn new() -> Self {
        Self {
            bind_addr: ServerConfig::default().bind_addr(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Takes the bind address from a [`ServerConfig`].
    pub fn config(mut self, config: &ServerConfig) -> Self {
        self.bind_addr = config.bind_addr();
        self
    }

    /// Binds the listener and starts the hub.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`, which is what browser
    /// clients speak.
    pub async fn build(self) -> Result<MarqueeServer<JsonCodec>, MarqueeError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            hub: spawn_hub(),
            codec: JsonCodec,
        });

        Ok(MarqueeServer { transport, state })
    }
}

impl Default for MarqueeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Marquee relay server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct MarqueeServer<K: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<K>>,
}

impl MarqueeServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> MarqueeServerBuilder {
        MarqueeServerBuilder::new()
    }
}

impl<K: Codec> MarqueeServer<K> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), MarqueeError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then shuts the
    /// transport down.
    ///
    /// Each accepted connection is handed to its own task. Connections
    /// already running are left to finish on their own.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), MarqueeError> {
        match self.transport.local_addr() {
            Ok(addr) => tracing::info!(%addr, "Marquee server running"),
            Err(_) => tracing::info!("Marquee server running"),
        }
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        Ok(())
    }
}
