//! Relay server listener
//!
//! Handles the TCP accept loop, upgrades connections to websockets and
//! spawns a connection task per peer.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::protocol::ConnectionId;
use crate::relay::{RelayHandle, RelayHub};
use crate::server::auth::TokenAuth;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::stats::StatusSnapshot;

/// Relay server
pub struct RelayServer {
    config: ServerConfig,
    relay: RelayHandle,
    auth: TokenAuth,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl RelayServer {
    /// Create a new server and start its relay hub
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ServerConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let (relay, _hub_task) = RelayHub::spawn(config.relay.clone());
        let auth = TokenAuth::new(config.auth_token.clone());

        Self {
            config,
            relay,
            auth,
            connection_semaphore,
        }
    }

    /// Handle to the relay hub, for status queries
    pub fn relay(&self) -> &RelayHandle {
        &self.relay
    }

    /// Current relay status
    pub async fn status(&self) -> Result<StatusSnapshot> {
        self.relay.status().await
    }

    /// Run the server
    ///
    /// Returns only if binding fails; otherwise serves forever.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.accept_loop(&listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = self.bind().await?;

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(addr = %addr, auth = self.auth.is_enabled(), "Relay server listening");
        }
        self.accept_loop(&listener).await
    }

    async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            auth = self.auth.is_enabled(),
            "Relay server listening"
        );
        Ok(listener)
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let id = ConnectionId::new();
        let relay = self.relay.clone();
        let callback = self.auth.callback();

        tracing::debug!(connection_id = %id, peer = %peer_addr, "New connection");

        tokio::spawn(async move {
            let _permit = permit;

            let ws = match tokio_tungstenite::accept_hdr_async(socket, callback).await {
                Ok(ws) => ws,
                Err(e) => {
                    tracing::warn!(peer = %peer_addr, error = %e, "Websocket upgrade failed");
                    return;
                }
            };

            let connection = Connection::new(id, peer_addr, relay);
            if let Err(e) = connection.run(ws).await {
                tracing::debug!(connection_id = %id, error = %e, "Connection error");
            }

            tracing::debug!(connection_id = %id, "Connection closed");
        });
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
