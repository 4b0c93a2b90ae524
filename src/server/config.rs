//! Server configuration

use std::net::SocketAddr;

use crate::relay::RelayConfig;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Shared secret peers must present on upgrade (None = open relay)
    pub auth_token: Option<String>,

    /// Relay hub and queue tuning
    pub relay: RelayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,  // Frames are small and latency-sensitive
            auth_token: None,
            relay: RelayConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Require peers to present this token
    ///
    /// An empty token is treated as no token.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = if token.is_empty() { None } else { Some(token) };
        self
    }

    /// Set relay tuning
    pub fn relay(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }
}
