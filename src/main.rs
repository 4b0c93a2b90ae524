//! talkback-relay server binary
//!
//! Run with: talkback-relay [--bind ADDR] [--port PORT] [--auth-token TOKEN]
//!
//! Producers connect and send
//!   {"type":"announce","role":"producer","display_name":"...","platform_version":"..."}
//! then binary PCM frames once told to `start_capture`.
//!
//! Observers connect, send {"type":"announce","role":"observer"}, and pick a
//! device with {"type":"start_listening","device_id":"..."}.

use std::net::SocketAddr;

use clap::Parser;
use talkback_relay::{RelayConfig, RelayServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "talkback-relay", version, about = "Live audio relay server")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "RELAY_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Port to listen on, overriding the port in --bind
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Token peers must present (Authorization: Bearer or ?token=)
    #[arg(long, env = "RELAY_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, env = "RELAY_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Per-connection outbound queue length
    #[arg(long, env = "RELAY_OUTBOUND_CAPACITY", default_value_t = 256)]
    outbound_capacity: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let mut bind = self.bind;
        if let Some(port) = self.port {
            bind.set_port(port);
        }

        let mut config = ServerConfig::with_addr(bind)
            .max_connections(self.max_connections)
            .relay(RelayConfig::default().outbound_capacity(self.outbound_capacity));
        if let Some(token) = self.auth_token {
            config = config.auth_token(token);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("talkback_relay=info".parse()?),
        )
        .init();

    let config = Args::parse().into_config();
    if config.auth_token.is_none() {
        tracing::warn!("No auth token configured; any client may connect");
    }

    let server = RelayServer::new(config);
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
