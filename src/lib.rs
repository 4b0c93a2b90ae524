//! # talkback-relay
//!
//! Live audio relay. Producers (capture devices) and observers (listeners)
//! hold one websocket each to the relay. Observers pick which producer is
//! the single active stream; only that producer's frames are fanned out,
//! verbatim, to every observer.
//!
//! ```text
//!   producer A ──┐                         ┌──► observer 1
//!   producer B ──┼──► RelayHub ─ active? ──┼──► observer 2
//!   producer C ──┘    (Coordinator)        └──► observer 3
//!                          ▲
//!      start/stop ─────────┘  (from observers)
//! ```
//!
//! ## Modules
//!
//! - [`registry`] - connections, device directory, active-stream arbiter
//! - [`relay`] - coordinator (routing, relay, notification) and the hub actor
//! - [`protocol`] - JSON control messages and connection identities
//! - [`server`] - websocket listener, token auth, per-connection tasks
//! - [`stats`] - counters and the status snapshot
//!
//! ## Example
//!
//! ```no_run
//! use talkback_relay::{RelayServer, ServerConfig};
//!
//! # async fn example() -> talkback_relay::Result<()> {
//! let config = ServerConfig::default().auth_token("s3cret");
//! let server = RelayServer::new(config);
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{ClientMessage, ConnectionId, DeviceId, ServerMessage};
pub use relay::{Coordinator, RelayConfig, RelayHandle, RelayHub};
pub use server::{RelayServer, ServerConfig};
pub use stats::StatusSnapshot;
