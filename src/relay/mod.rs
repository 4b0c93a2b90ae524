//! Relay core
//!
//! The [`Coordinator`] owns all relay state and implements the command
//! router, the audio relay and the membership notifier. The [`RelayHub`]
//! runs a coordinator behind a channel so that concurrent connections are
//! serialized into one event stream.
//!
//! # Control flow
//!
//! ```text
//! connect ─► announce ─► directory snapshot to observers
//!                           │
//! observer start/stop ─► router ─► arbiter ─► capture command to producer
//!                           │                  snapshot to observers
//!                           ▼
//! producer frames ─► relay (active sender only) ─► every observer
//!
//! disconnect ─► arbiter release + directory removal ─► snapshot
//! ```

pub mod config;
pub mod coordinator;
pub mod fanout;
pub mod hub;
pub mod router;

pub use config::RelayConfig;
pub use coordinator::Coordinator;
pub use hub::{RelayEvent, RelayHandle, RelayHub};
