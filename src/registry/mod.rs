//! Connection, device and active-stream state
//!
//! Three layers, each built on the one below:
//!
//! ```text
//!   ActiveStreamArbiter   active: Option<DeviceId>
//!           │             drives `streaming` flags
//!           ▼
//!   DeviceDirectory       DeviceId → ProducerDevice (metadata, streaming)
//!           │             keyed by connection identity
//!           ▼
//!   ConnectionRegistry    ConnectionId → Connection (role)
//!                         ConnectionId → OutboundSender (transport handle)
//! ```
//!
//! None of these types lock. They are owned by the relay coordinator, which
//! is the only writer and keeps the layers consistent with each other.

pub mod arbiter;
pub mod connection;
pub mod device;
pub mod directory;
pub mod error;

pub use arbiter::ActiveStreamArbiter;
pub use connection::{Connection, ConnectionRegistry, Outbound, OutboundSender, Role};
pub use device::{AudioFormat, DeviceMetadata, DeviceSummary, ProducerDevice};
pub use directory::{DeviceDirectory, DirectorySnapshot};
pub use error::{RegistryError, SendError};
