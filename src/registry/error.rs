//! Registry error types
//!
//! Error types for registry, directory and arbiter operations.

use thiserror::Error;

use crate::protocol::DeviceId;

/// Error type for directory and arbiter operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No device with this id, or its connection is no longer live
    #[error("device not found: {0}")]
    NotFound(DeviceId),
}

/// Failure to hand a message to a connection's outbound queue
///
/// Never surfaced to peers: fan-out and forwarding skip the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection is gone or its writer has shut down
    #[error("transport unreachable")]
    TransportUnreachable,
    /// The connection's outbound queue is full; this delivery was dropped
    #[error("outbound queue full")]
    QueueFull,
}
