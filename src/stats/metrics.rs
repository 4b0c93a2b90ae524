//! Statistics and operational status for the relay

use serde::{Deserialize, Serialize};

use crate::protocol::DeviceId;

/// Relay-wide counters
///
/// Updated only by the coordinator, so plain integers are enough.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStats {
    /// Connections ever attached
    pub total_connections: u64,
    /// Binary frames received from any connection
    pub frames_received: u64,
    /// Individual frame deliveries queued to observers
    pub frames_relayed: u64,
    /// Frames discarded because the sender was not the active stream
    pub frames_dropped: u64,
    /// Deliveries skipped because the peer was gone or its queue was full
    pub deliveries_skipped: u64,
    /// Start/stop commands processed
    pub commands_handled: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Point-in-time status, as served to health checks and `request_status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub observer_count: usize,
    pub device_count: usize,
    pub active_device_id: Option<DeviceId>,
    pub stats: RelayStats,
}
