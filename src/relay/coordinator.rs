//! Relay coordinator
//!
//! Owns the connection registry, device directory and arbiter, and is the
//! only place they are mutated. Every method runs to completion without
//! awaiting, so a caller that serializes calls (the hub) gets atomic state
//! transitions: a device removal and the matching arbiter release are never
//! observed half-done.
//!
//! Command routing lives in `router.rs`, frame relay and snapshot broadcast
//! in `fanout.rs`.

use bytes::Bytes;

use super::config::RelayConfig;
use crate::protocol::{Announce, ClientMessage, ConnectionId, ProducerAnnounce, ServerMessage};
use crate::registry::{
    ActiveStreamArbiter, ConnectionRegistry, DeviceDirectory, DeviceMetadata, DirectorySnapshot,
    Outbound, OutboundSender, Role,
};
use crate::stats::{RelayStats, StatusSnapshot};

/// Single owner of all relay state
#[derive(Debug)]
pub struct Coordinator {
    pub(super) connections: ConnectionRegistry,
    pub(super) directory: DeviceDirectory,
    pub(super) arbiter: ActiveStreamArbiter,
    pub(super) stats: RelayStats,
    config: RelayConfig,
}

impl Coordinator {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            directory: DeviceDirectory::new(),
            arbiter: ActiveStreamArbiter::new(),
            stats: RelayStats::new(),
            config,
        }
    }

    /// Attach the transport of a newly accepted connection
    pub fn connect(&mut self, id: ConnectionId, outbound: OutboundSender) {
        self.connections.attach(id, outbound);
        self.stats.total_connections += 1;

        tracing::debug!(
            connection_id = %id,
            connections = self.connections.transport_count(),
            "Connection attached"
        );
    }

    /// Process one control message from a peer
    pub fn handle_message(&mut self, id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::Announce(Announce::Producer(announce)) => {
                self.announce_producer(id, announce)
            }
            ClientMessage::Announce(Announce::Observer) => self.announce_observer(id),
            ClientMessage::RequestDeviceList => self.send_snapshot_to(id),
            ClientMessage::StartListening { device_id } => {
                let result = self.start_listening(id, &device_id);
                self.reply(id, ServerMessage::ListeningStarted(result));
            }
            ClientMessage::StopListening { device_id } => {
                let result = self.stop_listening(id, &device_id);
                self.reply(id, ServerMessage::ListeningStopped(result));
            }
            ClientMessage::RequestStatus => {
                let status = self.status();
                self.reply(id, ServerMessage::Status(status));
            }
        }
    }

    /// Process one binary frame from a peer
    pub fn handle_frame(&mut self, id: ConnectionId, frame: Bytes) {
        self.relay_frame(id, frame);
    }

    /// Register `id` as a producer and publish the new directory
    ///
    /// A repeated announce overwrites the device's metadata and returns it
    /// to the idle state; if it was the active stream, it is released.
    pub fn announce_producer(&mut self, id: ConnectionId, announce: ProducerAnnounce) {
        if !self.connections.is_live(id) {
            tracing::debug!(connection_id = %id, "Producer announce from dead connection ignored");
            return;
        }

        self.connections.register(id, Role::Producer);
        self.arbiter.deactivate(&mut self.directory, id);

        let ordinal = if self.directory.contains(id) {
            self.directory.len()
        } else {
            self.directory.len() + 1
        };
        let metadata = DeviceMetadata::from_announce(announce, ordinal, self.config.default_format);

        tracing::info!(
            device_id = %id,
            name = %metadata.display_name,
            platform_version = %metadata.platform_version,
            sample_rate = metadata.format.sample_rate,
            channels = metadata.format.channels,
            "Producer announced"
        );

        self.directory.register_device(id, metadata);
        self.broadcast_snapshot();
    }

    /// Register `id` as an observer and send it the current directory
    pub fn announce_observer(&mut self, id: ConnectionId) {
        if !self.connections.is_live(id) {
            tracing::debug!(connection_id = %id, "Observer announce from dead connection ignored");
            return;
        }

        let previous = self.connections.register(id, Role::Observer);

        tracing::info!(
            connection_id = %id,
            observers = self.connections.count_by_role(Role::Observer),
            "Observer announced"
        );

        // A producer turning observer takes its device out of the directory;
        // the broadcast then reaches this connection as well.
        if previous == Some(Role::Producer) && self.retire_device(id) {
            self.broadcast_snapshot();
        } else {
            self.send_snapshot_to(id);
        }
    }

    /// Drop every trace of a connection
    ///
    /// A producer's device is released by the arbiter and removed from the
    /// directory in the same step. Unknown ids are a no-op.
    pub fn disconnect(&mut self, id: ConnectionId) {
        let connection = self.connections.unregister(id);
        let retired = self.retire_device(id);

        tracing::debug!(
            connection_id = %id,
            role = ?connection.as_ref().map(|c| c.role),
            announced_for = ?connection.as_ref().map(|c| c.announced_at.elapsed()),
            connections = self.connections.transport_count(),
            "Connection detached"
        );

        if retired {
            self.broadcast_snapshot();
        }
    }

    /// Current directory contents
    pub fn snapshot(&self) -> DirectorySnapshot {
        self.directory.snapshot()
    }

    /// Operational status
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            observer_count: self.connections.count_by_role(Role::Observer),
            device_count: self.directory.len(),
            active_device_id: self.arbiter.active(),
            stats: self.stats,
        }
    }

    /// Release and remove a device; returns true if one was present
    fn retire_device(&mut self, id: ConnectionId) -> bool {
        let was_active = self.arbiter.deactivate(&mut self.directory, id);

        match self.directory.remove_device(id) {
            Some(device) => {
                tracing::info!(
                    device_id = %id,
                    name = %device.metadata.display_name,
                    was_active = was_active,
                    "Producer removed"
                );
                true
            }
            None => false,
        }
    }

    /// Send a control message to one peer, skipping it if unreachable
    pub(super) fn reply(&mut self, id: ConnectionId, message: ServerMessage) {
        if let Err(e) = self.connections.send(id, Outbound::Message(message)) {
            self.stats.deliveries_skipped += 1;
            tracing::debug!(connection_id = %id, error = %e, "Reply not delivered");
        }
    }

    /// Check the cross-layer invariants; panics on violation
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let streaming: Vec<_> = self.directory.streaming_devices().collect();

        match self.arbiter.active() {
            Some(active) => {
                assert!(self.directory.contains(active), "active device not in directory");
                assert_eq!(streaming, vec![active], "streaming flags diverge from active id");
            }
            None => assert!(streaming.is_empty(), "device streaming without active id"),
        }

        for device in self.directory.snapshot().devices {
            assert_eq!(
                self.connections.role(device.id),
                Some(Role::Producer),
                "device without a live producer connection"
            );
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}
