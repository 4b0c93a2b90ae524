//! Command routing
//!
//! Start/stop requests from observers are validated against the directory,
//! applied to the arbiter and forwarded to the producer. Forwarding is
//! fire-and-forget: a successful result means the capture command was queued
//! for a live connection, not that the producer began capturing.

use super::coordinator::Coordinator;
use crate::protocol::{CommandError, CommandResult, ConnectionId, DeviceId, ServerMessage};
use crate::registry::Outbound;

impl Coordinator {
    /// Elect `device_id` as the active stream and tell it to start capturing
    pub fn start_listening(&mut self, requester: ConnectionId, device_id: &str) -> CommandResult {
        self.stats.commands_handled += 1;

        let Some(id) = self.resolve_device(device_id) else {
            tracing::debug!(requester = %requester, device_id = device_id, "Start rejected: unknown device");
            return CommandResult::failed(CommandError::NotFound);
        };

        if let Err(e) = self
            .arbiter
            .activate(&mut self.directory, &self.connections, id)
        {
            tracing::debug!(requester = %requester, error = %e, "Start rejected");
            return CommandResult::failed(CommandError::NotFound);
        }

        self.forward(
            id,
            ServerMessage::StartCapture {
                requester_id: requester,
            },
        );
        self.broadcast_snapshot();

        tracing::info!(requester = %requester, device_id = %id, "Listening started");
        CommandResult::ok(id)
    }

    /// Tell `device_id` to stop capturing and release it if it is active
    pub fn stop_listening(&mut self, requester: ConnectionId, device_id: &str) -> CommandResult {
        self.stats.commands_handled += 1;

        let Some(id) = self.resolve_device(device_id) else {
            tracing::debug!(requester = %requester, device_id = device_id, "Stop rejected: unknown device");
            return CommandResult::failed(CommandError::NotFound);
        };

        self.forward(
            id,
            ServerMessage::StopCapture {
                requester_id: requester,
            },
        );
        self.arbiter.deactivate(&mut self.directory, id);
        self.broadcast_snapshot();

        tracing::info!(requester = %requester, device_id = %id, "Listening stopped");
        CommandResult::ok(id)
    }

    /// Map a device id from the wire to a registered, live device
    fn resolve_device(&self, raw: &str) -> Option<DeviceId> {
        raw.trim()
            .parse::<DeviceId>()
            .ok()
            .filter(|id| self.directory.contains(*id) && self.connections.is_live(*id))
    }

    /// Queue a capture command for a producer; unreachable producers are skipped
    fn forward(&mut self, id: DeviceId, message: ServerMessage) {
        if let Err(e) = self.connections.send(id, Outbound::Message(message)) {
            self.stats.deliveries_skipped += 1;
            tracing::debug!(device_id = %id, error = %e, "Capture command not delivered");
        }
    }
}
