//! Connection registry
//!
//! Two tables keyed by connection identity: the domain record (role, join
//! time) and the transport handle used to reach the peer. Handles stay in
//! this module; nothing that is serialized to peers ever holds one.

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::error::SendError;
use crate::protocol::{ConnectionId, ServerMessage};

/// Something queued for delivery to one peer
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// JSON control message
    Message(ServerMessage),
    /// Audio frame, relayed verbatim
    Frame(Bytes),
}

/// Sending half of a connection's outbound queue
pub type OutboundSender = mpsc::Sender<Outbound>;

/// Role a connection declared in its announce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Producer,
    Observer,
}

/// An announced connection
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub role: Role,
    /// Time of the latest announce
    pub announced_at: Instant,
}

/// Registry of live connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    transports: HashMap<ConnectionId, OutboundSender>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the transport of a freshly accepted connection
    ///
    /// The connection has no role until it announces.
    pub fn attach(&mut self, id: ConnectionId, outbound: OutboundSender) {
        self.transports.insert(id, outbound);
    }

    /// Assign a role to an attached connection
    ///
    /// Returns the previous role if the connection had already announced,
    /// or `None` for a first announce. Identities without a transport are
    /// ignored.
    pub fn register(&mut self, id: ConnectionId, role: Role) -> Option<Role> {
        if !self.transports.contains_key(&id) {
            tracing::debug!(connection_id = %id, "Register ignored: no transport");
            return None;
        }

        let previous = self.connections.get(&id).map(|c| c.role);
        self.connections.insert(
            id,
            Connection {
                id,
                role,
                announced_at: Instant::now(),
            },
        );
        previous
    }

    /// Drop both the record and the transport; unknown ids are a no-op
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Connection> {
        self.transports.remove(&id);
        self.connections.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn role(&self, id: ConnectionId) -> Option<Role> {
        self.connections.get(&id).map(|c| c.role)
    }

    /// Announced connections with the given role
    pub fn list_by_role(&self, role: Role) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.values().filter(move |c| c.role == role)
    }

    pub fn count_by_role(&self, role: Role) -> usize {
        self.list_by_role(role).count()
    }

    /// Whether the connection still has a working transport
    pub fn is_live(&self, id: ConnectionId) -> bool {
        self.transports
            .get(&id)
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    /// Number of attached transports, announced or not
    pub fn transport_count(&self) -> usize {
        self.transports.len()
    }

    /// Queue a delivery without waiting
    pub fn send(&self, id: ConnectionId, outbound: Outbound) -> Result<(), SendError> {
        let tx = self
            .transports
            .get(&id)
            .ok_or(SendError::TransportUnreachable)?;

        tx.try_send(outbound).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::TransportUnreachable,
        })
    }
}
