//! Relay hub
//!
//! Single-writer dispatch loop. Connection tasks never touch relay state;
//! they turn socket activity into [`RelayEvent`]s and send them through a
//! [`RelayHandle`]. The hub applies events to its [`Coordinator`] strictly one
//! at a time, in channel order.
//!
//! ```text
//!   conn task ──┐
//!   conn task ──┼── mpsc<RelayEvent> ──► RelayHub { Coordinator }
//!   conn task ──┘                             │
//!        ▲                                    │ try_send
//!        └──────── mpsc<Outbound> ◄───────────┘  (one queue per connection)
//! ```

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::config::RelayConfig;
use super::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, ConnectionId};
use crate::registry::{DirectorySnapshot, Outbound, OutboundSender};
use crate::stats::StatusSnapshot;

/// Inputs to the hub
#[derive(Debug)]
pub enum RelayEvent {
    /// A transport was accepted
    Connected {
        id: ConnectionId,
        outbound: OutboundSender,
    },
    /// A control message arrived
    Message {
        id: ConnectionId,
        message: ClientMessage,
    },
    /// An audio frame arrived
    Frame { id: ConnectionId, frame: Bytes },
    /// The transport closed
    Disconnected { id: ConnectionId },
    /// Status query from outside the protocol (health checks)
    Status {
        reply: oneshot::Sender<StatusSnapshot>,
    },
    /// Directory query from outside the protocol
    Snapshot {
        reply: oneshot::Sender<DirectorySnapshot>,
    },
}

/// Owner of the coordinator and the receiving end of the event channel
pub struct RelayHub {
    coordinator: Coordinator,
    events: mpsc::Receiver<RelayEvent>,
}

impl RelayHub {
    /// Create a hub and the handle that feeds it
    pub fn new(config: RelayConfig) -> (Self, RelayHandle) {
        // tokio channels panic on zero capacity
        let (tx, rx) = mpsc::channel(config.event_capacity.max(1));
        let handle = RelayHandle {
            tx,
            outbound_capacity: config.outbound_capacity.max(1),
        };
        let hub = Self {
            coordinator: Coordinator::new(config),
            events: rx,
        };
        (hub, handle)
    }

    /// Create a hub and run it on the current runtime
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn(config: RelayConfig) -> (RelayHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(config);
        let task = tokio::spawn(hub.run());
        (handle, task)
    }

    /// Process events until all senders are gone
    pub async fn run(mut self) {
        tracing::debug!("Relay hub started");

        while let Some(event) = self.events.recv().await {
            self.dispatch(event);
        }

        tracing::debug!("Relay hub stopped");
    }

    fn dispatch(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected { id, outbound } => self.coordinator.connect(id, outbound),
            RelayEvent::Message { id, message } => self.coordinator.handle_message(id, message),
            RelayEvent::Frame { id, frame } => self.coordinator.handle_frame(id, frame),
            RelayEvent::Disconnected { id } => self.coordinator.disconnect(id),
            RelayEvent::Status { reply } => {
                let _ = reply.send(self.coordinator.status());
            }
            RelayEvent::Snapshot { reply } => {
                let _ = reply.send(self.coordinator.snapshot());
            }
        }
    }
}

/// Cloneable sender side of the hub
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayEvent>,
    outbound_capacity: usize,
}

impl RelayHandle {
    /// Attach a connection; returns the queue its deliveries arrive on
    pub async fn connect(&self, id: ConnectionId) -> Result<mpsc::Receiver<Outbound>> {
        let (outbound, rx) = mpsc::channel(self.outbound_capacity);
        self.send(RelayEvent::Connected { id, outbound }).await?;
        Ok(rx)
    }

    pub async fn message(&self, id: ConnectionId, message: ClientMessage) -> Result<()> {
        self.send(RelayEvent::Message { id, message }).await
    }

    pub async fn frame(&self, id: ConnectionId, frame: Bytes) -> Result<()> {
        self.send(RelayEvent::Frame { id, frame }).await
    }

    pub async fn disconnect(&self, id: ConnectionId) -> Result<()> {
        self.send(RelayEvent::Disconnected { id }).await
    }

    /// Observer count, device count and active device
    pub async fn status(&self) -> Result<StatusSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayEvent::Status { reply }).await?;
        rx.await.map_err(|_| Error::RelayClosed)
    }

    /// Current directory contents
    pub async fn snapshot(&self) -> Result<DirectorySnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayEvent::Snapshot { reply }).await?;
        rx.await.map_err(|_| Error::RelayClosed)
    }

    async fn send(&self, event: RelayEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::RelayClosed)
    }
}
