//! Wire protocol
//!
//! Peers hold one persistent websocket connection each. Text frames carry
//! JSON control messages ([`ClientMessage`] inbound, [`ServerMessage`]
//! outbound); binary frames carry audio and are relayed without inspection.

pub mod id;
pub mod message;

pub use id::{ConnectionId, DeviceId};
pub use message::{
    Announce, ClientMessage, CommandError, CommandResult, ProducerAnnounce, ServerMessage,
};
