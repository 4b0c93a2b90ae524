//! Connection identity
//!
//! Every websocket connection is assigned a random identity at accept time.
//! A producer's device id is the identity of the connection that announced it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

/// Producers are addressed by the identity of their connection
pub type DeviceId = ConnectionId;

impl ConnectionId {
    /// Allocate a fresh identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_display() {
        let id = ConnectionId::new();
        let parsed: ConnectionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        assert!("ghost".parse::<ConnectionId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ConnectionId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
