//! Control message set
//!
//! Control traffic travels as JSON text frames, internally tagged by `type`.
//! Audio never goes through these types: it is carried as binary websocket
//! messages and handed to the relay as opaque `Bytes`.
//!
//! ```text
//! producer → core   {"type":"announce","role":"producer","display_name":"Pixel 7",...}
//! observer → core   {"type":"announce","role":"observer"}
//! observer → core   {"type":"start_listening","device_id":"<uuid>"}
//! core → producer   {"type":"start_capture","requester_id":"<uuid>"}
//! core → observer   {"type":"listening_started","success":true,"device_id":"<uuid>"}
//! ```

use serde::{Deserialize, Serialize};

use super::id::{ConnectionId, DeviceId};
use crate::registry::DeviceSummary;
use crate::stats::StatusSnapshot;

/// Messages accepted from peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Declare the connection's role
    Announce(Announce),
    /// Ask for the current directory snapshot
    RequestDeviceList,
    /// Make a device the active stream and start its capture
    StartListening { device_id: String },
    /// Stop a device's capture and release it if active
    StopListening { device_id: String },
    /// Ask for the relay's operational status
    RequestStatus,
}

/// Role declaration carried by `announce`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Announce {
    Producer(ProducerAnnounce),
    Observer,
}

/// Metadata a producer sends when it announces itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProducerAnnounce {
    #[serde(default, alias = "deviceName")]
    pub display_name: Option<String>,

    #[serde(default, alias = "androidVersion")]
    pub platform_version: Option<String>,

    /// Producer-side clock at announce time, milliseconds since the epoch
    #[serde(default)]
    pub timestamp: u64,

    /// Sample rate of the frames this producer will send, in Hz
    #[serde(default, alias = "sampleRate")]
    pub sample_rate: Option<u32>,

    /// Channel count of the frames this producer will send
    #[serde(default)]
    pub channels: Option<u8>,
}

/// Messages sent by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Instructs a producer to begin capturing
    StartCapture { requester_id: ConnectionId },
    /// Instructs a producer to stop capturing
    StopCapture { requester_id: ConnectionId },
    /// Full directory snapshot
    DeviceListUpdated { devices: Vec<DeviceSummary> },
    /// Reply to `start_listening`
    ListeningStarted(CommandResult),
    /// Reply to `stop_listening`
    ListeningStopped(CommandResult),
    /// Reply to `request_status`
    Status(StatusSnapshot),
}

/// Command failure codes reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandError {
    /// No live device with that id
    NotFound,
}

/// Outcome of a start/stop command
///
/// `success` means the capture command was dispatched to a live producer
/// connection; the producer does not acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResult {
    pub fn ok(device_id: DeviceId) -> Self {
        Self {
            success: true,
            device_id: Some(device_id),
            error: None,
        }
    }

    pub fn failed(error: CommandError) -> Self {
        Self {
            success: false,
            device_id: None,
            error: Some(error),
        }
    }
}

impl ClientMessage {
    /// Decode a JSON text frame
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl ServerMessage {
    /// Encode as a JSON text frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_producer_announce() {
        let msg = ClientMessage::from_json(
            r#"{"type":"announce","role":"producer","display_name":"Pixel 7",
                "platform_version":"14","timestamp":1700000000000}"#,
        )
        .unwrap();

        match msg {
            ClientMessage::Announce(Announce::Producer(p)) => {
                assert_eq!(p.display_name.as_deref(), Some("Pixel 7"));
                assert_eq!(p.platform_version.as_deref(), Some("14"));
                assert_eq!(p.timestamp, 1_700_000_000_000);
                assert_eq!(p.sample_rate, None);
                assert_eq!(p.channels, None);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_producer_announce_legacy_field_names() {
        let msg = ClientMessage::from_json(
            r#"{"type":"announce","role":"producer","deviceName":"SM-G991B","androidVersion":"13"}"#,
        )
        .unwrap();

        let ClientMessage::Announce(Announce::Producer(p)) = msg else {
            panic!("expected producer announce");
        };
        assert_eq!(p.display_name.as_deref(), Some("SM-G991B"));
        assert_eq!(p.platform_version.as_deref(), Some("13"));
        assert_eq!(p.timestamp, 0);
    }

    #[test]
    fn test_decode_producer_announce_with_format() {
        let msg = ClientMessage::from_json(
            r#"{"type":"announce","role":"producer","sample_rate":16000,"channels":2}"#,
        )
        .unwrap();

        let ClientMessage::Announce(Announce::Producer(p)) = msg else {
            panic!("expected producer announce");
        };
        assert_eq!(p.sample_rate, Some(16000));
        assert_eq!(p.channels, Some(2));
    }

    #[test]
    fn test_decode_partial_format_keeps_declared_field() {
        let msg = ClientMessage::from_json(
            r#"{"type":"announce","role":"producer","sample_rate":16000}"#,
        )
        .unwrap();

        let ClientMessage::Announce(Announce::Producer(p)) = msg else {
            panic!("expected producer announce");
        };
        assert_eq!(p.sample_rate, Some(16000));
        assert_eq!(p.channels, None);
    }

    #[test]
    fn test_decode_camel_case_sample_rate() {
        let msg = ClientMessage::from_json(
            r#"{"type":"announce","role":"producer","sampleRate":16000,"channels":1}"#,
        )
        .unwrap();

        let ClientMessage::Announce(Announce::Producer(p)) = msg else {
            panic!("expected producer announce");
        };
        assert_eq!(p.sample_rate, Some(16000));
        assert_eq!(p.channels, Some(1));
    }

    #[test]
    fn test_decode_observer_messages() {
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"announce","role":"observer"}"#).unwrap(),
            ClientMessage::Announce(Announce::Observer)
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"request_device_list"}"#).unwrap(),
            ClientMessage::RequestDeviceList
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"start_listening","device_id":"ghost"}"#)
                .unwrap(),
            ClientMessage::StartListening {
                device_id: "ghost".into()
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(ClientMessage::from_json(r#"{"type":"self_destruct"}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_encode_failed_result_omits_device() {
        let msg = ServerMessage::ListeningStarted(CommandResult::failed(CommandError::NotFound));
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "listening_started");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "not_found");
        assert!(json.get("device_id").is_none());
    }

    #[test]
    fn test_encode_start_capture() {
        let requester = ConnectionId::new();
        let msg = ServerMessage::StartCapture {
            requester_id: requester,
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "start_capture");
        assert_eq!(json["requester_id"], requester.to_string());
    }
}
