//! Producer device records
//!
//! [`ProducerDevice`] is the directory's own record. [`DeviceSummary`] is the
//! serializable projection handed to observers; it never carries a
//! connection handle.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::protocol::{DeviceId, ProducerAnnounce};

/// Sample rate used when a producer does not declare one
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Channel count used when a producer does not declare one
pub const DEFAULT_CHANNELS: u8 = 1;

/// PCM layout of a producer's frames
///
/// Samples are 16-bit little-endian by convention. The format is declared
/// once at announce time and is never checked against frame contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u8,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

/// Metadata supplied by a producer's announce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMetadata {
    pub display_name: String,
    pub platform_version: String,
    /// Producer-reported announce time (ms since epoch)
    pub timestamp: u64,
    pub format: AudioFormat,
}

impl DeviceMetadata {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            platform_version: String::new(),
            timestamp: 0,
            format: AudioFormat::default(),
        }
    }

    /// Build metadata from an announce payload
    ///
    /// A missing or blank name becomes `Device {ordinal}`. Sample rate and
    /// channel count fall back to `fallback` independently.
    pub fn from_announce(announce: ProducerAnnounce, ordinal: usize, fallback: AudioFormat) -> Self {
        let display_name = announce
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Device {}", ordinal));

        Self {
            display_name,
            platform_version: announce.platform_version.unwrap_or_default(),
            timestamp: announce.timestamp,
            format: AudioFormat {
                sample_rate: announce.sample_rate.unwrap_or(fallback.sample_rate),
                channels: announce.channels.unwrap_or(fallback.channels),
            },
        }
    }
}

/// A registered producer
#[derive(Debug, Clone)]
pub struct ProducerDevice {
    /// Identity of the backing connection
    pub id: DeviceId,
    pub metadata: DeviceMetadata,
    /// Relay-side registration time
    pub registered_at: SystemTime,
    /// True only while this device is the active stream
    pub streaming: bool,
    /// Registration order, used to keep snapshots stable
    pub(crate) seq: u64,
}

impl ProducerDevice {
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            id: self.id,
            name: self.metadata.display_name.clone(),
            platform_version: self.metadata.platform_version.clone(),
            timestamp: self.metadata.timestamp,
            registered_at: millis_since_epoch(self.registered_at),
            sample_rate: self.metadata.format.sample_rate,
            channels: self.metadata.format.channels,
            streaming: self.streaming,
        }
    }
}

/// One entry of a directory snapshot, as sent in `device_list_updated`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: DeviceId,
    pub name: String,
    pub platform_version: String,
    pub timestamp: u64,
    pub registered_at: u64,
    pub sample_rate: u32,
    pub channels: u8,
    pub streaming: bool,
}

fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
