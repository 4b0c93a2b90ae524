//! Device directory
//!
//! Holds one [`ProducerDevice`] per announced producer connection. The
//! directory does not know which device is active; the arbiter drives the
//! `streaming` flag through [`DeviceDirectory::set_streaming`].

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::device::{DeviceMetadata, DeviceSummary, ProducerDevice};
use crate::protocol::DeviceId;

/// Registered producers keyed by connection identity
#[derive(Debug, Default)]
pub struct DeviceDirectory {
    devices: HashMap<DeviceId, ProducerDevice>,
    next_seq: u64,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a device with `streaming = false`
    ///
    /// A repeated announce from the same id keeps its original position in
    /// snapshots. Returns true if the device was not present before.
    pub fn register_device(&mut self, id: DeviceId, metadata: DeviceMetadata) -> bool {
        let seq = match self.devices.get(&id) {
            Some(existing) => existing.seq,
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };

        let previous = self.devices.insert(
            id,
            ProducerDevice {
                id,
                metadata,
                registered_at: SystemTime::now(),
                streaming: false,
                seq,
            },
        );
        previous.is_none()
    }

    pub fn remove_device(&mut self, id: DeviceId) -> Option<ProducerDevice> {
        self.devices.remove(&id)
    }

    /// Set the streaming flag; absent ids are ignored
    pub fn set_streaming(&mut self, id: DeviceId, streaming: bool) -> bool {
        match self.devices.get_mut(&id) {
            Some(device) => {
                device.streaming = streaming;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: DeviceId) -> Option<&ProducerDevice> {
        self.devices.get(&id)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices currently flagged as streaming
    pub fn streaming_devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.devices
            .values()
            .filter(|d| d.streaming)
            .map(|d| d.id)
    }

    /// Serializable copy of every record, in registration order
    pub fn snapshot(&self) -> DirectorySnapshot {
        let mut devices: Vec<&ProducerDevice> = self.devices.values().collect();
        devices.sort_by_key(|d| d.seq);

        DirectorySnapshot {
            devices: devices.into_iter().map(ProducerDevice::summary).collect(),
        }
    }
}

/// Read-only projection of the directory
///
/// Recomputed on demand and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    pub devices: Vec<DeviceSummary>,
}

impl DirectorySnapshot {
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, id: DeviceId) -> Option<&DeviceSummary> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn into_devices(self) -> Vec<DeviceSummary> {
        self.devices
    }
}
