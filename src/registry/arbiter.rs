//! Active-stream arbiter
//!
//! Elects at most one producer whose frames are relayed. The arbiter's
//! `active` id and the directory's `streaming` flags are only changed
//! together, so exactly one device is streaming iff `active` names it.
//!
//! Selection is explicit only: nothing here picks a replacement when the
//! active device goes away.

use super::connection::ConnectionRegistry;
use super::directory::DeviceDirectory;
use super::error::RegistryError;
use crate::protocol::DeviceId;

/// Holder of the active-stream reference
#[derive(Debug, Default)]
pub struct ActiveStreamArbiter {
    active: Option<DeviceId>,
}

impl ActiveStreamArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently elected device, if any
    pub fn active(&self) -> Option<DeviceId> {
        self.active
    }

    pub fn is_active(&self, id: DeviceId) -> bool {
        self.active == Some(id)
    }

    /// Make `id` the active stream
    ///
    /// The device must be in the directory and its connection live.
    /// Returns the device that was displaced, if a different one was active.
    pub fn activate(
        &mut self,
        directory: &mut DeviceDirectory,
        connections: &ConnectionRegistry,
        id: DeviceId,
    ) -> Result<Option<DeviceId>, RegistryError> {
        if !directory.contains(id) || !connections.is_live(id) {
            return Err(RegistryError::NotFound(id));
        }

        let displaced = match self.active {
            Some(previous) if previous != id => {
                directory.set_streaming(previous, false);
                Some(previous)
            }
            _ => None,
        };

        directory.set_streaming(id, true);
        self.active = Some(id);

        tracing::info!(
            device_id = %id,
            displaced = ?displaced,
            "Active stream elected"
        );

        Ok(displaced)
    }

    /// Release `id` if it is the active stream
    ///
    /// Returns true if the active stream was cleared.
    pub fn deactivate(&mut self, directory: &mut DeviceDirectory, id: DeviceId) -> bool {
        if self.active != Some(id) {
            return false;
        }

        self.active = None;
        directory.set_streaming(id, false);

        tracing::info!(device_id = %id, "Active stream released");
        true
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::registry::{DeviceMetadata, Outbound, Role};

    struct Fixture {
        directory: DeviceDirectory,
        connections: ConnectionRegistry,
        arbiter: ActiveStreamArbiter,
        receivers: Vec<mpsc::Receiver<Outbound>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                directory: DeviceDirectory::new(),
                connections: ConnectionRegistry::new(),
                arbiter: ActiveStreamArbiter::new(),
                receivers: Vec::new(),
            }
        }

        fn add_device(&mut self, name: &str) -> DeviceId {
            let id = DeviceId::new();
            let (tx, rx) = mpsc::channel(4);
            self.receivers.push(rx);
            self.connections.attach(id, tx);
            self.connections.register(id, Role::Producer);
            self.directory.register_device(id, DeviceMetadata::new(name));
            id
        }

        fn activate(&mut self, id: DeviceId) -> Result<Option<DeviceId>, RegistryError> {
            self.arbiter
                .activate(&mut self.directory, &self.connections, id)
        }

        fn streaming(&self) -> Vec<DeviceId> {
            self.directory.streaming_devices().collect()
        }
    }

    #[test]
    fn test_activate_sets_single_streaming_device() {
        let mut fx = Fixture::new();
        let p1 = fx.add_device("P1");

        assert_eq!(fx.activate(p1), Ok(None));
        assert_eq!(fx.arbiter.active(), Some(p1));
        assert_eq!(fx.streaming(), vec![p1]);

        // Re-activating the same device displaces nothing
        assert_eq!(fx.activate(p1), Ok(None));
        assert_eq!(fx.streaming(), vec![p1]);
    }

    #[test]
    fn test_switch_clears_previous() {
        let mut fx = Fixture::new();
        let p1 = fx.add_device("P1");
        let p2 = fx.add_device("P2");

        fx.activate(p1).unwrap();
        assert_eq!(fx.activate(p2), Ok(Some(p1)));

        assert!(fx.arbiter.is_active(p2));
        assert!(!fx.directory.get(p1).unwrap().streaming);
        assert_eq!(fx.streaming(), vec![p2]);
    }

    #[test]
    fn test_activate_unknown_is_not_found() {
        let mut fx = Fixture::new();
        let p1 = fx.add_device("P1");
        fx.activate(p1).unwrap();

        let ghost = DeviceId::new();
        assert_eq!(fx.activate(ghost), Err(RegistryError::NotFound(ghost)));

        // No state change
        assert_eq!(fx.arbiter.active(), Some(p1));
        assert_eq!(fx.streaming(), vec![p1]);
    }

    #[test]
    fn test_activate_dead_connection_is_not_found() {
        let mut fx = Fixture::new();
        let p1 = fx.add_device("P1");
        fx.receivers.clear();

        assert_eq!(fx.activate(p1), Err(RegistryError::NotFound(p1)));
        assert_eq!(fx.arbiter.active(), None);
    }

    #[test]
    fn test_deactivate_only_clears_matching_device() {
        let mut fx = Fixture::new();
        let p1 = fx.add_device("P1");
        let p2 = fx.add_device("P2");
        fx.activate(p1).unwrap();

        assert!(!fx.arbiter.deactivate(&mut fx.directory, p2));
        assert_eq!(fx.arbiter.active(), Some(p1));

        assert!(fx.arbiter.deactivate(&mut fx.directory, p1));
        assert_eq!(fx.arbiter.active(), None);
        assert!(fx.streaming().is_empty());
    }
}
