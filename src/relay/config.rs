//! Relay configuration

use crate::registry::AudioFormat;

/// Tuning for the relay hub and per-connection queues
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Capacity of the hub's inbound event channel
    pub(crate) event_capacity: usize,

    /// Capacity of each connection's outbound queue
    ///
    /// When an observer falls this far behind, further deliveries to it are
    /// dropped until it catches up.
    pub(crate) outbound_capacity: usize,

    /// Format assumed for producers that do not declare one
    pub default_format: AudioFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            outbound_capacity: 256,
            default_format: AudioFormat::default(),
        }
    }
}

impl RelayConfig {
    /// Set the hub event channel capacity
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the per-connection outbound queue capacity
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Set the format assumed for producers that do not declare one
    pub fn default_format(mut self, format: AudioFormat) -> Self {
        self.default_format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.event_capacity, 1024);
        assert_eq!(config.outbound_capacity, 256);
        assert_eq!(config.default_format.sample_rate, 44_100);
        assert_eq!(config.default_format.channels, 1);
    }

    #[test]
    fn test_capacities_never_zero() {
        // tokio mpsc panics on a zero-capacity channel
        let config = RelayConfig::default().event_capacity(0).outbound_capacity(0);
        assert_eq!(config.event_capacity, 1);
        assert_eq!(config.outbound_capacity, 1);
    }
}
