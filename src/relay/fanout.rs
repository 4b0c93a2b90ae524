//! Audio relay and membership notification
//!
//! Both fan out to every announced observer. Deliveries use the
//! non-blocking queue send, so a dead or lagging observer is skipped
//! without affecting the others or stalling the caller.
//!
//! Frames are `Bytes`: each observer's copy shares the sender's allocation.

use bytes::Bytes;

use super::coordinator::Coordinator;
use crate::protocol::{ConnectionId, ServerMessage};
use crate::registry::{Outbound, Role};

impl Coordinator {
    /// Relay a frame if its sender is the active stream
    ///
    /// Frames from any other connection are dropped silently. The payload is
    /// never inspected. Returns the number of observers the frame was queued
    /// for.
    pub fn relay_frame(&mut self, sender: ConnectionId, frame: Bytes) -> usize {
        self.stats.frames_received += 1;

        if !self.arbiter.is_active(sender) {
            self.stats.frames_dropped += 1;
            tracing::trace!(connection_id = %sender, len = frame.len(), "Frame dropped: sender not active");
            return 0;
        }

        let (delivered, skipped) = self.fan_out(|| Outbound::Frame(frame.clone()));

        self.stats.frames_relayed += delivered as u64;
        self.stats.deliveries_skipped += skipped as u64;

        tracing::trace!(
            device_id = %sender,
            len = frame.len(),
            observers = delivered,
            skipped = skipped,
            "Frame relayed"
        );

        delivered
    }

    /// Send the current directory snapshot to every live observer
    ///
    /// Returns the number of observers it was queued for.
    pub fn broadcast_snapshot(&mut self) -> usize {
        let message = ServerMessage::DeviceListUpdated {
            devices: self.directory.snapshot().into_devices(),
        };

        let (delivered, skipped) = self.fan_out(|| Outbound::Message(message.clone()));
        self.stats.deliveries_skipped += skipped as u64;

        tracing::debug!(
            devices = self.directory.len(),
            observers = delivered,
            skipped = skipped,
            "Directory snapshot broadcast"
        );

        delivered
    }

    /// Send the current directory snapshot to one connection
    pub fn send_snapshot_to(&mut self, id: ConnectionId) {
        let devices = self.directory.snapshot().into_devices();
        self.reply(id, ServerMessage::DeviceListUpdated { devices });
    }

    /// Queue one item per live observer; returns (delivered, skipped)
    fn fan_out(&self, mut item: impl FnMut() -> Outbound) -> (usize, usize) {
        let mut delivered = 0;
        let mut skipped = 0;

        for observer in self.connections.list_by_role(Role::Observer) {
            if !self.connections.is_live(observer.id) {
                skipped += 1;
                continue;
            }

            match self.connections.send(observer.id, item()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(connection_id = %observer.id, error = %e, "Delivery skipped");
                }
            }
        }

        (delivered, skipped)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::relay::coordinator::tests::{device_list, Peer};
    use crate::relay::Coordinator;

    fn pcm_frame(seed: u8) -> Bytes {
        // 16-bit little-endian mono samples
        Bytes::from(vec![seed, 0x00, seed.wrapping_add(1), 0xFF])
    }

    #[test]
    fn test_inactive_producer_frames_are_dropped() {
        let mut coordinator = Coordinator::default();
        let p1 = Peer::producer(&mut coordinator, "P1");
        let mut o1 = Peer::observer(&mut coordinator);
        o1.drain();

        assert_eq!(coordinator.relay_frame(p1.id, pcm_frame(1)), 0);

        assert!(o1.drain().is_empty());
        let stats = coordinator.status().stats;
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.frames_relayed, 0);
    }

    #[test]
    fn test_active_producer_frames_reach_every_observer_verbatim() {
        let mut coordinator = Coordinator::default();
        let p1 = Peer::producer(&mut coordinator, "P1");
        let mut o1 = Peer::observer(&mut coordinator);
        let mut o2 = Peer::observer(&mut coordinator);
        coordinator.start_listening(o1.id, &p1.id.to_string());
        o1.drain();
        o2.drain();

        let frame = pcm_frame(7);
        assert_eq!(coordinator.relay_frame(p1.id, frame.clone()), 2);

        assert_eq!(o1.frames(), vec![frame.clone()]);
        assert_eq!(o2.frames(), vec![frame]);
        assert_eq!(coordinator.status().stats.frames_relayed, 2);
    }

    #[test]
    fn test_frames_are_not_sent_to_producers() {
        let mut coordinator = Coordinator::default();
        let p1 = Peer::producer(&mut coordinator, "P1");
        let mut p2 = Peer::producer(&mut coordinator, "P2");
        let o1 = Peer::observer(&mut coordinator);
        coordinator.start_listening(o1.id, &p1.id.to_string());
        p2.drain();

        coordinator.relay_frame(p1.id, pcm_frame(3));
        assert!(p2.frames().is_empty());
    }

    #[test]
    fn test_switch_redirects_relay() {
        let mut coordinator = Coordinator::default();
        let p1 = Peer::producer(&mut coordinator, "P1");
        let p2 = Peer::producer(&mut coordinator, "P2");
        let mut o1 = Peer::observer(&mut coordinator);
        let mut o2 = Peer::observer(&mut coordinator);

        coordinator.start_listening(o1.id, &p1.id.to_string());
        coordinator.start_listening(o1.id, &p2.id.to_string());
        o1.drain();
        o2.drain();

        assert_eq!(coordinator.relay_frame(p1.id, pcm_frame(1)), 0);
        assert_eq!(coordinator.relay_frame(p2.id, pcm_frame(2)), 2);

        assert_eq!(o1.frames(), vec![pcm_frame(2)]);
        assert_eq!(o2.frames(), vec![pcm_frame(2)]);
    }

    #[test]
    fn test_dead_observer_is_skipped() {
        let mut coordinator = Coordinator::default();
        let p1 = Peer::producer(&mut coordinator, "P1");
        let mut o1 = Peer::observer(&mut coordinator);
        let o2 = Peer::observer(&mut coordinator);
        coordinator.start_listening(o1.id, &p1.id.to_string());
        o1.drain();

        drop(o2.rx);

        assert_eq!(coordinator.relay_frame(p1.id, pcm_frame(9)), 1);
        assert_eq!(o1.frames(), vec![pcm_frame(9)]);
        assert_eq!(coordinator.status().stats.deliveries_skipped, 1);

        // Snapshot broadcasts skip it too
        assert_eq!(coordinator.broadcast_snapshot(), 1);
    }

    #[test]
    fn test_lagging_observer_loses_frames_only() {
        let mut coordinator = Coordinator::default();
        let p1 = Peer::producer(&mut coordinator, "P1");
        let mut fast = Peer::observer(&mut coordinator);
        let mut slow = Peer::connect_with_capacity(&mut coordinator, 2);
        coordinator.announce_observer(slow.id);
        coordinator.start_listening(fast.id, &p1.id.to_string());
        fast.drain();
        slow.drain();

        for i in 0..4 {
            coordinator.relay_frame(p1.id, pcm_frame(i));
        }

        assert_eq!(fast.frames().len(), 4);
        assert_eq!(slow.frames(), vec![pcm_frame(0), pcm_frame(1)]);
    }

    #[test]
    fn test_snapshot_broadcast_reflects_directory() {
        let mut coordinator = Coordinator::default();
        let p1 = Peer::producer(&mut coordinator, "P1");
        let p2 = Peer::producer(&mut coordinator, "P2");
        let mut o1 = Peer::observer(&mut coordinator);
        coordinator.start_listening(o1.id, &p2.id.to_string());
        o1.drain();

        assert_eq!(coordinator.broadcast_snapshot(), 1);

        let messages = o1.messages();
        assert_eq!(
            device_list(&messages[0]),
            Some(vec![(p1.id, false), (p2.id, true)])
        );
    }
}
