//! First-in-first-out discipline: tail-enqueue, head-dequeue, no
//! drops, unbounded queue.

use super::PacketScheduler;
use gridsim_types::{errors::ConfigError, id::EntityId, packet::Packet};
use std::collections::VecDeque;

pub struct FifoScheduler {
    name: String,
    router: EntityId,
    baud_bps: f64,
    queue: VecDeque<Packet>,
}

impl FifoScheduler {
    pub fn new(name: impl Into<String>, router: EntityId) -> Self {
        Self {
            name: name.into(),
            router,
            baud_bps: 0.0,
            queue: VecDeque::new(),
        }
    }

    pub(super) fn head_size(&self) -> Option<u64> {
        self.queue.front().map(|p| p.size_bytes())
    }
}

impl PacketScheduler for FifoScheduler {
    fn name(&self) -> &str {
        &self.name
    }

    fn router_id(&self) -> EntityId {
        self.router
    }

    fn baud_rate(&self) -> f64 {
        self.baud_bps
    }

    fn set_baud_rate(&mut self, bps: f64) -> Result<(), ConfigError> {
        if bps <= 0.0 {
            return Err(ConfigError::NonPositiveBaud(bps));
        }
        self.baud_bps = bps;
        Ok(())
    }

    fn enqueue(&mut self, pkt: Packet) -> bool {
        self.queue.push_back(pkt);
        true
    }

    fn dequeue(&mut self) -> Option<Packet> {
        self.queue.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_types::{
        packet::{DataPacket, Packet, PacketHeader},
        tags::Tag,
    };

    fn pkt(id: u64) -> Packet {
        Packet::Data(DataPacket {
            header: PacketHeader {
                id,
                src: 0,
                dst: 1,
                last_hop: 0,
                size_bytes: 100,
                class: 0,
                tag: Tag::PktForward,
            },
            seq_no: 1,
            total_in_stream: 1,
            payload: None,
        })
    }

    #[test]
    fn serves_in_arrival_order() {
        let mut s = FifoScheduler::new("fifo", 0);
        s.set_baud_rate(1e9).unwrap();
        s.enqueue(pkt(1));
        s.enqueue(pkt(2));
        assert_eq!(s.len(), 2);
        assert_eq!(s.dequeue().unwrap().id(), 1);
        assert_eq!(s.dequeue().unwrap().id(), 2);
        assert!(s.is_empty());
    }

    #[test]
    fn rejects_non_positive_baud() {
        let mut s = FifoScheduler::new("fifo", 0);
        assert!(s.set_baud_rate(0.0).is_err());
    }
}
