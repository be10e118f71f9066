//! # gridsim-engine::ids
//!
//! Monotonic id counters owned by the kernel. Every id space the
//! simulation hands out (events, enqueue sequences, packets, flows,
//! reservations) is drawn from here, which keeps runs deterministic
//! for a given event stream.

use gridsim_types::id::{EventId, FlowId, PacketId, ReservationId};

pub struct IdGen {
    event_id: EventId,
    insertion_seq: u64,
    packet_id: PacketId,
    flow_id: FlowId,
    reservation_id: ReservationId,
}

impl IdGen {
    pub fn new() -> Self {
        Self {
            event_id: 0,
            insertion_seq: 0,
            packet_id: 0,
            flow_id: 0,
            reservation_id: 0,
        }
    }

    pub fn next_event_id(&mut self) -> EventId {
        let id = self.event_id;
        self.event_id += 1;
        id
    }

    pub fn next_insertion_seq(&mut self) -> u64 {
        let id = self.insertion_seq;
        self.insertion_seq += 1;
        id
    }

    pub fn next_packet_id(&mut self) -> PacketId {
        let id = self.packet_id;
        self.packet_id += 1;
        id
    }

    pub fn next_flow_id(&mut self) -> FlowId {
        let id = self.flow_id;
        self.flow_id += 1;
        id
    }

    pub fn next_reservation_id(&mut self) -> ReservationId {
        let id = self.reservation_id;
        self.reservation_id += 1;
        id
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}
