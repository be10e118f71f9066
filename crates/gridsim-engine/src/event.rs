//! # gridsim-engine::event
//!
//! The `Event` record and the `Queued` wrapper that makes the
//! `BinaryHeap` future queue a min-heap ordered by
//! `(delivery_time, enqueue_sequence)`, so same-instant events are
//! delivered in FIFO order.

use gridsim_types::{
    id::{EntityId, EventId},
    payload::Payload,
    tags::Tag,
    time::SimTime,
};
use std::cmp::Ordering;

/// A timestamped message between two entities. Immutable once queued.
#[derive(Debug)]
pub struct Event {
    pub id: EventId,
    pub src: EntityId,
    pub dst: EntityId,
    pub time: SimTime,
    pub tag: Tag,
    pub payload: Payload,
}

/// Heap entry: an event plus its enqueue sequence number.
#[derive(Debug)]
pub struct Queued {
    pub seq: u64,
    pub event: Event,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.event.time == other.event.time && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    /// `BinaryHeap` is a max-heap, so the ordering is reversed: the
    /// earliest time (and, within an instant, the earliest sequence)
    /// compares greatest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .event
            .time
            .total_cmp(&self.event.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_types::payload::Payload;
    use std::collections::BinaryHeap;

    fn ev(id: EventId, time: SimTime) -> Event {
        Event {
            id,
            src: 0,
            dst: 0,
            time,
            tag: Tag::Insignificant,
            payload: Payload::Empty,
        }
    }

    #[test]
    fn heap_pops_earliest_time_then_fifo() {
        let mut heap = BinaryHeap::new();
        heap.push(Queued { seq: 0, event: ev(0, 2.0) });
        heap.push(Queued { seq: 1, event: ev(1, 1.0) });
        heap.push(Queued { seq: 2, event: ev(2, 1.0) });

        assert_eq!(heap.pop().unwrap().event.id, 1);
        assert_eq!(heap.pop().unwrap().event.id, 2);
        assert_eq!(heap.pop().unwrap().event.id, 0);
    }
}
