//! Self-clocked fair queueing. Each packet is stamped with a virtual
//! finish number computed from its class weight and the finish number
//! of the most recently dispatched packet; the ready queue is kept
//! sorted by finish number with FIFO tie-break.

use super::PacketScheduler;
use fxhash::FxHashMap;
use gridsim_types::{
    errors::ConfigError,
    id::{EntityId, ServiceClass},
    packet::Packet,
};

struct ReadyEntry {
    finish: f64,
    seq: u64,
    pkt: Packet,
}

pub struct ScfqScheduler {
    name: String,
    router: EntityId,
    baud_bps: f64,
    weights: Vec<f64>,
    /// Finish number of the most recently dispatched packet.
    cf: f64,
    /// Per-flow virtual clocks, keyed by (src, dst, class).
    flow_finish: FxHashMap<(EntityId, EntityId, ServiceClass), f64>,
    /// Sorted by (finish, seq); insertion is a binary search.
    ready: Vec<ReadyEntry>,
    next_seq: u64,
}

impl ScfqScheduler {
    pub fn new(
        name: impl Into<String>,
        router: EntityId,
        weights: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let mut s = Self {
            name: name.into(),
            router,
            baud_bps: 0.0,
            weights: Vec::new(),
            cf: 0.0,
            flow_finish: FxHashMap::default(),
            ready: Vec::new(),
            next_seq: 0,
        };
        s.set_weights(weights)?;
        Ok(s)
    }

    /// Replaces the weight vector. All weights must be strictly
    /// positive.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<(), ConfigError> {
        for &w in &weights {
            if w <= 0.0 {
                return Err(ConfigError::NonPositiveWeight(w));
            }
        }
        self.weights = weights;
        Ok(())
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub(super) fn head_size(&self) -> Option<u64> {
        self.ready.first().map(|e| e.pkt.size_bytes())
    }

    fn class_of(&self, pkt: &Packet) -> ServiceClass {
        let class = pkt.header().class;
        if class >= self.weights.len() {
            tracing::warn!(
                sched = %self.name,
                class,
                classes = self.weights.len(),
                "service class out of range, clamping to 0"
            );
            0
        } else {
            class
        }
    }
}

impl PacketScheduler for ScfqScheduler {
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
        let class = self.class_of(&pkt);
        let weight = self.weights[class];
        let header = pkt.header();
        let key = (header.src, header.dst, class);
        let start = self
            .flow_finish
            .get(&key)
            .copied()
            .unwrap_or(0.0)
            .max(self.cf);
        let finish = start + header.size_bytes as f64 / weight;
        self.flow_finish.insert(key, finish);

        let seq = self.next_seq;
        self.next_seq += 1;
        let pos = self
            .ready
            .partition_point(|e| e.finish < finish || (e.finish == finish && e.seq < seq));
        self.ready.insert(pos, ReadyEntry { finish, seq, pkt });
        true
    }

    fn dequeue(&mut self) -> Option<Packet> {
        if self.ready.is_empty() {
            return None;
        }
        let entry = self.ready.remove(0);
        self.cf = entry.finish;
        Some(entry.pkt)
    }

    fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    fn len(&self) -> usize {
        self.ready.len()
    }
}
