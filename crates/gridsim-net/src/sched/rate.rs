//! Rate-controlled discipline: one sub-queue per class, each drained
//! at its configured rate into a final output queue. The discipline is
//! non-work-conserving: if a class has exhausted its budget the port
//! idles even though packets may be waiting elsewhere in time.

use super::{DrainAction, EnqueueAction, PacketScheduler};
use gridsim_types::{
    errors::ConfigError,
    id::{EntityId, ServiceClass},
    packet::Packet,
    time::transmission_delay,
};
use std::collections::VecDeque;

pub struct RateScheduler {
    name: String,
    router: EntityId,
    baud_bps: f64,
    /// Configured as a share of the link rate; `None` when the rates
    /// were given as absolute bit rates.
    percentages: Option<Vec<f64>>,
    /// Per-class service rate in bits per second.
    rates: Vec<f64>,
    sub_queues: Vec<VecDeque<Packet>>,
    output: VecDeque<Packet>,
}

impl RateScheduler {
    /// Builds from absolute per-class bit rates.
    pub fn with_rates(
        name: impl Into<String>,
        router: EntityId,
        rates: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        for &r in &rates {
            if r <= 0.0 {
                return Err(ConfigError::NonPositiveRate(r));
            }
        }
        let classes = rates.len();
        Ok(Self {
            name: name.into(),
            router,
            baud_bps: 0.0,
            percentages: None,
            rates,
            sub_queues: (0..classes).map(|_| VecDeque::new()).collect(),
            output: VecDeque::new(),
        })
    }

    /// Builds from percentages of the link rate; the absolute rates are
    /// derived when the link baud is bound. The vector must sum to at
    /// most 100.
    pub fn with_percentages(
        name: impl Into<String>,
        router: EntityId,
        percentages: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        for &p in &percentages {
            if p <= 0.0 {
                return Err(ConfigError::NonPositiveRate(p));
            }
        }
        let total: f64 = percentages.iter().sum();
        if total > 100.0 {
            return Err(ConfigError::RateBudgetExceeded(total));
        }
        let classes = percentages.len();
        Ok(Self {
            name: name.into(),
            router,
            baud_bps: 0.0,
            percentages: Some(percentages),
            rates: vec![0.0; classes],
            sub_queues: (0..classes).map(|_| VecDeque::new()).collect(),
            output: VecDeque::new(),
        })
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    pub(super) fn output_head_size(&self) -> Option<u64> {
        self.output.front().map(|p| p.size_bytes())
    }

    fn class_of(&self, pkt: &Packet) -> ServiceClass {
        let class = pkt.header().class;
        if class >= self.sub_queues.len() {
            tracing::warn!(
                sched = %self.name,
                class,
                classes = self.sub_queues.len(),
                "service class out of range, clamping to 0"
            );
            0
        } else {
            class
        }
    }

    /// Accepts a packet into its class sub-queue; if that sub-queue was
    /// idle, the router must arm its drain timer.
    pub fn enqueue_classed(&mut self, pkt: Packet) -> EnqueueAction {
        let class = self.class_of(&pkt);
        let size = pkt.size_bytes();
        let was_empty = self.sub_queues[class].is_empty();
        self.sub_queues[class].push_back(pkt);
        if was_empty {
            EnqueueAction::StartClass {
                class,
                delay: transmission_delay(size, self.rates[class]),
            }
        } else {
            EnqueueAction::Backlogged
        }
    }

    /// Moves the head of sub-queue `class` into the output queue.
    pub fn drain_class(&mut self, class: ServiceClass) -> DrainAction {
        let Some(pkt) = self.sub_queues.get_mut(class).and_then(|q| q.pop_front()) else {
            tracing::warn!(sched = %self.name, class, "drain on an empty sub-queue");
            return DrainAction::default();
        };
        let output_was_empty = self.output.is_empty();
        let emitted = pkt.size_bytes();
        self.output.push_back(pkt);

        DrainAction {
            start_emit: output_was_empty
                .then(|| transmission_delay(emitted, self.baud_bps)),
            next_drain: self.sub_queues[class]
                .front()
                .map(|p| transmission_delay(p.size_bytes(), self.rates[class])),
        }
    }

    fn recompute_rates(&mut self) {
        if let Some(pct) = &self.percentages {
            self.rates = pct.iter().map(|p| p / 100.0 * self.baud_bps).collect();
        }
    }
}

impl PacketScheduler for RateScheduler {
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
        self.recompute_rates();
        Ok(())
    }

    fn enqueue(&mut self, pkt: Packet) -> bool {
        self.enqueue_classed(pkt);
        true
    }

    fn dequeue(&mut self) -> Option<Packet> {
        self.output.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.output.is_empty() && self.sub_queues.iter().all(|q| q.is_empty())
    }

    fn len(&self) -> usize {
        self.output.len() + self.sub_queues.iter().map(|q| q.len()).sum::<usize>()
    }
}
