//! # gridsim-net::sched
//!
//! Per-egress-port packet schedulers. All disciplines expose the same
//! capability set through [`PacketScheduler`]; the concrete kinds live
//! behind [`SchedulerKind`] so a router can own any of them by value.
//!
//! The disciplines are passive: the hosting router turns the actions
//! they return into self-events (`SCHEDULER_DEQUE` for service
//! completion, `RATE_DRAIN` for the rate-controlled sub-queue timers).

mod fifo;
mod rate;
mod scfq;

pub use fifo::FifoScheduler;
pub use rate::RateScheduler;
pub use scfq::ScfqScheduler;

use gridsim_types::{
    errors::ConfigError,
    id::{EntityId, ServiceClass},
    packet::Packet,
    time::{transmission_delay, SimTime},
};

/// Capability set common to every discipline.
pub trait PacketScheduler {
    fn name(&self) -> &str;
    fn router_id(&self) -> EntityId;
    fn baud_rate(&self) -> f64;
    /// Binds the scheduler to its link's rate. Rejects non-positive.
    fn set_baud_rate(&mut self, bps: f64) -> Result<(), ConfigError>;
    /// Accepts a packet. Returns false only if the discipline drops it.
    fn enqueue(&mut self, pkt: Packet) -> bool;
    /// Releases the next packet chosen by the discipline.
    fn dequeue(&mut self) -> Option<Packet>;
    fn is_empty(&self) -> bool;
    fn len(&self) -> usize;
}

/// What the hosting router must do after an enqueue.
#[derive(Debug, Clone, Copy)]
pub enum EnqueueAction {
    /// The port was idle: schedule a `SCHEDULER_DEQUE` after `delay`.
    StartService { delay: SimTime },
    /// A rate-controlled sub-queue was idle: schedule a `RATE_DRAIN`
    /// for `class` after `delay`.
    StartClass { class: ServiceClass, delay: SimTime },
    /// Work is already in progress; nothing to schedule.
    Backlogged,
}

/// What the hosting router must do after a rate sub-queue drain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainAction {
    /// The output queue went non-empty: schedule a `SCHEDULER_DEQUE`.
    pub start_emit: Option<SimTime>,
    /// The sub-queue still holds packets: schedule the next drain.
    pub next_drain: Option<SimTime>,
}

/// The tagged union of the concrete disciplines.
pub enum SchedulerKind {
    Fifo(FifoScheduler),
    Scfq(ScfqScheduler),
    Rate(RateScheduler),
}

impl SchedulerKind {
    fn inner(&self) -> &dyn PacketScheduler {
        match self {
            SchedulerKind::Fifo(s) => s,
            SchedulerKind::Scfq(s) => s,
            SchedulerKind::Rate(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn PacketScheduler {
        match self {
            SchedulerKind::Fifo(s) => s,
            SchedulerKind::Scfq(s) => s,
            SchedulerKind::Rate(s) => s,
        }
    }

    pub fn name(&self) -> &str {
        self.inner().name()
    }

    pub fn router_id(&self) -> EntityId {
        self.inner().router_id()
    }

    pub fn baud_rate(&self) -> f64 {
        self.inner().baud_rate()
    }

    pub fn set_baud_rate(&mut self, bps: f64) -> Result<(), ConfigError> {
        self.inner_mut().set_baud_rate(bps)
    }

    pub fn dequeue(&mut self) -> Option<Packet> {
        self.inner_mut().dequeue()
    }

    pub fn is_empty(&self) -> bool {
        self.inner().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner().len()
    }

    /// Enqueues a packet and reports the timer the router must arm.
    pub fn enqueue_action(&mut self, pkt: Packet) -> EnqueueAction {
        match self {
            SchedulerKind::Fifo(_) | SchedulerKind::Scfq(_) => {
                let was_empty = self.is_empty();
                let size = pkt.size_bytes();
                self.inner_mut().enqueue(pkt);
                if was_empty {
                    EnqueueAction::StartService {
                        delay: transmission_delay(size, self.baud_rate()),
                    }
                } else {
                    EnqueueAction::Backlogged
                }
            }
            SchedulerKind::Rate(s) => s.enqueue_classed(pkt),
        }
    }

    /// Moves the head of a rate sub-queue into the output queue.
    /// Work-conserving disciplines have no sub-queues; the call is a
    /// logged no-op for them.
    pub fn drain_class(&mut self, class: ServiceClass) -> DrainAction {
        match self {
            SchedulerKind::Rate(s) => s.drain_class(class),
            _ => {
                tracing::warn!(sched = %self.name(), "drain on a work-conserving scheduler");
                DrainAction::default()
            }
        }
    }

    /// Transmission time of the next packet the port will emit, if any.
    pub fn next_emit_delay(&self) -> Option<SimTime> {
        let size = match self {
            SchedulerKind::Fifo(s) => s.head_size(),
            SchedulerKind::Scfq(s) => s.head_size(),
            SchedulerKind::Rate(s) => s.output_head_size(),
        }?;
        Some(transmission_delay(size, self.baud_rate()))
    }

    /// End-of-simulation hook; reports anything still queued.
    pub fn shutdown(&self) {
        if !self.is_empty() {
            tracing::debug!(
                sched = %self.name(),
                queued = self.len(),
                "scheduler shutting down with queued packets"
            );
        }
    }
}
