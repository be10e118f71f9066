//! # gridsim-net::link
//!
//! Point-to-point links. A link connects exactly two sides, each
//! described by an input and an output endpoint id (routers, which
//! have no ports, use their own id for both). The wire holds a queue
//! of items and a single in-flight self-event modelling propagation;
//! on wake-up the head item is forwarded to the side opposite its
//! sender. Links never re-fragment; MTU compliance is the upstream
//! router's job.

use gridsim_engine::{
    entity::Entity,
    event::Event,
    sim::Ctx,
};
use gridsim_types::{
    errors::{ConfigError, SimError},
    id::EntityId,
    payload::Payload,
    tags::Tag,
    time::SimTime,
};
use std::collections::VecDeque;

/// Resolved link description handed around during wiring.
#[derive(Debug, Clone)]
pub struct LinkRef {
    pub id: EntityId,
    pub name: String,
    pub baud_bps: f64,
    /// Propagation delay in seconds.
    pub prop_delay: SimTime,
    pub mtu: u64,
}

impl LinkRef {
    /// Validates the link invariants: positive baud, delay, and MTU.
    pub fn new(
        id: EntityId,
        name: String,
        baud_bps: f64,
        prop_delay_ms: f64,
        mtu: u64,
    ) -> Result<Self, ConfigError> {
        if baud_bps <= 0.0 {
            return Err(ConfigError::NonPositiveBaud(baud_bps));
        }
        if prop_delay_ms <= 0.0 {
            return Err(ConfigError::NonPositiveDelay(prop_delay_ms));
        }
        if mtu == 0 {
            return Err(ConfigError::ZeroMtu);
        }
        Ok(Self {
            id,
            name,
            baud_bps,
            prop_delay: prop_delay_ms / 1_000.0,
            mtu,
        })
    }
}

/// The four endpoint ids of a link.
#[derive(Debug, Clone, Copy)]
pub struct LinkEnds {
    pub end1_input: EntityId,
    pub end1_output: EntityId,
    pub end2_input: EntityId,
    pub end2_output: EntityId,
}

impl LinkEnds {
    /// A side whose input and output differ is a full entity with
    /// ports; event tags are rewritten to `PKT_FORWARD` toward it.
    fn side2_has_ports(&self) -> bool {
        self.end2_input != self.end2_output
    }

    fn side1_has_ports(&self) -> bool {
        self.end1_input != self.end1_output
    }
}

/// One queued item on the wire.
struct InFlight {
    src: EntityId,
    tag: Tag,
    payload: Payload,
}

/// Shared wire mechanics of `SimpleLink` and `FlowLink`: queueing,
/// the single propagation self-event, and direction resolution.
pub(crate) struct Wire {
    pub ends: LinkEnds,
    pub prop_delay: SimTime,
    queue: VecDeque<InFlight>,
    in_flight: bool,
}

impl Wire {
    pub fn new(ends: LinkEnds, prop_delay: SimTime) -> Self {
        Self {
            ends,
            prop_delay,
            queue: VecDeque::new(),
            in_flight: false,
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Accepts an item from one side and arms the propagation event if
    /// the wire was idle.
    pub fn accept(
        &mut self,
        ctx: &mut Ctx<'_>,
        src: EntityId,
        tag: Tag,
        payload: Payload,
    ) -> Result<(), SimError> {
        self.queue.push_back(InFlight { src, tag, payload });
        if !self.in_flight {
            self.in_flight = true;
            ctx.schedule_self(self.prop_delay, Tag::LinkWakeup, Payload::Empty)?;
        }
        Ok(())
    }

    /// Forwards the head item to the opposite side. Returns the
    /// destination, delivery tag, and payload; the caller delivers.
    pub fn wake(&mut self, ctx: &mut Ctx<'_>) -> Result<Option<(EntityId, Tag, Payload)>, SimError> {
        let Some(item) = self.queue.pop_front() else {
            self.in_flight = false;
            return Ok(None);
        };
        if !self.queue.is_empty() {
            ctx.schedule_self(self.prop_delay, Tag::LinkWakeup, Payload::Empty)?;
        } else {
            self.in_flight = false;
        }

        let from_side1 =
            item.src == self.ends.end1_output || item.src == self.ends.end1_input;
        let (dst, dst_has_ports) = if from_side1 {
            (self.ends.end2_input, self.ends.side2_has_ports())
        } else {
            (self.ends.end1_input, self.ends.side1_has_ports())
        };

        let tag = if item.tag == Tag::JunkPkt || !dst_has_ports {
            item.tag
        } else {
            Tag::PktForward
        };
        Ok(Some((dst, tag, item.payload)))
    }
}

/// A bidirectional wire with propagation delay and an MTU bound.
pub struct SimpleLink {
    me: EntityId,
    name: String,
    wire: Wire,
}

impl SimpleLink {
    pub fn new(link: &LinkRef, ends: LinkEnds) -> Self {
        Self {
            me: link.id,
            name: link.name.clone(),
            wire: Wire::new(ends, link.prop_delay),
        }
    }
}

impl Entity for SimpleLink {
    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        match ev.tag {
            Tag::LinkWakeup => {
                if let Some((dst, tag, payload)) = self.wire.wake(ctx)? {
                    ctx.schedule(dst, 0.0, tag, payload)?;
                }
                Ok(())
            }
            Tag::EndOfSimulation => {
                if self.wire.queued() > 0 {
                    tracing::debug!(
                        link = %self.name,
                        queued = self.wire.queued(),
                        "link shutting down with items in flight"
                    );
                }
                ctx.finish();
                Ok(())
            }
            _ => self.wire.accept(ctx, ev.src, ev.tag, ev.payload),
        }
    }
}

impl SimpleLink {
    pub fn id(&self) -> EntityId {
        self.me
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
