//! Shared driver entities for the end-to-end scenarios: a probe
//! sender, an envelope sender, and a sink that records deliveries.

// Each test binary compiles this module separately and uses a subset.
#![allow(dead_code)]

use gridsim_engine::{entity::Entity, event::Event, sim::Ctx};
use gridsim_types::{
    errors::SimError,
    packet::{DataEnvelope, Packet, PacketHeader, ProbePacket},
    payload::Payload,
    tags::Tag,
    time::SimTime,
};
use std::cell::RefCell;
use std::rc::Rc;

/// (arrival time, tag, byte size) per delivered item.
pub type Deliveries = Rc<RefCell<Vec<(SimTime, Tag, u64)>>>;

/// (round-trip time, hops, bottleneck bps) per returned probe.
pub type ProbeResults = Rc<RefCell<Vec<(SimTime, usize, f64)>>>;

/// Records every envelope handed up by its Input port.
pub struct Sink {
    pub log: Deliveries,
}

impl Entity for Sink {
    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        if ev.tag == Tag::EndOfSimulation {
            ctx.finish();
            return Ok(());
        }
        if let Payload::Envelope(env) = ev.payload {
            self.log.borrow_mut().push((ctx.now(), ev.tag, env.byte_size));
        }
        Ok(())
    }
}

/// Sends one probe to a named host after a settling delay and records
/// the round trip.
pub struct Prober {
    pub target: String,
    pub size: u64,
    pub send_at: SimTime,
    pub results: ProbeResults,
    sent_at: SimTime,
}

impl Prober {
    pub fn new(target: &str, size: u64, send_at: SimTime, results: ProbeResults) -> Self {
        Self {
            target: target.to_string(),
            size,
            send_at,
            results,
            sent_at: 0.0,
        }
    }
}

impl Entity for Prober {
    fn on_start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
        ctx.pause(self.send_at)
    }

    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        match (ev.tag, ev.payload) {
            (Tag::Insignificant, _) => {
                let dst = ctx
                    .lookup(&self.target)
                    .ok_or_else(|| SimError::UnknownName(self.target.clone()))?;
                let probe = ProbePacket::new(PacketHeader {
                    id: ctx.next_packet_id(),
                    src: ctx.me(),
                    dst,
                    last_hop: ctx.me(),
                    size_bytes: self.size,
                    class: 0,
                    tag: Tag::InfopktSubmit,
                });
                self.sent_at = ctx.now();
                ctx.send_to_port(
                    "output",
                    0.0,
                    Tag::SendPacket,
                    Payload::Packet(Box::new(Packet::Probe(probe))),
                )?;
                Ok(())
            }
            (Tag::InfopktReturn, Payload::Packet(pkt)) => {
                if let Packet::Probe(pp) = *pkt {
                    self.results.borrow_mut().push((
                        ctx.now() - self.sent_at,
                        pp.hops(),
                        pp.bottleneck_bps,
                    ));
                }
                Ok(())
            }
            (Tag::EndOfSimulation, _) => {
                ctx.finish();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// One outbound item: (send time, byte size, destination host name).
pub type ScheduledSend = (SimTime, u64, String);

/// Sends a list of envelopes at their scheduled times.
pub struct Sender {
    sends: Vec<ScheduledSend>,
}

impl Sender {
    pub fn new(sends: Vec<ScheduledSend>) -> Self {
        Self { sends }
    }
}

impl Entity for Sender {
    fn on_start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
        for (idx, (at, _, _)) in self.sends.iter().enumerate() {
            ctx.schedule_self(*at, Tag::ScheduleNow, Payload::Object(idx as u64))?;
        }
        Ok(())
    }

    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        match (ev.tag, ev.payload) {
            (Tag::ScheduleNow, Payload::Object(idx)) => {
                let (_, bytes, ref dst_name) = self.sends[idx as usize];
                let dst = ctx
                    .lookup(dst_name)
                    .ok_or_else(|| SimError::UnknownName(dst_name.clone()))?;
                let env = DataEnvelope {
                    data: bytes::Bytes::new(),
                    byte_size: bytes,
                    dst,
                    class: 0,
                    tag: Tag::SendPacket,
                    direct_baud: None,
                };
                ctx.send_to_port("output", 0.0, Tag::SendPacket, Payload::Envelope(env))?;
                Ok(())
            }
            (Tag::EndOfSimulation, _) => {
                ctx.finish();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
