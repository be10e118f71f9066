//! # gridsim-net::ports
//!
//! The per-entity I/O ports. `Output` turns application
//! `DataEnvelope`s into MTU-sized packet series (or a single analytic
//! flow packet) and paces them onto the attached link; without a link
//! it models a direct delivery. `Input` reassembles arriving series,
//! drops junk, appends hop statistics to probes, and hands finished
//! items to its parent entity.

use crate::link::LinkRef;
use gridsim_engine::{entity::Entity, event::Event, sim::Ctx};
use gridsim_types::{
    errors::{ConfigError, SimError},
    id::{EntityId, PacketId, ServiceClass},
    metrics::{MET_JUNK_DROPPED, MET_PKT_DROPPED},
    packet::{DataEnvelope, DataPacket, FlowPacket, Packet, PacketHeader, ProbePacket},
    payload::Payload,
    tags::Tag,
    time::{transmission_delay, SimTime},
};
use fxhash::FxHashMap;
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Whether an Output emits packet series or analytic flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Packet,
    Flow,
}

/// Destination choice for background traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunkPattern {
    SendAll,
    SendOneOnly,
}

/// One burst description pulled from a traffic generator.
#[derive(Debug, Clone, Copy)]
pub struct JunkBurst {
    pub inter_arrival: SimTime,
    pub size: u64,
    pub count: u64,
    pub pattern: JunkPattern,
    pub class: ServiceClass,
}

/// Source of background-traffic bursts.
pub trait TrafficGenerator {
    fn next_burst(&mut self, rng: &mut ChaCha20Rng) -> Option<JunkBurst>;
}

/// Plays back a fixed list of bursts, in order.
pub struct BurstList {
    bursts: std::vec::IntoIter<JunkBurst>,
}

impl BurstList {
    pub fn new(bursts: Vec<JunkBurst>) -> Self {
        Self {
            bursts: bursts.into_iter(),
        }
    }
}

impl TrafficGenerator for BurstList {
    fn next_burst(&mut self, _rng: &mut ChaCha20Rng) -> Option<JunkBurst> {
        self.bursts.next()
    }
}

/// Splits an envelope into `ceil(size/mtu)` packets sharing one packet
/// id. All but the last fragment are `EMPTY_PKT` with no payload and
/// size `mtu`; the last carries the envelope under its original tag.
pub fn packetise(
    env: DataEnvelope,
    mtu: u64,
    pkt_id: PacketId,
    src: EntityId,
    last_hop: EntityId,
) -> Vec<DataPacket> {
    let total = env.byte_size.div_ceil(mtu).max(1) as u32;
    let mut series = Vec::with_capacity(total as usize);
    for seq in 1..=total {
        let last = seq == total;
        let size = if last {
            env.byte_size - mtu * (total as u64 - 1)
        } else {
            mtu
        };
        series.push(DataPacket {
            header: PacketHeader {
                id: pkt_id,
                src,
                dst: env.dst,
                last_hop,
                size_bytes: size,
                class: env.class,
                tag: if last { env.tag } else { Tag::EmptyPkt },
            },
            seq_no: seq,
            total_in_stream: total,
            payload: last.then(|| env.clone()),
        });
    }
    series
}

/// The outbound port of a network-capable entity.
pub struct Output {
    me: EntityId,
    parent: EntityId,
    baud_bps: f64,
    link: Option<LinkRef>,
    mode: TransportMode,
    /// Receiver baud rates for linkless direct delivery.
    peer_bauds: FxHashMap<EntityId, f64>,
    /// Candidate destinations for background traffic.
    destinations: Vec<EntityId>,
    traffic: Option<Box<dyn TrafficGenerator>>,
    burst: Option<JunkBurst>,
    remaining_in_burst: u64,
    rng: ChaCha20Rng,
    /// Wire is busy until this instant; sends serialize behind it.
    busy_until: SimTime,
}

impl Output {
    pub fn new(
        me: EntityId,
        parent: EntityId,
        baud_bps: f64,
        link: Option<LinkRef>,
        mode: TransportMode,
    ) -> Result<Self, ConfigError> {
        if baud_bps <= 0.0 {
            return Err(ConfigError::NonPositiveBaud(baud_bps));
        }
        Ok(Self {
            me,
            parent,
            baud_bps,
            link,
            mode,
            peer_bauds: FxHashMap::default(),
            destinations: Vec::new(),
            traffic: None,
            burst: None,
            remaining_in_burst: 0,
            rng: ChaCha20Rng::seed_from_u64(0),
            busy_until: 0.0,
        })
    }

    pub fn set_peer_baud(&mut self, peer: EntityId, baud_bps: f64) {
        self.peer_bauds.insert(peer, baud_bps);
    }

    /// Destinations eligible for background traffic. The sending
    /// entity itself is forbidden.
    pub fn set_destinations(&mut self, dests: Vec<EntityId>) -> Result<(), ConfigError> {
        if dests.contains(&self.parent) {
            return Err(ConfigError::JunkToSelf);
        }
        self.destinations = dests;
        Ok(())
    }

    pub fn set_traffic(&mut self, generator: Box<dyn TrafficGenerator>, seed: u64) {
        self.traffic = Some(generator);
        self.rng = ChaCha20Rng::seed_from_u64(seed);
    }

    /// Delay until `bytes` have been serialized onto the wire, keeping
    /// back-to-back sends from overlapping.
    fn reserve_wire(&mut self, now: SimTime, bytes: u64) -> SimTime {
        let start = self.busy_until.max(now);
        let done = start + transmission_delay(bytes, self.baud_bps);
        self.busy_until = done;
        done - now
    }

    fn dispatch_envelope(&mut self, ctx: &mut Ctx<'_>, env: DataEnvelope) -> Result<(), SimError> {
        let link_info = self.link.as_ref().map(|l| (l.id, l.mtu));
        match (link_info, self.mode) {
            (Some((link_id, _)), TransportMode::Flow) => {
                let flow = FlowPacket {
                    header: PacketHeader {
                        id: ctx.next_packet_id(),
                        src: self.parent,
                        dst: env.dst,
                        last_hop: self.me,
                        size_bytes: env.byte_size,
                        class: env.class,
                        tag: env.tag,
                    },
                    flow_id: ctx.next_flow_id(),
                    remaining_bytes: env.byte_size as f64,
                    start_time: ctx.now(),
                    last_update_time: ctx.now(),
                    bottleneck_bps: f64::INFINITY,
                    bottleneck_link: None,
                    link_shares: IndexMap::new(),
                    latency: 0.0,
                    payload: Some(env),
                };
                ctx.schedule(
                    link_id,
                    0.0,
                    Tag::FlowSubmit,
                    Payload::Packet(Box::new(Packet::Flow(flow))),
                )?;
                Ok(())
            }
            (Some((link_id, mtu)), TransportMode::Packet) => {
                let series = packetise(env, mtu, ctx.next_packet_id(), self.parent, self.me);
                let now = ctx.now();
                for pkt in series {
                    let delay = self.reserve_wire(now, pkt.header.size_bytes);
                    let pkt = Packet::Data(pkt);
                    ctx.schedule(
                        link_id,
                        delay,
                        pkt.forward_tag(),
                        Payload::Packet(Box::new(pkt)),
                    )?;
                }
                Ok(())
            }
            (None, _) => self.direct_delivery(ctx, env),
        }
    }

    /// Direct delivery when no link is attached: the destination Input
    /// holds the item for `byte_size * 8 / min(sender, receiver)`.
    fn direct_delivery(&mut self, ctx: &mut Ctx<'_>, mut env: DataEnvelope) -> Result<(), SimError> {
        let receiver_baud = self
            .peer_bauds
            .get(&env.dst)
            .copied()
            .unwrap_or(self.baud_bps);
        let min_baud = self.baud_bps.min(receiver_baud);
        env.direct_baud = Some(min_baud);
        let dst_name = ctx
            .name_of(env.dst)
            .ok_or(SimError::UnknownEntity(env.dst))?;
        let input = ctx.lookup(&format!("Input_{dst_name}"));
        match input {
            Some(input) => {
                let tag = env.tag;
                ctx.schedule(input, 0.0, tag, Payload::Envelope(env))?;
            }
            None => {
                // No Input port on the receiver: model the hold here.
                let delay = transmission_delay(env.byte_size, min_baud);
                let (dst, tag) = (env.dst, env.tag);
                ctx.schedule(dst, delay, tag, Payload::Envelope(env))?;
            }
        }
        Ok(())
    }

    /// Submits a pre-built packet (probe bounce, application probes).
    fn submit_packet(&mut self, ctx: &mut Ctx<'_>, mut pkt: Packet) -> Result<(), SimError> {
        pkt.header_mut().last_hop = self.me;
        let Some(link_id) = self.link.as_ref().map(|l| l.id) else {
            tracing::warn!(output = self.me, "packet submit without an attached link");
            metrics::counter!(MET_PKT_DROPPED).increment(1);
            return Ok(());
        };
        let delay = if pkt.is_flow() {
            0.0
        } else {
            self.reserve_wire(ctx.now(), pkt.size_bytes())
        };
        ctx.schedule(
            link_id,
            delay,
            pkt.forward_tag(),
            Payload::Packet(Box::new(pkt)),
        )?;
        Ok(())
    }

    fn junk_tick(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
        let Some(burst) = self.burst else {
            return Ok(());
        };
        if self.destinations.is_empty() {
            tracing::warn!(output = self.me, "no destinations for background traffic");
            return Ok(());
        }

        let targets: Vec<EntityId> = match burst.pattern {
            JunkPattern::SendAll => self.destinations.clone(),
            JunkPattern::SendOneOnly => {
                let pick = self.rng.gen_range(0..self.destinations.len());
                vec![self.destinations[pick]]
            }
        };
        for dst in targets {
            let env = DataEnvelope {
                data: bytes::Bytes::new(),
                byte_size: burst.size,
                dst,
                class: burst.class,
                tag: Tag::JunkPkt,
                direct_baud: None,
            };
            self.dispatch_envelope(ctx, env)?;
        }

        self.remaining_in_burst = self.remaining_in_burst.saturating_sub(1);
        if self.remaining_in_burst == 0 {
            self.burst = self
                .traffic
                .as_mut()
                .and_then(|g| g.next_burst(&mut self.rng));
            self.remaining_in_burst = self.burst.map_or(0, |b| b.count);
        }
        if let Some(burst) = self.burst {
            ctx.schedule_self(burst.inter_arrival, Tag::JunkPkt, Payload::Empty)?;
        }
        Ok(())
    }
}

impl Entity for Output {
    fn on_start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
        if let Some(generator) = self.traffic.as_mut() {
            self.burst = generator.next_burst(&mut self.rng);
            self.remaining_in_burst = self.burst.map_or(0, |b| b.count);
            if let Some(burst) = self.burst {
                ctx.schedule_self(burst.inter_arrival, Tag::JunkPkt, Payload::Empty)?;
            }
        }
        Ok(())
    }

    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        match (ev.tag, ev.payload) {
            (Tag::EndOfSimulation, _) => {
                ctx.finish();
                Ok(())
            }
            (Tag::JunkPkt, Payload::Empty) => self.junk_tick(ctx),
            (_, Payload::Envelope(env)) => self.dispatch_envelope(ctx, env),
            (_, Payload::Packet(pkt)) => self.submit_packet(ctx, *pkt),
            (tag, _) => {
                tracing::warn!(output = self.me, ?tag, "unhandled event at Output");
                Ok(())
            }
        }
    }
}

/// The inbound port of a network-capable entity.
pub struct Input {
    me: EntityId,
    parent: EntityId,
    parent_name: String,
    baud_bps: f64,
    /// Fragments seen so far per (source, packet id).
    partial: FxHashMap<(EntityId, PacketId), u32>,
}

impl Input {
    pub fn new(
        me: EntityId,
        parent: EntityId,
        parent_name: impl Into<String>,
        baud_bps: f64,
    ) -> Result<Self, ConfigError> {
        if baud_bps <= 0.0 {
            return Err(ConfigError::NonPositiveBaud(baud_bps));
        }
        Ok(Self {
            me,
            parent,
            parent_name: parent_name.into(),
            baud_bps,
            partial: FxHashMap::default(),
        })
    }

    fn handle_data(&mut self, ctx: &mut Ctx<'_>, dp: DataPacket) -> Result<(), SimError> {
        let key = (dp.header.src, dp.header.id);
        match dp.header.tag {
            Tag::JunkPkt => {
                metrics::counter!(MET_JUNK_DROPPED).increment(1);
            }
            Tag::EmptyPkt if dp.payload.is_none() => {
                *self.partial.entry(key).or_insert(0) += 1;
            }
            _ => match dp.payload {
                Some(env) => {
                    self.partial.remove(&key);
                    let tag = env.tag;
                    ctx.schedule(self.parent, 0.0, tag, Payload::Envelope(env))?;
                }
                None => {
                    tracing::warn!(input = self.me, pkt = dp.header.id, "data packet without payload");
                    metrics::counter!(MET_PKT_DROPPED).increment(1);
                }
            },
        }
        Ok(())
    }

    fn handle_probe(&mut self, ctx: &mut Ctx<'_>, mut pp: ProbePacket) -> Result<(), SimError> {
        pp.record_entry(self.me, ctx.now());
        if pp.header.tag == Tag::InfopktSubmit {
            // Bounce back toward the origin through our parent's Output.
            std::mem::swap(&mut pp.header.src, &mut pp.header.dst);
            pp.header.tag = Tag::InfopktReturn;
            let output = ctx
                .lookup(&format!("Output_{}", self.parent_name))
                .ok_or_else(|| SimError::UnknownName(format!("Output_{}", self.parent_name)))?;
            ctx.schedule(
                output,
                0.0,
                Tag::SendPacket,
                Payload::Packet(Box::new(Packet::Probe(pp))),
            )?;
        } else {
            ctx.schedule(
                self.parent,
                0.0,
                Tag::InfopktReturn,
                Payload::Packet(Box::new(Packet::Probe(pp))),
            )?;
        }
        Ok(())
    }

    /// Direct (non-network) item: hold for the transmission delay, then
    /// deliver to the parent.
    fn handle_direct(&mut self, ctx: &mut Ctx<'_>, ev_src: EntityId, tag: Tag, env: DataEnvelope) -> Result<(), SimError> {
        if ev_src == self.me {
            // Hold completed.
            ctx.schedule(self.parent, 0.0, tag, Payload::Envelope(env))?;
        } else {
            let baud = env.direct_baud.unwrap_or(self.baud_bps).min(self.baud_bps);
            let delay = transmission_delay(env.byte_size, baud);
            ctx.schedule_self(delay, tag, Payload::Envelope(env))?;
        }
        Ok(())
    }
}

impl Entity for Input {
    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        let src = ev.src;
        match (ev.tag, ev.payload) {
            (Tag::EndOfSimulation, _) => {
                ctx.finish();
                Ok(())
            }
            (_, Payload::Packet(pkt)) => match *pkt {
                Packet::Data(dp) => self.handle_data(ctx, dp),
                Packet::Probe(pp) => self.handle_probe(ctx, pp),
                Packet::Flow(_) => {
                    tracing::warn!(input = self.me, "flow packet at a packet-mode Input");
                    metrics::counter!(MET_PKT_DROPPED).increment(1);
                    Ok(())
                }
            },
            (tag, Payload::Envelope(env)) => self.handle_direct(ctx, src, tag, env),
            (tag, _) => {
                tracing::warn!(input = self.me, ?tag, "unhandled event at Input");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn env(bytes: u64, dst: EntityId) -> DataEnvelope {
        DataEnvelope {
            data: Bytes::new(),
            byte_size: bytes,
            dst,
            class: 0,
            tag: Tag::SendPacket,
            direct_baud: None,
        }
    }

    #[test]
    fn packetise_splits_at_mtu_and_shares_id() {
        let series = packetise(env(3_500, 7), 1_500, 42, 1, 2);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].header.size_bytes, 1_500);
        assert_eq!(series[1].header.size_bytes, 1_500);
        assert_eq!(series[2].header.size_bytes, 500);
        assert!(series[0].payload.is_none());
        assert!(series[1].payload.is_none());
        assert_eq!(series[0].header.tag, Tag::EmptyPkt);
        assert_eq!(series[1].header.tag, Tag::EmptyPkt);
        // The last fragment carries the whole item and the app tag.
        let last = &series[2];
        assert_eq!(last.header.tag, Tag::SendPacket);
        assert_eq!(last.payload.as_ref().unwrap().byte_size, 3_500);
        assert!(series.iter().all(|p| p.header.id == 42));
        assert!(series.iter().all(|p| p.total_in_stream == 3));
        assert_eq!(
            series.iter().map(|p| p.seq_no).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn packetise_small_item_is_single_packet() {
        let series = packetise(env(200, 7), 1_500, 1, 1, 2);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].header.size_bytes, 200);
        assert!(series[0].payload.is_some());
    }

    #[test]
    fn destinations_may_not_include_self() {
        let mut out = Output::new(10, 9, 1e9, None, TransportMode::Packet).unwrap();
        assert!(matches!(
            out.set_destinations(vec![9]),
            Err(ConfigError::JunkToSelf)
        ));
        assert!(out.set_destinations(vec![11, 12]).is_ok());
    }
}
