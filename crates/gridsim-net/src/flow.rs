//! # gridsim-net::flow
//!
//! The analytic flow-level transport. A `FlowLink` has the same wire
//! semantics as `SimpleLink` but tracks its active flows and shares
//! its nominal rate equally among them; a `FlowInput` holds each
//! arrived flow for `remaining * 8 / bottleneck` and revises that
//! forecast whenever a link reports a changed share.
//!
//! Links keep a per-flow record of the flow's current bottleneck so
//! they only notify flows that actually lose (or regain) bandwidth;
//! destinations refresh those records with `FLOW_SYNC` events and
//! deregister with `FLOW_RELEASE`.

use crate::link::{LinkEnds, LinkRef, Wire};
use gridsim_engine::{entity::Entity, event::Event, sim::Ctx};
use gridsim_types::{
    errors::SimError,
    id::{EntityId, FlowId},
    packet::{FlowPacket, Packet},
    payload::{FlowNotice, Payload},
    tags::Tag,
    time::transmission_delay,
};
use fxhash::FxHashMap;
use indexmap::IndexMap;

/// Per-flow bookkeeping a link keeps while the flow is active.
struct FlowRecord {
    dst_input: EntityId,
    /// The flow's current bottleneck rate, refreshed by `FLOW_SYNC`.
    bottleneck_bps: f64,
    bottleneck_link: EntityId,
}

/// A link whose effective rate is `nominal / |active flows|`.
pub struct FlowLink {
    me: EntityId,
    name: String,
    nominal_baud: f64,
    wire: Wire,
    flows: IndexMap<FlowId, FlowRecord>,
}

impl FlowLink {
    pub fn new(link: &LinkRef, ends: LinkEnds) -> Self {
        Self {
            me: link.id,
            name: link.name.clone(),
            nominal_baud: link.baud_bps,
            wire: Wire::new(ends, link.prop_delay),
            flows: IndexMap::default(),
        }
    }

    /// The per-flow fair share at the current admission count.
    pub fn effective_baud(&self) -> f64 {
        if self.flows.is_empty() {
            self.nominal_baud
        } else {
            self.nominal_baud / self.flows.len() as f64
        }
    }

    fn register(&mut self, ctx: &mut Ctx<'_>, fp: &mut FlowPacket) -> Result<(), SimError> {
        if self.flows.contains_key(&fp.flow_id) {
            return Ok(());
        }
        let effective = self.nominal_baud / (self.flows.len() + 1) as f64;

        // Every already-active flow that currently runs faster than the
        // new share is losing bandwidth here; tell its destination.
        for (&fid, rec) in &self.flows {
            if rec.bottleneck_bps > effective {
                ctx.schedule(
                    rec.dst_input,
                    0.0,
                    Tag::FlowUpdate,
                    Payload::FlowCtl(FlowNotice {
                        flow: fid,
                        link: self.me,
                        effective_bps: effective,
                    }),
                )?;
            }
        }

        fp.record_share(self.me, effective);
        let dst_input = resolve_input(ctx, fp.header.dst)?;
        self.flows.insert(
            fp.flow_id,
            FlowRecord {
                dst_input,
                bottleneck_bps: fp.bottleneck_bps,
                bottleneck_link: fp.bottleneck_link.unwrap_or(self.me),
            },
        );
        Ok(())
    }

    fn release(&mut self, ctx: &mut Ctx<'_>, flow: FlowId) -> Result<(), SimError> {
        if self.flows.shift_remove(&flow).is_none() {
            return Ok(());
        }
        if self.flows.is_empty() {
            return Ok(());
        }
        let effective = self.effective_baud();
        // Flows bottlenecked by this link regain bandwidth.
        for (&fid, rec) in &self.flows {
            if rec.bottleneck_link == self.me && rec.bottleneck_bps < effective {
                ctx.schedule(
                    rec.dst_input,
                    0.0,
                    Tag::FlowUpdate,
                    Payload::FlowCtl(FlowNotice {
                        flow: fid,
                        link: self.me,
                        effective_bps: effective,
                    }),
                )?;
            }
        }
        Ok(())
    }
}

/// Sets the flow's bottleneck to the smallest recorded link share.
fn rederive_bottleneck(pkt: &mut FlowPacket) {
    if let Some((link, share)) = pkt
        .link_shares
        .iter()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(l, s)| (*l, *s))
    {
        pkt.bottleneck_bps = share;
        pkt.bottleneck_link = Some(link);
    }
}

/// The id of the destination's Input entity, falling back to the
/// destination itself when it has no ports.
fn resolve_input(ctx: &Ctx<'_>, dst: EntityId) -> Result<EntityId, SimError> {
    let name = ctx.name_of(dst).ok_or(SimError::UnknownEntity(dst))?;
    Ok(ctx.lookup(&format!("Input_{name}")).unwrap_or(dst))
}

impl Entity for FlowLink {
    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        match (ev.tag, ev.payload) {
            (Tag::LinkWakeup, _) => {
                if let Some((dst, tag, payload)) = self.wire.wake(ctx)? {
                    ctx.schedule(dst, 0.0, tag, payload)?;
                }
                Ok(())
            }
            (Tag::FlowSync, Payload::FlowCtl(notice)) => {
                if let Some(rec) = self.flows.get_mut(&notice.flow) {
                    rec.bottleneck_bps = notice.effective_bps;
                    rec.bottleneck_link = notice.link;
                }
                Ok(())
            }
            (Tag::FlowRelease, Payload::Object(flow)) => self.release(ctx, flow),
            (Tag::EndOfSimulation, _) => {
                if !self.flows.is_empty() {
                    tracing::debug!(
                        link = %self.name,
                        active = self.flows.len(),
                        "flow link shutting down with active flows"
                    );
                }
                ctx.finish();
                Ok(())
            }
            (tag, Payload::Packet(mut pkt)) => {
                if let Packet::Flow(fp) = pkt.as_mut() {
                    fp.latency += self.wire.prop_delay;
                    self.register(ctx, fp)?;
                }
                self.wire.accept(ctx, ev.src, tag, Payload::Packet(pkt))
            }
            (tag, payload) => self.wire.accept(ctx, ev.src, tag, payload),
        }
    }
}

/// An active flow parked at its destination, waiting out its forecast.
struct ActiveFlow {
    pkt: FlowPacket,
}

/// Flow-aware inbound port: admits arriving flows, forecasts their
/// completion, and revises the forecast on `FLOW_UPDATE`.
pub struct FlowInput {
    me: EntityId,
    parent: EntityId,
    active: FxHashMap<FlowId, ActiveFlow>,
    /// Share changes that arrived before their flow did (a later flow
    /// admitted upstream can outrun this one on the wire); merged into
    /// the flow at admission.
    pending: FxHashMap<FlowId, Vec<FlowNotice>>,
    /// Flows already delivered; late notifications for them are noise.
    finished: fxhash::FxHashSet<FlowId>,
    /// Applied share updates per flow, kept for reporting.
    update_counts: FxHashMap<FlowId, usize>,
}

impl FlowInput {
    pub fn new(me: EntityId, parent: EntityId) -> Self {
        Self {
            me,
            parent,
            active: FxHashMap::default(),
            pending: FxHashMap::default(),
            finished: fxhash::FxHashSet::default(),
            update_counts: FxHashMap::default(),
        }
    }

    /// Number of `FLOW_UPDATE`s applied to `flow` so far.
    pub fn update_count(&self, flow: FlowId) -> usize {
        self.update_counts.get(&flow).copied().unwrap_or(0)
    }

    /// Pushes the flow's current bottleneck out to every traversed
    /// link so their notification records stay fresh.
    fn sync_links(&self, ctx: &mut Ctx<'_>, pkt: &FlowPacket) -> Result<(), SimError> {
        let bottleneck_link = pkt.bottleneck_link.unwrap_or(self.me);
        for link in pkt.links().collect::<Vec<_>>() {
            ctx.schedule(
                link,
                0.0,
                Tag::FlowSync,
                Payload::FlowCtl(FlowNotice {
                    flow: pkt.flow_id,
                    link: bottleneck_link,
                    effective_bps: pkt.bottleneck_bps,
                }),
            )?;
        }
        Ok(())
    }

    fn admit(&mut self, ctx: &mut Ctx<'_>, mut fp: FlowPacket) -> Result<(), SimError> {
        let now = ctx.now();
        fp.last_update_time = now;
        if let Some(early) = self.pending.remove(&fp.flow_id) {
            for notice in early {
                fp.link_shares.insert(notice.link, notice.effective_bps);
            }
        }
        rederive_bottleneck(&mut fp);
        let hold = transmission_delay(fp.remaining_bytes.ceil() as u64, fp.bottleneck_bps);
        let flow_id = fp.flow_id;
        ctx.schedule_self(hold, Tag::FlowHold, Payload::Object(flow_id))?;
        self.sync_links(ctx, &fp)?;
        tracing::debug!(
            input = self.me,
            flow = flow_id,
            bottleneck = fp.bottleneck_bps,
            "flow admitted"
        );
        self.active.insert(flow_id, ActiveFlow { pkt: fp });
        Ok(())
    }

    fn hold_expired(&mut self, ctx: &mut Ctx<'_>, flow: FlowId) -> Result<(), SimError> {
        let Some(state) = self.active.remove(&flow) else {
            // The flow left through another path; specified behavior is
            // to drop the stale hold silently.
            tracing::debug!(input = self.me, flow, "hold for a departed flow dropped");
            return Ok(());
        };
        self.finished.insert(flow);
        self.pending.remove(&flow);
        let pkt = state.pkt;
        for link in pkt.links().collect::<Vec<_>>() {
            ctx.schedule(link, 0.0, Tag::FlowRelease, Payload::Object(flow))?;
        }
        if let Some(env) = pkt.payload {
            if env.tag == Tag::JunkPkt {
                metrics::counter!(gridsim_types::metrics::MET_JUNK_DROPPED).increment(1);
            } else {
                let tag = env.tag;
                ctx.schedule(self.parent, 0.0, tag, Payload::Envelope(env))?;
            }
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut Ctx<'_>, notice: FlowNotice) -> Result<(), SimError> {
        let Some(state) = self.active.get_mut(&notice.flow) else {
            if self.finished.contains(&notice.flow) {
                tracing::debug!(input = self.me, flow = notice.flow, "update for a departed flow");
            } else {
                // The flow itself has not arrived yet; hold the change.
                self.pending.entry(notice.flow).or_default().push(notice);
            }
            return Ok(());
        };
        *self.update_counts.entry(notice.flow).or_insert(0) += 1;
        let now = ctx.now();
        let pkt = &mut state.pkt;

        // Credit the bytes moved at the old rate since the last update.
        let elapsed = now - pkt.last_update_time;
        let moved = elapsed * pkt.bottleneck_bps / 8.0;
        pkt.remaining_bytes = (pkt.remaining_bytes - moved).max(0.0);
        pkt.last_update_time = now;

        // Fold in the new share and re-derive the bottleneck.
        pkt.link_shares.insert(notice.link, notice.effective_bps);
        rederive_bottleneck(pkt);

        let flow = notice.flow;
        let cancelled = ctx.cancel_matching(move |e| {
            e.tag == Tag::FlowHold && e.payload.as_object() == Some(flow)
        });
        if cancelled == 0 {
            tracing::debug!(input = self.me, flow, "no outstanding hold to cancel");
        }
        let hold = transmission_delay(pkt.remaining_bytes.ceil() as u64, pkt.bottleneck_bps);
        ctx.schedule_self(hold, Tag::FlowHold, Payload::Object(flow))?;

        let snapshot = state.pkt.clone();
        self.sync_links(ctx, &snapshot)?;
        Ok(())
    }
}

impl Entity for FlowInput {
    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        match (ev.tag, ev.payload) {
            (Tag::EndOfSimulation, _) => {
                ctx.finish();
                Ok(())
            }
            (Tag::FlowHold, Payload::Object(flow)) => self.hold_expired(ctx, flow),
            (Tag::FlowUpdate, Payload::FlowCtl(notice)) => self.update(ctx, notice),
            (_, Payload::Packet(pkt)) => match *pkt {
                Packet::Flow(fp) => self.admit(ctx, fp),
                other => {
                    tracing::warn!(input = self.me, pkt = other.id(), "non-flow packet at FlowInput");
                    Ok(())
                }
            },
            (tag, _) => {
                tracing::warn!(input = self.me, ?tag, "unhandled event at FlowInput");
                Ok(())
            }
        }
    }
}
