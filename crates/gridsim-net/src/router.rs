//! # gridsim-net::router
//!
//! Routers own their attachment tables, their per-egress schedulers,
//! and a forwarding table built by a simplified distance-vector
//! flooding protocol. Incoming packets are fragmented to the egress
//! link's MTU and handed to its scheduler; the scheduler's timing is
//! driven by router self-events (`SCHEDULER_DEQUE`, `RATE_DRAIN`).

use crate::{
    link::LinkRef,
    sched::{DrainAction, EnqueueAction, SchedulerKind},
};
use gridsim_engine::{entity::Entity, event::Event, sim::Ctx, trace::TraceWriter};
use gridsim_types::{
    errors::{ConfigError, SimError},
    id::EntityId,
    metrics::MET_PKT_FORWARDED,
    packet::{DataPacket, Packet},
    payload::{Payload, RouterAd, SchedulerOp},
    tags::Tag,
    time::SimTime,
};
use fxhash::FxHashMap;
use indexmap::IndexMap;

/// Count-to-infinity cap on advertisement hop counts.
pub const DEFAULT_HOP_LIMIT: u32 = 15;

/// Simulated seconds a router allows for its advertisements to settle.
pub const ADVERT_SETTLE_PERIOD: SimTime = 5.0;

/// Retry delay when forwarding state is not yet converged.
const RETRY_DELAY: SimTime = 0.1;

pub struct Router {
    me: EntityId,
    name: String,
    hop_limit: u32,
    /// Resolved link info per link name.
    links: IndexMap<String, LinkRef>,
    links_by_id: FxHashMap<EntityId, String>,
    /// Neighbor (router or host) name -> link name.
    link_table: IndexMap<String, String>,
    /// Link name -> egress scheduler.
    scheduler_table: IndexMap<String, SchedulerKind>,
    /// Link name -> attached host name.
    host_table: IndexMap<String, String>,
    /// Link name -> neighbor router name.
    router_table: IndexMap<String, String>,
    /// Destination host -> (next-hop router, hop count).
    forwarding_table: IndexMap<String, (String, u32)>,
    trace: Option<TraceWriter>,
}

impl Router {
    pub fn new(me: EntityId, name: impl Into<String>) -> Self {
        Self {
            me,
            name: name.into(),
            hop_limit: DEFAULT_HOP_LIMIT,
            links: IndexMap::new(),
            links_by_id: FxHashMap::default(),
            link_table: IndexMap::new(),
            scheduler_table: IndexMap::new(),
            host_table: IndexMap::new(),
            router_table: IndexMap::new(),
            forwarding_table: IndexMap::new(),
            trace: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.me
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_hop_limit(&mut self, limit: u32) {
        self.hop_limit = limit;
    }

    pub fn set_trace(&mut self, trace: TraceWriter) {
        self.trace = Some(trace);
    }

    pub fn forwarding_entry(&self, dst: &str) -> Option<&(String, u32)> {
        self.forwarding_table.get(dst)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.host_table.values().map(String::as_str)
    }

    fn bind_link(&mut self, link: &LinkRef, mut sched: SchedulerKind) -> Result<(), ConfigError> {
        sched.set_baud_rate(link.baud_bps)?;
        self.links.insert(link.name.clone(), link.clone());
        self.links_by_id.insert(link.id, link.name.clone());
        self.scheduler_table.insert(link.name.clone(), sched);
        Ok(())
    }

    /// Records a neighboring router reachable over `link`, binding the
    /// link's baud to this side's scheduler.
    pub fn bind_router_link(
        &mut self,
        neighbor: &str,
        link: &LinkRef,
        sched: SchedulerKind,
    ) -> Result<(), ConfigError> {
        self.bind_link(link, sched)?;
        self.link_table.insert(neighbor.to_string(), link.name.clone());
        self.router_table.insert(link.name.clone(), neighbor.to_string());
        Ok(())
    }

    /// Attaches two routers over `link`, binding the link's baud rate
    /// to both egress schedulers.
    pub fn attach_router(
        &mut self,
        other: &mut Router,
        link: &LinkRef,
        sched_self: SchedulerKind,
        sched_other: SchedulerKind,
    ) -> Result<(), ConfigError> {
        let (a, b) = (self.name.clone(), other.name.clone());
        self.bind_router_link(&b, link, sched_self)?;
        other.bind_router_link(&a, link, sched_other)
    }

    /// Attaches a host through its own link.
    pub fn attach_host(
        &mut self,
        host: &str,
        link: &LinkRef,
        sched: SchedulerKind,
    ) -> Result<(), ConfigError> {
        self.bind_link(link, sched)?;
        self.link_table.insert(host.to_string(), link.name.clone());
        self.host_table.insert(link.name.clone(), host.to_string());
        Ok(())
    }

    /// The scheduler used to reach `dst_name`, if the tables know it.
    pub fn scheduler_for(&self, dst_name: &str) -> Option<&SchedulerKind> {
        let link = self.egress_for(dst_name)?;
        self.scheduler_table.get(link)
    }

    /// The egress link used to reach `dst_name`, via the host table or
    /// the forwarding table.
    fn egress_for(&self, dst_name: &str) -> Option<&str> {
        if let Some((link, _)) = self
            .host_table
            .iter()
            .find(|(_, host)| host.as_str() == dst_name)
        {
            return Some(link);
        }
        let (next_hop, _) = self.forwarding_table.get(dst_name)?;
        self.link_table.get(next_hop).map(String::as_str)
    }

    fn trace_line(&mut self, now: SimTime, columns: &[String], description: &str) {
        if let Some(trace) = &mut self.trace {
            if let Err(e) = trace.record(now, columns, description) {
                tracing::warn!(router = %self.name, error = %e, "trace write failed");
            }
        }
    }

    /// Floods this router's host set to all neighbor routers.
    fn flood_initial(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
        let hosts: Vec<String> = self.host_table.values().cloned().collect();
        if hosts.is_empty() {
            return Ok(());
        }
        let ad = RouterAd {
            sender: self.name.clone(),
            hosts,
            hop_count: 0,
        };
        for (link_name, _) in self.router_table.clone() {
            let link = self.links[&link_name].id;
            ctx.schedule(link, 0.0, Tag::RouterAd, Payload::RouterAd(ad.clone()))?;
        }
        Ok(())
    }

    fn handle_ad(&mut self, ctx: &mut Ctx<'_>, ad: RouterAd) -> Result<(), SimError> {
        if ad.hop_count > self.hop_limit {
            tracing::debug!(router = %self.name, from = %ad.sender, "advertisement past hop limit");
            return Ok(());
        }

        let mut learned = 0usize;
        for host in &ad.hosts {
            if self.host_table.values().any(|h| h == host) {
                continue;
            }
            let better = match self.forwarding_table.get(host) {
                None => true,
                Some(&(_, current)) => ad.hop_count < current,
            };
            if better {
                self.forwarding_table
                    .insert(host.clone(), (ad.sender.clone(), ad.hop_count));
                learned += 1;
            }
        }
        if learned > 0 {
            let now = ctx.now();
            self.trace_line(
                now,
                &[ad.sender.clone(), learned.to_string()],
                "routes learned from advertisement",
            );
        }

        // Re-flood with ourselves as the sender, one hop further, on
        // every neighbor except the one the ad came from.
        let refloods: Vec<EntityId> = self
            .router_table
            .iter()
            .filter(|(_, neighbor)| neighbor.as_str() != ad.sender)
            .map(|(link_name, _)| self.links[link_name].id)
            .collect();
        if !refloods.is_empty() {
            let forwarded = RouterAd {
                sender: self.name.clone(),
                hosts: ad.hosts,
                hop_count: ad.hop_count + 1,
            };
            for link in refloods {
                ctx.schedule(link, 0.0, Tag::RouterAd, Payload::RouterAd(forwarded.clone()))?;
            }
        }
        Ok(())
    }

    /// Forwards a packet toward its destination: resolve the egress
    /// link, fragment to its MTU, and hand the pieces to the egress
    /// scheduler. Flow packets bypass the schedulers entirely.
    fn forward(&mut self, ctx: &mut Ctx<'_>, mut pkt: Packet) -> Result<(), SimError> {
        let Some(dst_name) = ctx.name_of(pkt.dst()).map(str::to_string) else {
            tracing::warn!(router = %self.name, dst = pkt.dst(), "packet for unknown entity dropped");
            metrics::counter!(gridsim_types::metrics::MET_PKT_DROPPED).increment(1);
            return Ok(());
        };

        let Some(link_name) = self.egress_for(&dst_name).map(str::to_string) else {
            // Tables may not have converged yet; retry after a delay.
            if ctx.now() < ADVERT_SETTLE_PERIOD {
                tracing::debug!(router = %self.name, dst = %dst_name, "no route yet, retrying");
                let tag = pkt.forward_tag();
                ctx.schedule_self(RETRY_DELAY, tag, Payload::Packet(Box::new(pkt)))?;
            } else {
                tracing::warn!(router = %self.name, dst = %dst_name, "no route after convergence, dropped");
                metrics::counter!(gridsim_types::metrics::MET_PKT_DROPPED).increment(1);
            }
            return Ok(());
        };
        let link = self.links[&link_name].clone();

        pkt.header_mut().last_hop = self.me;
        if pkt.is_flow() {
            // Analytic flows are not store-and-forward scheduled; their
            // service time is accounted at the destination's hold.
            ctx.schedule(link.id, 0.0, pkt.forward_tag(), Payload::Packet(Box::new(pkt)))?;
            return Ok(());
        }

        let now = ctx.now();
        let sched = self
            .scheduler_table
            .get_mut(&link_name)
            .expect("scheduler bound at attach time");
        if let Packet::Probe(pp) = &mut pkt {
            pp.record_entry(self.me, now);
            pp.record_baud(sched.baud_rate());
        }
        metrics::counter!(MET_PKT_FORWARDED).increment(1);
        self.trace_line(
            now,
            &[dst_name.clone(), link_name.clone()],
            "packet queued for egress",
        );

        for fragment in fragment_to_mtu(pkt, link.mtu) {
            let action = self
                .scheduler_table
                .get_mut(&link_name)
                .expect("scheduler bound at attach time")
                .enqueue_action(fragment);
            let op = |class| Payload::Scheduler(SchedulerOp { link: link.id, class });
            match action {
                EnqueueAction::StartService { delay } => {
                    ctx.schedule_self(delay, Tag::SchedulerDeque, op(0))?;
                }
                EnqueueAction::StartClass { class, delay } => {
                    ctx.schedule_self(delay, Tag::RateDrain, op(class))?;
                }
                EnqueueAction::Backlogged => {}
            }
        }
        Ok(())
    }

    fn handle_deque(&mut self, ctx: &mut Ctx<'_>, op: SchedulerOp) -> Result<(), SimError> {
        let Some(link_name) = self.links_by_id.get(&op.link).cloned() else {
            tracing::warn!(router = %self.name, link = op.link, "dequeue for unknown link");
            return Ok(());
        };
        let now = ctx.now();
        let sched = self
            .scheduler_table
            .get_mut(&link_name)
            .expect("scheduler bound at attach time");
        if let Some(mut pkt) = sched.dequeue() {
            if let Packet::Probe(pp) = &mut pkt {
                pp.record_exit(now);
            }
            let next = sched.next_emit_delay();
            ctx.schedule(op.link, 0.0, pkt.forward_tag(), Payload::Packet(Box::new(pkt)))?;
            if let Some(delay) = next {
                ctx.schedule_self(delay, Tag::SchedulerDeque, Payload::Scheduler(op))?;
            }
        }
        Ok(())
    }

    fn handle_drain(&mut self, ctx: &mut Ctx<'_>, op: SchedulerOp) -> Result<(), SimError> {
        let Some(link_name) = self.links_by_id.get(&op.link).cloned() else {
            tracing::warn!(router = %self.name, link = op.link, "drain for unknown link");
            return Ok(());
        };
        let DrainAction { start_emit, next_drain } = self
            .scheduler_table
            .get_mut(&link_name)
            .expect("scheduler bound at attach time")
            .drain_class(op.class);
        if let Some(delay) = start_emit {
            ctx.schedule_self(delay, Tag::SchedulerDeque, Payload::Scheduler(op))?;
        }
        if let Some(delay) = next_drain {
            ctx.schedule_self(delay, Tag::RateDrain, Payload::Scheduler(op))?;
        }
        Ok(())
    }
}

/// Splits a packet into `ceil(size/mtu)` fragments sharing the packet
/// id and series metadata. Only data packets fragment; probes and
/// flows travel whole.
fn fragment_to_mtu(pkt: Packet, mtu: u64) -> Vec<Packet> {
    let Packet::Data(dp) = pkt else {
        return vec![pkt];
    };
    let size = dp.header.size_bytes;
    if size <= mtu {
        return vec![Packet::Data(dp)];
    }
    let pieces = size.div_ceil(mtu) as u32;
    let mut out = Vec::with_capacity(pieces as usize);
    for seq in 1..=pieces {
        let last = seq == pieces;
        let mut header = dp.header.clone();
        header.size_bytes = if last { size - mtu * (pieces as u64 - 1) } else { mtu };
        if !last {
            header.tag = Tag::EmptyPkt;
        }
        out.push(Packet::Data(DataPacket {
            header,
            seq_no: seq,
            total_in_stream: pieces,
            payload: if last { dp.payload.clone() } else { None },
        }));
    }
    out
}

impl Entity for Router {
    fn on_start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
        self.flood_initial(ctx)
    }

    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        match (ev.tag, ev.payload) {
            (Tag::RouterAd, Payload::RouterAd(ad)) => self.handle_ad(ctx, ad),
            (Tag::SchedulerDeque, Payload::Scheduler(op)) => self.handle_deque(ctx, op),
            (Tag::RateDrain, Payload::Scheduler(op)) => self.handle_drain(ctx, op),
            (Tag::PktForward | Tag::JunkPkt | Tag::FlowSubmit, Payload::Packet(pkt)) => {
                self.forward(ctx, *pkt)
            }
            (Tag::EndOfSimulation, _) => {
                for (_, sched) in &self.scheduler_table {
                    sched.shutdown();
                }
                if let Some(trace) = &mut self.trace {
                    if let Err(e) = trace.flush() {
                        tracing::warn!(router = %self.name, error = %e, "trace flush failed");
                    }
                }
                ctx.finish();
                Ok(())
            }
            (tag, _) => {
                tracing::warn!(router = %self.name, ?tag, "unknown tag at router, event discarded");
                Ok(())
            }
        }
    }

    fn at_end(&mut self, _ctx: &mut Ctx<'_>) {
        // Covers runs that end by queue exhaustion without a broadcast.
        if let Some(trace) = &mut self.trace {
            if let Err(e) = trace.flush() {
                tracing::warn!(router = %self.name, error = %e, "trace flush failed");
            }
        }
    }
}
