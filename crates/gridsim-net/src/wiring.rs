//! # gridsim-net::wiring
//!
//! Builds a live network inside a `Simulation` from a parsed topology:
//! reserves entity ids, constructs routers, links, and schedulers for
//! the chosen discipline, attaches hosts with their I/O ports, and
//! finally installs the routers. Cross-references are plain entity
//! ids resolved up front via `Simulation::reserve`.

use crate::{
    flow::{FlowInput, FlowLink},
    link::{LinkEnds, LinkRef, SimpleLink},
    ports::{Input, Output, TrafficGenerator, TransportMode},
    router::Router,
    sched::{FifoScheduler, RateScheduler, ScfqScheduler, SchedulerKind},
    topology::TopologyFile,
};
use gridsim_engine::{entity::Entity, sim::Simulation, trace::TraceWriter};
use gridsim_types::{
    config::{Discipline, TraceConfig},
    errors::ConfigError,
    id::EntityId,
};
use indexmap::IndexMap;

/// A host's link parameters.
#[derive(Debug, Clone)]
pub struct HostSpec {
    pub name: String,
    pub baud_bps: f64,
    pub prop_delay_ms: f64,
    pub mtu: u64,
}

/// Entity ids created for one attached host.
#[derive(Debug, Clone, Copy)]
pub struct HostHandles {
    pub entity: EntityId,
    pub input: EntityId,
    pub output: EntityId,
    pub link: EntityId,
}

/// A network under construction: routers are held back until every
/// host is attached, because attachment mutates their tables.
pub struct Network {
    discipline: Discipline,
    trace: TraceConfig,
    routers: IndexMap<String, Router>,
}

impl Network {
    /// Creates routers and router-router links from a topology file.
    /// Link entities are installed immediately; routers stay in the
    /// builder until [`Network::install`].
    pub fn from_topology(
        sim: &mut Simulation,
        topo: &TopologyFile,
        discipline: &Discipline,
        trace: &TraceConfig,
    ) -> Result<Self, ConfigError> {
        discipline.validate()?;
        let mut net = Self {
            discipline: discipline.clone(),
            trace: trace.clone(),
            routers: IndexMap::new(),
        };

        for decl in &topo.routers {
            let id = sim.reserve(&decl.name)?;
            let mut router = Router::new(id, &decl.name);
            if decl.trace && trace.enabled {
                let path = trace.dir.join(format!("{}.trace", decl.name));
                router.set_trace(TraceWriter::create(&path, trace.separator)?);
            }
            net.routers.insert(decl.name.clone(), router);
        }

        for decl in &topo.links {
            let link_name = format!("link_{}_{}", decl.a, decl.b);
            let link_id = sim.reserve(&link_name)?;
            let link = LinkRef::new(link_id, link_name, decl.baud_bps, decl.prop_delay_ms, decl.mtu)?;

            let a_id = net.routers[&decl.a].id();
            let b_id = net.routers[&decl.b].id();
            let sched_a = net.make_scheduler(&decl.a, &link.name, a_id)?;
            let sched_b = net.make_scheduler(&decl.b, &link.name, b_id)?;
            net.routers
                .get_mut(&decl.a)
                .expect("declared router")
                .bind_router_link(&decl.b, &link, sched_a)?;
            net.routers
                .get_mut(&decl.b)
                .expect("declared router")
                .bind_router_link(&decl.a, &link, sched_b)?;

            let ends = LinkEnds {
                end1_input: a_id,
                end1_output: a_id,
                end2_input: b_id,
                end2_output: b_id,
            };
            sim.install(link_id, net.make_link(&link, ends));
        }

        Ok(net)
    }

    /// Attaches a host (with its behavior, I/O ports, and own link) to
    /// a router created by [`Network::from_topology`].
    pub fn attach_host(
        &mut self,
        sim: &mut Simulation,
        router_name: &str,
        spec: &HostSpec,
        behavior: Box<dyn Entity>,
    ) -> Result<HostHandles, ConfigError> {
        let entity = sim.reserve(&spec.name)?;
        let input = sim.reserve(&format!("Input_{}", spec.name))?;
        let output = sim.reserve(&format!("Output_{}", spec.name))?;
        let link_name = format!("{}_link", spec.name);
        let link_id = sim.reserve(&link_name)?;
        let link = LinkRef::new(link_id, link_name, spec.baud_bps, spec.prop_delay_ms, spec.mtu)?;

        let router_id = self
            .routers
            .get(router_name)
            .ok_or_else(|| ConfigError::Topology {
                line: 0,
                message: format!("no router {router_name:?} to attach {:?} to", spec.name),
            })?
            .id();
        let sched = self.make_scheduler(router_name, &link.name, router_id)?;
        self.routers
            .get_mut(router_name)
            .expect("checked above")
            .attach_host(&spec.name, &link, sched)?;

        let ends = LinkEnds {
            end1_input: input,
            end1_output: output,
            end2_input: router_id,
            end2_output: router_id,
        };
        sim.install(link_id, self.make_link(&link, ends));

        let mode = match self.discipline {
            Discipline::Flow => TransportMode::Flow,
            _ => TransportMode::Packet,
        };
        sim.install(
            output,
            Box::new(Output::new(output, entity, spec.baud_bps, Some(link.clone()), mode)?),
        );
        match self.discipline {
            Discipline::Flow => sim.install(input, Box::new(FlowInput::new(input, entity))),
            _ => sim.install(
                input,
                Box::new(Input::new(input, entity, spec.name.clone(), spec.baud_bps)?),
            ),
        }
        sim.install(entity, behavior);

        sim.add_port(entity, "input", input).expect("just reserved");
        sim.add_port(entity, "output", output).expect("just reserved");

        Ok(HostHandles {
            entity,
            input,
            output,
            link: link_id,
        })
    }

    /// Arms background traffic on an attached host's Output. The
    /// generator's randomness is seeded from the run configuration;
    /// the sending host itself may not appear in `destinations`.
    pub fn set_traffic(
        &self,
        sim: &mut Simulation,
        host: &HostHandles,
        destinations: Vec<EntityId>,
        generator: Box<dyn TrafficGenerator>,
        seed: u64,
    ) -> Result<(), ConfigError> {
        let output = sim
            .behavior_mut_of::<Output>(host.output)
            .expect("handle produced by attach_host");
        output.set_destinations(destinations)?;
        output.set_traffic(generator, seed);
        Ok(())
    }

    /// Installs the finished routers into the simulation. Call after
    /// every host is attached.
    pub fn install(self, sim: &mut Simulation) {
        for (_, router) in self.routers {
            sim.install(router.id(), Box::new(router));
        }
    }

    pub fn router_id(&self, name: &str) -> Option<EntityId> {
        self.routers.get(name).map(|r| r.id())
    }

    /// Read access to a router under construction (tests inspect
    /// forwarding tables through this before installation).
    pub fn router(&self, name: &str) -> Option<&Router> {
        self.routers.get(name)
    }

    fn make_scheduler(
        &self,
        router_name: &str,
        link_name: &str,
        router_id: EntityId,
    ) -> Result<SchedulerKind, ConfigError> {
        let name = format!("sched_{router_name}_{link_name}");
        Ok(match &self.discipline {
            Discipline::Fifo | Discipline::Flow => {
                SchedulerKind::Fifo(FifoScheduler::new(name, router_id))
            }
            Discipline::Scfq { weights } => {
                SchedulerKind::Scfq(ScfqScheduler::new(name, router_id, weights.clone())?)
            }
            Discipline::RateControlled { percentages } => SchedulerKind::Rate(
                RateScheduler::with_percentages(name, router_id, percentages.clone())?,
            ),
        })
    }

    fn make_link(&self, link: &LinkRef, ends: LinkEnds) -> Box<dyn Entity> {
        match self.discipline {
            Discipline::Flow => Box::new(FlowLink::new(link, ends)),
            _ => Box::new(SimpleLink::new(link, ends)),
        }
    }

    /// Trace configuration the network was built with.
    pub fn trace(&self) -> &TraceConfig {
        &self.trace
    }
}
