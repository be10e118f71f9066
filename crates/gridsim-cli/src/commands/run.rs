//! # gridsim-cli::commands::run
//!
//! Builds a simulation from a topology file and a run configuration,
//! attaches one demo host per router, and runs it to the stop time.
//! The first host probes the last one once the routing tables settle.

use crate::{args::RunOpts, drivers::{PingDriver, QuietHost}};
use anyhow::{Context, Result};
use gridsim_engine::{sim::Simulation, workload::read_swf};
use gridsim_net::{
    ports::{BurstList, JunkBurst, JunkPattern},
    router::ADVERT_SETTLE_PERIOD,
    topology::load_topology,
    HostSpec, Network,
};
use gridsim_types::{
    config::{Discipline, RunConfig, TraceConfig, TrafficPattern},
    id::EntityId,
};

pub fn exec(opts: RunOpts) -> Result<()> {
    let config = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<RunConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => RunConfig {
            seed: 1,
            discipline: Discipline::Fifo,
            trace: TraceConfig::default(),
            workload: None,
            traffic: None,
        },
    };
    config.discipline.validate()?;

    let topo = load_topology(&opts.topology)
        .with_context(|| format!("loading {}", opts.topology.display()))?;
    tracing::info!(
        routers = topo.routers.len(),
        links = topo.links.len(),
        seed = config.seed,
        "topology loaded"
    );

    if let Some(workload) = &config.workload {
        let jobs = read_swf(&workload.path, &workload.columns)
            .with_context(|| format!("reading {}", workload.path.display()))?;
        let total_work: f64 = jobs.iter().map(|j| j.length(workload.pe_rating)).sum();
        tracing::info!(
            jobs = jobs.len(),
            total_work,
            "workload trace loaded (no allocation policy attached)"
        );
    }

    let mut sim = Simulation::new();
    let mut net = Network::from_topology(&mut sim, &topo, &config.discipline, &config.trace)?;

    // One demo host per router; the first pings the last.
    let host_names: Vec<String> = topo
        .routers
        .iter()
        .map(|r| format!("host_{}", r.name))
        .collect();
    let mut hosts = Vec::with_capacity(topo.routers.len());
    for (i, router) in topo.routers.iter().enumerate() {
        let spec = HostSpec {
            name: host_names[i].clone(),
            baud_bps: 1e9,
            prop_delay_ms: 0.001,
            mtu: 1_500,
        };
        let behavior: Box<dyn gridsim_engine::entity::Entity> =
            if i == 0 && topo.routers.len() > 1 {
                Box::new(PingDriver::new(
                    host_names.last().expect("at least one router").clone(),
                    1_500,
                    ADVERT_SETTLE_PERIOD,
                ))
            } else {
                Box::new(QuietHost)
            };
        hosts.push(net.attach_host(&mut sim, &router.name, &spec, behavior)?);
    }

    // Background traffic between the demo hosts, seeded per host from
    // the run seed.
    if let Some(traffic) = &config.traffic {
        let pattern = match traffic.pattern {
            TrafficPattern::SendAll => JunkPattern::SendAll,
            TrafficPattern::SendOneOnly => JunkPattern::SendOneOnly,
        };
        for (i, host) in hosts.iter().enumerate() {
            let others: Vec<EntityId> = hosts
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, h)| h.entity)
                .collect();
            if others.is_empty() {
                break;
            }
            let burst = JunkBurst {
                inter_arrival: traffic.inter_arrival,
                size: traffic.size_bytes,
                count: traffic.count,
                pattern,
                class: traffic.class,
            };
            net.set_traffic(
                &mut sim,
                host,
                others,
                Box::new(BurstList::new(vec![burst])),
                config.seed.wrapping_add(i as u64),
            )?;
        }
    }
    net.install(&mut sim);

    sim.schedule_stop(opts.until)?;
    let end = sim.start()?;
    tracing::info!(
        clock = end,
        entities = sim.num_entities(),
        wall = ?sim.wall_elapsed(),
        "run complete"
    );
    Ok(())
}
