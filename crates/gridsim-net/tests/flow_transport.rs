//! Flow-level transport scenarios: conservation for a lone flow,
//! MIN-MAX fair sharing for simultaneous flows, and forecast revision
//! when a second flow is admitted midway (S5/S8/property 9).

mod common;

use common::{Deliveries, Sender, Sink};
use gridsim_engine::sim::Simulation;
use gridsim_net::{
    flow::FlowInput, topology::parse_topology, HostHandles, HostSpec, Network,
};
use gridsim_types::config::{Discipline, TraceConfig};
use std::cell::RefCell;
use std::rc::Rc;

const ONE_ROUTER: &str = "\
1
R
";

const GIGABYTE: u64 = 1_000_000_000;

/// Path U --(10 Gbps)-- R --(1 Gbps)-- V with flow-level links.
fn build(sim: &mut Simulation, sends: Vec<common::ScheduledSend>) -> (Deliveries, HostHandles) {
    let topo = parse_topology(ONE_ROUTER).unwrap();
    let mut net =
        Network::from_topology(sim, &topo, &Discipline::Flow, &TraceConfig::default()).unwrap();

    net.attach_host(
        sim,
        "R",
        &HostSpec {
            name: "U".to_string(),
            baud_bps: 10e9,
            prop_delay_ms: 1.0,
            mtu: 1_500,
        },
        Box::new(Sender::new(sends)),
    )
    .unwrap();
    let log: Deliveries = Rc::new(RefCell::new(Vec::new()));
    let v = net
        .attach_host(
            sim,
            "R",
            &HostSpec {
                name: "V".to_string(),
                baud_bps: 1e9,
                prop_delay_ms: 1.0,
                mtu: 1_500,
            },
            Box::new(Sink { log: Rc::clone(&log) }),
        )
        .unwrap();
    net.install(sim);
    (log, v)
}

/// S8 / property 8: a lone 1 GB flow over a 1 Gbps bottleneck takes
/// S*8/b plus the propagation delays.
#[test]
fn single_flow_conserves_bytes_and_time() {
    let mut sim = Simulation::new();
    let (log, _) = build(&mut sim, vec![(0.0, GIGABYTE, "V".to_string())]);

    sim.schedule_stop(30.0).unwrap();
    sim.start().unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    let (at, _, bytes) = log[0];
    assert_eq!(bytes, GIGABYTE);
    // 8 s of transfer plus two 1 ms propagation delays.
    assert!((at - 8.002).abs() < 1e-6, "delivery at {at}, expected 8.002");
}

/// Property 9, simultaneous case: two equal flows sharing the 1 Gbps
/// bottleneck each finish at 2*S*8/B plus propagation; the first flow
/// is squeezed exactly once, the second enters at the shared rate.
#[test]
fn simultaneous_flows_split_the_bottleneck() {
    let mut sim = Simulation::new();
    let (log, v) = build(
        &mut sim,
        vec![
            (0.0, GIGABYTE, "V".to_string()),
            (0.0, GIGABYTE, "V".to_string()),
        ],
    );

    sim.schedule_stop(40.0).unwrap();
    sim.start().unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 2);
    for &(at, _, bytes) in log.iter() {
        assert_eq!(bytes, GIGABYTE);
        assert!(
            (at - 16.002).abs() < 1e-3,
            "delivery at {at}, expected ~16.002"
        );
    }

    // F1 is squeezed once when F2 registers on the bottleneck link;
    // F2's only revision is the speedup when F1 releases.
    let input = sim.behavior_of::<FlowInput>(v.input).unwrap();
    assert_eq!(input.update_count(0), 1);
    assert_eq!(input.update_count(1), 1);
}

/// S5, staggered admission: F2 joining at t=1 s revises F1's forecast
/// exactly once; F1 finishes first and its release hands the freed
/// bandwidth back to F2.
#[test]
fn staggered_flow_revises_forecast_once() {
    let mut sim = Simulation::new();
    let (log, v) = build(
        &mut sim,
        vec![
            (0.0, GIGABYTE, "V".to_string()),
            (1.0, GIGABYTE, "V".to_string()),
        ],
    );

    sim.schedule_stop(40.0).unwrap();
    sim.start().unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 2);

    // F1: 1 s alone at 1 Gbps, the rest at 500 Mbps.
    // remaining = 1e9 - 0.999 s * 125 MB/s; finish ~15.003.
    let (f1_at, _, _) = log[0];
    assert!(
        (f1_at - 15.003).abs() < 0.01,
        "F1 delivered at {f1_at}, expected ~15.003"
    );

    // F2: 14 s at 500 Mbps, then the remainder at the full 1 Gbps
    // after F1's release.
    let (f2_at, _, _) = log[1];
    assert!(
        (f2_at - 16.002).abs() < 0.01,
        "F2 delivered at {f2_at}, expected ~16.002"
    );

    let input = sim.behavior_of::<FlowInput>(v.input).unwrap();
    // F1 is squeezed once when F2 registers on the bottleneck link.
    assert_eq!(input.update_count(0), 1);
    // F2's only revision is the release-time speedup, not a squeeze.
    assert_eq!(input.update_count(1), 1);
}
