//! End-to-end packet-network scenarios: probe round trip, MTU
//! splitting with reassembly, junk filtering, and distance-vector
//! convergence.

mod common;

use common::{Deliveries, Prober, ProbeResults, Sender, Sink};
use gridsim_engine::sim::Simulation;
use gridsim_net::{
    ports::{BurstList, JunkBurst, JunkPattern},
    topology::parse_topology,
    HostSpec, Network, Router,
};
use gridsim_types::{config::{Discipline, TraceConfig}, tags::Tag};
use std::cell::RefCell;
use std::rc::Rc;

const TWO_ROUTERS: &str = "\
2
A
B
A B 1 10 1500
";

fn host(name: &str) -> HostSpec {
    HostSpec {
        name: name.to_string(),
        baud_bps: 1e9,
        prop_delay_ms: 0.001,
        mtu: 1500,
    }
}

/// S1: a 1500-byte probe across one 1 Gbps / 10 ms link returns with
/// one hop, a 1 Gbps bottleneck, and an RTT of about 20.02 ms.
#[test]
fn probe_round_trip_reports_hop_and_bottleneck() {
    let mut sim = Simulation::new();
    let topo = parse_topology(TWO_ROUTERS).unwrap();
    let mut net =
        Network::from_topology(&mut sim, &topo, &Discipline::Fifo, &TraceConfig::default())
            .unwrap();

    let results: ProbeResults = Rc::new(RefCell::new(Vec::new()));
    net.attach_host(
        &mut sim,
        "A",
        &host("U"),
        Box::new(Prober::new("R", 1_500, 5.0, Rc::clone(&results))),
    )
    .unwrap();
    let log: Deliveries = Rc::new(RefCell::new(Vec::new()));
    net.attach_host(&mut sim, "B", &host("R"), Box::new(Sink { log }))
        .unwrap();
    net.install(&mut sim);

    sim.schedule_stop(20.0).unwrap();
    sim.start().unwrap();

    let results = results.borrow();
    assert_eq!(results.len(), 1, "exactly one probe must return");
    let (rtt, hops, bottleneck) = results[0];
    assert_eq!(hops, 1);
    assert_eq!(bottleneck, 1e9);
    // 2 * (10 ms propagation + 12 us transmission), plus the host links.
    assert!(
        (rtt - 0.02002).abs() < 1e-3,
        "rtt {rtt} too far from 0.02002"
    );
}

/// S2: a 3500-byte item over MTU-1500 links is carried as three
/// fragments and reassembled into a single 3500-byte delivery.
#[test]
fn mtu_split_item_reassembles_at_destination() {
    let mut sim = Simulation::new();
    let topo = parse_topology(TWO_ROUTERS).unwrap();
    let mut net =
        Network::from_topology(&mut sim, &topo, &Discipline::Fifo, &TraceConfig::default())
            .unwrap();

    net.attach_host(
        &mut sim,
        "A",
        &host("U"),
        Box::new(Sender::new(vec![(5.0, 3_500, "R".to_string())])),
    )
    .unwrap();
    let log: Deliveries = Rc::new(RefCell::new(Vec::new()));
    net.attach_host(&mut sim, "B", &host("R"), Box::new(Sink { log: Rc::clone(&log) }))
        .unwrap();
    net.install(&mut sim);

    sim.schedule_stop(20.0).unwrap();
    sim.start().unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 1, "one reassembled item expected");
    let (_, tag, bytes) = log[0];
    assert_eq!(bytes, 3_500);
    assert_eq!(tag, Tag::SendPacket);
}

/// Background junk traffic is dropped at the destination Input and
/// never reaches the application.
#[test]
fn junk_traffic_is_filtered_at_input() {
    let mut sim = Simulation::new();
    let topo = parse_topology(TWO_ROUTERS).unwrap();
    let mut net =
        Network::from_topology(&mut sim, &topo, &Discipline::Fifo, &TraceConfig::default())
            .unwrap();

    let sender = net
        .attach_host(
            &mut sim,
            "A",
            &host("U"),
            Box::new(Sender::new(vec![(6.0, 1_000, "R".to_string())])),
        )
        .unwrap();
    let log: Deliveries = Rc::new(RefCell::new(Vec::new()));
    let sink = net
        .attach_host(&mut sim, "B", &host("R"), Box::new(Sink { log: Rc::clone(&log) }))
        .unwrap();

    // Five junk packets toward R, starting before the data item.
    net.set_traffic(
        &mut sim,
        &sender,
        vec![sink.entity],
        Box::new(BurstList::new(vec![JunkBurst {
            inter_arrival: 1.0,
            size: 500,
            count: 5,
            pattern: JunkPattern::SendOneOnly,
            class: 0,
        }])),
        7,
    )
    .unwrap();
    net.install(&mut sim);

    sim.schedule_stop(20.0).unwrap();
    sim.start().unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 1, "only the data item may reach the app");
    assert_eq!(log[0].2, 1_000);
}

/// S6: in a five-router chain every router learns the far hosts with
/// hop counts matching its distance.
#[test]
fn distance_vector_converges_on_a_chain() {
    const CHAIN: &str = "\
5
R0
R1
R2
R3
R4
R0 R1 1 1 1500
R1 R2 1 1 1500
R2 R3 1 1 1500
R3 R4 1 1 1500
";
    let mut sim = Simulation::new();
    let topo = parse_topology(CHAIN).unwrap();
    let mut net =
        Network::from_topology(&mut sim, &topo, &Discipline::Fifo, &TraceConfig::default())
            .unwrap();

    let log0: Deliveries = Rc::new(RefCell::new(Vec::new()));
    let log4: Deliveries = Rc::new(RefCell::new(Vec::new()));
    net.attach_host(&mut sim, "R0", &host("H0"), Box::new(Sink { log: log0 }))
        .unwrap();
    net.attach_host(&mut sim, "R4", &host("H4"), Box::new(Sink { log: log4 }))
        .unwrap();
    let router_ids: Vec<_> = (0..5)
        .map(|i| net.router_id(&format!("R{i}")).unwrap())
        .collect();
    net.install(&mut sim);

    sim.schedule_stop(10.0).unwrap();
    sim.start().unwrap();

    // Every router reaches both hosts through its tables.
    for (i, &id) in router_ids.iter().enumerate() {
        let router = sim.behavior_of::<Router>(id).expect("router installed");
        for host in ["H0", "H4"] {
            let local = router.hosts().any(|h| h == host);
            assert!(
                local || router.forwarding_entry(host).is_some(),
                "R{i} has no route to {host}"
            );
        }
    }

    // Hop counts along the chain match the advertisement distance.
    let r4 = sim.behavior_of::<Router>(router_ids[4]).unwrap();
    assert_eq!(r4.forwarding_entry("H0"), Some(&("R3".to_string(), 3)));
    let r1 = sim.behavior_of::<Router>(router_ids[1]).unwrap();
    assert_eq!(r1.forwarding_entry("H4"), Some(&("R2".to_string(), 2)));
    let r0 = sim.behavior_of::<Router>(router_ids[0]).unwrap();
    assert_eq!(r0.forwarding_entry("H4"), Some(&("R1".to_string(), 3)));
}
