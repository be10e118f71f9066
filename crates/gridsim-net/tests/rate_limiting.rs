//! S4: a rate-controlled egress caps class throughput at its
//! configured rate independently of the physical link speed.

mod common;

use common::{Deliveries, Sender, Sink};
use gridsim_engine::sim::Simulation;
use gridsim_net::{
    link::{LinkEnds, LinkRef, SimpleLink},
    ports::{Input, Output, TransportMode},
    sched::{FifoScheduler, RateScheduler, SchedulerKind},
    Router,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Ten 1000-byte packets offered at once against rate[0] = 1 Mbps must
/// drain in ~80 ms, one every ~8 ms, even though the links run at
/// 1 Gbps.
#[test]
fn rate_controlled_egress_caps_throughput() {
    let mut sim = Simulation::new();

    let a = sim.reserve("A").unwrap();
    let b = sim.reserve("B").unwrap();
    let ab = sim.reserve("link_A_B").unwrap();
    let ab_ref = LinkRef::new(ab, "link_A_B".to_string(), 1e9, 0.001, 1_500).unwrap();

    let mut router_a = Router::new(a, "A");
    let mut router_b = Router::new(b, "B");
    router_a
        .attach_router(
            &mut router_b,
            &ab_ref,
            SchedulerKind::Rate(RateScheduler::with_rates("sched_A", a, vec![1e6]).unwrap()),
            SchedulerKind::Fifo(FifoScheduler::new("sched_B", b)),
        )
        .unwrap();
    sim.install(
        ab,
        Box::new(SimpleLink::new(
            &ab_ref,
            LinkEnds {
                end1_input: a,
                end1_output: a,
                end2_input: b,
                end2_output: b,
            },
        )),
    );

    // Host U on A offers the burst; host R on B collects arrivals.
    let sends = (0..10).map(|_| (5.0, 1_000, "R".to_string())).collect();
    attach_host(&mut sim, &mut router_a, "U", Box::new(Sender::new(sends)));
    let log: Deliveries = Rc::new(RefCell::new(Vec::new()));
    attach_host(&mut sim, &mut router_b, "R", Box::new(Sink { log: Rc::clone(&log) }));

    sim.install(a, Box::new(router_a));
    sim.install(b, Box::new(router_b));

    sim.schedule_stop(30.0).unwrap();
    sim.start().unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 10);

    // The last packet leaves the egress 10 * 8 ms after the burst.
    let last = log.last().unwrap().0;
    assert!(
        (0.0795..0.0825).contains(&(last - 5.0)),
        "last arrival {last} not ~5.080"
    );

    // Inter-arrival spacing never beats the class rate.
    for pair in log.windows(2) {
        let gap = pair[1].0 - pair[0].0;
        assert!(gap >= 0.0079, "arrival gap {gap} beats the 8 ms service time");
    }
}

/// Manual host attachment mirroring `Network::attach_host`, with a
/// FIFO egress on the router side.
fn attach_host(
    sim: &mut Simulation,
    router: &mut Router,
    name: &str,
    behavior: Box<dyn gridsim_engine::entity::Entity>,
) -> gridsim_types::id::EntityId {
    let entity = sim.reserve(name).unwrap();
    let input = sim.reserve(&format!("Input_{name}")).unwrap();
    let output = sim.reserve(&format!("Output_{name}")).unwrap();
    let link_name = format!("{name}_link");
    let link_id = sim.reserve(&link_name).unwrap();
    let link = LinkRef::new(link_id, link_name, 1e9, 0.001, 1_500).unwrap();

    router
        .attach_host(
            name,
            &link,
            SchedulerKind::Fifo(FifoScheduler::new(
                format!("sched_{}_{name}", router.name()),
                router.id(),
            )),
        )
        .unwrap();

    sim.install(
        link_id,
        Box::new(SimpleLink::new(
            &link,
            LinkEnds {
                end1_input: input,
                end1_output: output,
                end2_input: router.id(),
                end2_output: router.id(),
            },
        )),
    );
    sim.install(
        output,
        Box::new(Output::new(output, entity, 1e9, Some(link), TransportMode::Packet).unwrap()),
    );
    sim.install(input, Box::new(Input::new(input, entity, name, 1e9).unwrap()));
    sim.install(entity, behavior);
    sim.add_port(entity, "input", input).unwrap();
    sim.add_port(entity, "output", output).unwrap();
    entity
}
