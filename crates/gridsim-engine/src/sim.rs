//! # gridsim-engine::sim
//!
//! The `Simulation` kernel: master clock, future-event queue, entity
//! registry and dispatch loop. Entities are stepped cooperatively, one
//! at a time, in `(delivery_time, enqueue_sequence)` order; all
//! cross-entity communication goes through `schedule`.

use crate::{
    entity::{Entity, EntityRecord, EntityState, ReceiveFilter},
    event::{Event, Queued},
    ids::IdGen,
};
use fxhash::{FxHashMap, FxHashSet};
use gridsim_types::{
    errors::{ConfigError, SimError},
    id::{EntityId, EventId, FlowId, PacketId, ReservationId},
    metrics::{MET_EVENTS_CANCELLED, MET_EVENTS_DISPATCHED, MET_EVENTS_DROPPED},
    payload::Payload,
    tags::Tag,
    time::{SimTime, SIM_EPOCH},
};
use std::collections::BinaryHeap;
use std::time::Instant;

/// The process-wide simulation context. Owns the clock, the future
/// queue, every entity, and all monotonic id counters.
pub struct Simulation {
    clock: SimTime,
    queue: BinaryHeap<Queued>,
    /// Ids removed by selective cancel; skipped when popped.
    cancelled: FxHashSet<EventId>,
    entities: Vec<EntityRecord>,
    names: FxHashMap<String, EntityId>,
    ids: IdGen,
    started: bool,
    finished_count: usize,
    /// Wall-clock reference recorded when the run starts.
    wall_start: Option<Instant>,
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            clock: SIM_EPOCH,
            queue: BinaryHeap::new(),
            cancelled: FxHashSet::default(),
            entities: Vec::new(),
            names: FxHashMap::default(),
            ids: IdGen::new(),
            started: false,
            finished_count: 0,
            wall_start: None,
        }
    }

    /// Registers an entity and installs its behavior in one step.
    pub fn add_entity(
        &mut self,
        name: &str,
        behavior: Box<dyn Entity>,
    ) -> Result<EntityId, ConfigError> {
        let id = self.reserve(name)?;
        self.install(id, behavior);
        Ok(id)
    }

    /// Reserves a dense id and name for an entity whose behavior is
    /// installed later. Wiring code uses this to resolve mutual
    /// references (router <-> link) before construction.
    pub fn reserve(&mut self, name: &str) -> Result<EntityId, ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.names.contains_key(name) {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }
        let id = self.entities.len() as EntityId;
        self.entities.push(EntityRecord::new(id, name.to_string()));
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Installs the behavior for a previously reserved entity.
    pub fn install(&mut self, id: EntityId, behavior: Box<dyn Entity>) {
        self.entities[id as usize].behavior = Some(behavior);
    }

    /// Binds a named port of `owner` to `target`, enabling symbolic
    /// send-to-port addressing.
    pub fn add_port(
        &mut self,
        owner: EntityId,
        port: &str,
        target: EntityId,
    ) -> Result<(), SimError> {
        let rec = self
            .entities
            .get_mut(owner as usize)
            .ok_or(SimError::UnknownEntity(owner))?;
        rec.ports.insert(port.to_string(), target);
        Ok(())
    }

    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    pub fn entity_name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(id as usize).map(|r| r.name.as_str())
    }

    pub fn entity_state(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(id as usize).map(|r| r.state)
    }

    /// Borrows a registered behavior as its concrete type.
    pub fn behavior_of<T: Entity>(&self, id: EntityId) -> Option<&T> {
        let behavior = self.entities.get(id as usize)?.behavior.as_deref()?;
        (behavior as &dyn std::any::Any).downcast_ref::<T>()
    }

    /// Mutably borrows a registered behavior as its concrete type,
    /// e.g. to configure a port between wiring and `start`.
    pub fn behavior_mut_of<T: Entity>(&mut self, id: EntityId) -> Option<&mut T> {
        let behavior = self.entities.get_mut(id as usize)?.behavior.as_deref_mut()?;
        (behavior as &mut dyn std::any::Any).downcast_mut::<T>()
    }

    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Wall-clock time spent since `start` was called.
    pub fn wall_elapsed(&self) -> Option<std::time::Duration> {
        self.wall_start.map(|t| t.elapsed())
    }

    /// Enqueues an event for delivery at `clock + delay`. Zero delay is
    /// same-instant delivery, ordered after earlier same-instant
    /// enqueues. Unknown destinations and negative delays are fatal.
    pub fn schedule(
        &mut self,
        src: EntityId,
        dst: EntityId,
        delay: SimTime,
        tag: Tag,
        payload: Payload,
    ) -> Result<EventId, SimError> {
        if delay < 0.0 || !delay.is_finite() {
            return Err(SimError::NegativeDelay(delay));
        }
        if dst as usize >= self.entities.len() {
            return Err(SimError::UnknownEntity(dst));
        }
        let id = self.ids.next_event_id();
        let event = Event {
            id,
            src,
            dst,
            time: self.clock + delay,
            tag,
            payload,
        };
        let seq = self.ids.next_insertion_seq();
        self.queue.push(Queued { seq, event });
        Ok(id)
    }

    /// Removes every future event destined to `dst` that matches the
    /// predicate. Returns the count removed.
    pub fn cancel_matching<F>(&mut self, dst: EntityId, pred: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        let mut n = 0;
        for q in self.queue.iter() {
            if q.event.dst == dst && !self.cancelled.contains(&q.event.id) && pred(&q.event) {
                self.cancelled.insert(q.event.id);
                n += 1;
            }
        }
        metrics::counter!(MET_EVENTS_CANCELLED).increment(n as u64);
        n
    }

    /// Schedules an `END_OF_SIMULATION` broadcast to every entity at
    /// absolute time `at` (which must not be in the past).
    pub fn schedule_stop(&mut self, at: SimTime) -> Result<(), SimError> {
        let delay = at - self.clock;
        for id in 0..self.entities.len() as EntityId {
            self.schedule(id, id, delay, Tag::EndOfSimulation, Payload::Empty)?;
        }
        Ok(())
    }

    /// Runs the event loop until the future queue drains or every
    /// entity has finished. Returns the final clock value.
    pub fn start(&mut self) -> Result<SimTime, SimError> {
        if self.started {
            return Err(SimError::AlreadyStarted);
        }
        self.started = true;
        self.wall_start = Some(Instant::now());

        for rec in &self.entities {
            if rec.behavior.is_none() {
                return Err(SimError::MissingBehavior(rec.id));
            }
        }

        // NEW -> RUNNING, then give each entity its startup step.
        for id in 0..self.entities.len() as EntityId {
            self.entities[id as usize].state = EntityState::Running;
        }
        for id in 0..self.entities.len() as EntityId {
            let mut behavior = self.entities[id as usize].behavior.take().expect("installed");
            let mut ctx = Ctx { sim: self, current: id };
            let res = behavior.on_start(&mut ctx);
            self.entities[id as usize].behavior = Some(behavior);
            res?;
        }

        while let Some(q) = self.pop_next() {
            let ev = q.event;
            if ev.time < self.clock {
                return Err(SimError::TimeRegression {
                    clock: self.clock,
                    event_time: ev.time,
                });
            }
            self.clock = ev.time;
            metrics::counter!(MET_EVENTS_DISPATCHED).increment(1);
            self.deliver(ev)?;
            if self.finished_count == self.entities.len() {
                break;
            }
        }

        for id in 0..self.entities.len() as EntityId {
            let mut behavior = self.entities[id as usize].behavior.take().expect("installed");
            let mut ctx = Ctx { sim: self, current: id };
            behavior.at_end(&mut ctx);
            self.entities[id as usize].behavior = Some(behavior);
        }
        tracing::info!(clock = self.clock, "simulation finished");
        Ok(self.clock)
    }

    /// Pops the next live event, skipping selectively cancelled ones.
    fn pop_next(&mut self) -> Option<Queued> {
        while let Some(q) = self.queue.pop() {
            if self.cancelled.remove(&q.event.id) {
                continue;
            }
            return Some(q);
        }
        None
    }

    /// Routes an event to its destination's deferred queue and lets the
    /// destination progress.
    fn deliver(&mut self, ev: Event) -> Result<(), SimError> {
        let dst = ev.dst;
        let rec = &mut self.entities[dst as usize];
        if rec.state == EntityState::Finished {
            tracing::warn!(entity = dst, tag = ?ev.tag, "event to finished entity dropped");
            metrics::counter!(MET_EVENTS_DROPPED).increment(1);
            return Ok(());
        }
        rec.deferred.push_back(ev);
        self.step_entity(dst)
    }

    /// Dispatches deferred events to `id` until its filter defers the
    /// rest (or the queue empties, or the entity finishes).
    fn step_entity(&mut self, id: EntityId) -> Result<(), SimError> {
        loop {
            let rec = &mut self.entities[id as usize];
            if rec.state == EntityState::Finished {
                if !rec.deferred.is_empty() {
                    tracing::warn!(
                        entity = id,
                        count = rec.deferred.len(),
                        "dropping deferred events of finished entity"
                    );
                    metrics::counter!(MET_EVENTS_DROPPED).increment(rec.deferred.len() as u64);
                    rec.deferred.clear();
                }
                return Ok(());
            }
            let Some(idx) = rec.dispatchable() else {
                return Ok(());
            };
            let ev = rec.deferred.remove(idx).expect("index in range");
            // A filter admits exactly one event; re-arm explicitly.
            rec.filter = None;
            let mut behavior = rec.behavior.take().expect("installed");
            let mut ctx = Ctx { sim: self, current: id };
            let res = behavior.on_event(&mut ctx, ev);
            self.entities[id as usize].behavior = Some(behavior);
            res?;
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

/// Context handed to entity behavior while it holds the dispatch turn.
pub struct Ctx<'a> {
    pub(crate) sim: &'a mut Simulation,
    pub(crate) current: EntityId,
}

impl Ctx<'_> {
    pub fn me(&self) -> EntityId {
        self.current
    }

    pub fn now(&self) -> SimTime {
        self.sim.clock
    }

    pub fn my_name(&self) -> &str {
        &self.sim.entities[self.current as usize].name
    }

    pub fn name_of(&self, id: EntityId) -> Option<&str> {
        self.sim.entity_name(id)
    }

    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        self.sim.entity_by_name(name)
    }

    pub fn schedule(
        &mut self,
        dst: EntityId,
        delay: SimTime,
        tag: Tag,
        payload: Payload,
    ) -> Result<EventId, SimError> {
        self.sim.schedule(self.current, dst, delay, tag, payload)
    }

    pub fn schedule_self(
        &mut self,
        delay: SimTime,
        tag: Tag,
        payload: Payload,
    ) -> Result<EventId, SimError> {
        self.schedule(self.current, delay, tag, payload)
    }

    /// Schedules through one of the caller's named ports.
    pub fn send_to_port(
        &mut self,
        port: &str,
        delay: SimTime,
        tag: Tag,
        payload: Payload,
    ) -> Result<EventId, SimError> {
        let target = self.sim.entities[self.current as usize]
            .ports
            .get(port)
            .copied()
            .ok_or_else(|| SimError::UnknownPort {
                entity: self.current,
                port: port.to_string(),
            })?;
        self.schedule(target, delay, tag, payload)
    }

    pub fn port(&self, port: &str) -> Option<EntityId> {
        self.sim.entities[self.current as usize].ports.get(port).copied()
    }

    /// Suspends the caller for `delta` simulated seconds: events
    /// arriving in the meantime stay deferred until the wake-up.
    pub fn pause(&mut self, delta: SimTime) -> Result<(), SimError> {
        let wake = self.schedule_self(delta, Tag::Insignificant, Payload::Empty)?;
        self.sim.entities[self.current as usize].filter =
            Some(Box::new(move |e: &Event| e.id == wake));
        Ok(())
    }

    /// Selective receive: only events matching `pred` (or the
    /// end-of-simulation broadcast) are dispatched; everything else
    /// waits in the deferred queue in arrival order. The filter admits
    /// one event and is then cleared.
    pub fn select<F>(&mut self, pred: F)
    where
        F: Fn(&Event) -> bool + 'static,
    {
        self.sim.entities[self.current as usize].filter = Some(Box::new(pred) as ReceiveFilter);
    }

    /// Cancels the caller's pending future events matching `pred`.
    pub fn cancel_matching<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        self.sim.cancel_matching(self.current, pred)
    }

    /// Marks the caller finished; events arriving after this are
    /// dropped with a warning.
    pub fn finish(&mut self) {
        let rec = &mut self.sim.entities[self.current as usize];
        if rec.state != EntityState::Finished {
            rec.state = EntityState::Finished;
            self.sim.finished_count += 1;
        }
    }

    /// Broadcasts `END_OF_SIMULATION` to every running entity at the
    /// current instant.
    pub fn end_simulation(&mut self) -> Result<(), SimError> {
        for id in 0..self.sim.entities.len() as EntityId {
            if self.sim.entities[id as usize].state == EntityState::Running {
                self.sim
                    .schedule(self.current, id, 0.0, Tag::EndOfSimulation, Payload::Empty)?;
            }
        }
        Ok(())
    }

    pub fn next_packet_id(&mut self) -> PacketId {
        self.sim.ids.next_packet_id()
    }

    pub fn next_flow_id(&mut self) -> FlowId {
        self.sim.ids.next_flow_id()
    }

    pub fn next_reservation_id(&mut self) -> ReservationId {
        self.sim.ids.next_reservation_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(SimTime, u64)>>>;

    /// Records every event it sees as (time, marker).
    struct Recorder {
        log: Log,
    }

    impl Entity for Recorder {
        fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
            if ev.tag == Tag::EndOfSimulation {
                ctx.finish();
                return Ok(());
            }
            let marker = ev.payload.as_object().unwrap_or(u64::MAX);
            self.log.borrow_mut().push((ctx.now(), marker));
            Ok(())
        }
    }

    struct Idle;
    impl Entity for Idle {
        fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
            if ev.tag == Tag::EndOfSimulation {
                ctx.finish();
            }
            Ok(())
        }
    }

    #[test]
    fn clock_is_monotone_and_ties_break_fifo() {
        let mut sim = Simulation::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let r = sim
            .add_entity("recorder", Box::new(Recorder { log: Rc::clone(&log) }))
            .unwrap();

        // Deliberately scheduled out of order; b and c share an instant.
        sim.schedule(r, r, 2.0, Tag::ScheduleNow, Payload::Object(3)).unwrap();
        sim.schedule(r, r, 1.0, Tag::ScheduleNow, Payload::Object(1)).unwrap();
        sim.schedule(r, r, 1.0, Tag::ScheduleNow, Payload::Object(2)).unwrap();
        sim.start().unwrap();

        let seen = log.borrow();
        assert_eq!(
            seen.as_slice(),
            &[(1.0, 1), (1.0, 2), (2.0, 3)],
            "delivery order must be (time, enqueue sequence)"
        );
    }

    #[test]
    fn zero_delay_orders_after_earlier_same_instant_events() {
        let mut sim = Simulation::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let r = sim
            .add_entity("recorder", Box::new(Recorder { log: Rc::clone(&log) }))
            .unwrap();
        sim.schedule(r, r, 0.0, Tag::ScheduleNow, Payload::Object(1)).unwrap();
        sim.schedule(r, r, 0.0, Tag::ScheduleNow, Payload::Object(2)).unwrap();
        sim.start().unwrap();
        assert_eq!(log.borrow().as_slice(), &[(0.0, 1), (0.0, 2)]);
    }

    /// Waits for marker 7 first, then drains the rest in order.
    struct Chooser {
        log: Log,
    }

    impl Entity for Chooser {
        fn on_start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
            ctx.select(|e| e.payload.as_object() == Some(7));
            Ok(())
        }

        fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
            let marker = ev.payload.as_object().unwrap_or(u64::MAX);
            self.log.borrow_mut().push((ctx.now(), marker));
            Ok(())
        }
    }

    #[test]
    fn selective_receive_preserves_deferred_order() {
        let mut sim = Simulation::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let c = sim
            .add_entity("chooser", Box::new(Chooser { log: Rc::clone(&log) }))
            .unwrap();
        sim.schedule(c, c, 1.0, Tag::ScheduleNow, Payload::Object(5)).unwrap();
        sim.schedule(c, c, 2.0, Tag::ScheduleNow, Payload::Object(6)).unwrap();
        sim.schedule(c, c, 3.0, Tag::ScheduleNow, Payload::Object(7)).unwrap();
        sim.start().unwrap();

        // 7 is matched first; 5 and 6 then drain in arrival order.
        let seen = log.borrow();
        assert_eq!(seen[0].1, 7);
        assert_eq!(seen[1].1, 5);
        assert_eq!(seen[2].1, 6);
    }

    #[test]
    fn selective_cancel_removes_and_counts() {
        let mut sim = Simulation::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let r = sim
            .add_entity("recorder", Box::new(Recorder { log: Rc::clone(&log) }))
            .unwrap();
        sim.schedule(r, r, 1.0, Tag::FlowHold, Payload::Object(1)).unwrap();
        sim.schedule(r, r, 2.0, Tag::FlowHold, Payload::Object(2)).unwrap();
        sim.schedule(r, r, 3.0, Tag::ScheduleNow, Payload::Object(3)).unwrap();

        let n = sim.cancel_matching(r, |e| e.tag == Tag::FlowHold);
        assert_eq!(n, 2);
        sim.start().unwrap();
        let seen = log.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, 3);
    }

    #[test]
    fn schedule_to_unknown_entity_is_fatal() {
        let mut sim = Simulation::new();
        let err = sim
            .schedule(0, 99, 1.0, Tag::ScheduleNow, Payload::Empty)
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownEntity(99)));
    }

    #[test]
    fn double_start_is_rejected() {
        let mut sim = Simulation::new();
        sim.add_entity("idle", Box::new(Idle)).unwrap();
        sim.start().unwrap();
        assert!(matches!(sim.start(), Err(SimError::AlreadyStarted)));
    }

    /// Finishes on the first event.
    struct OneShot;
    impl Entity for OneShot {
        fn on_event(&mut self, ctx: &mut Ctx<'_>, _ev: Event) -> Result<(), SimError> {
            ctx.finish();
            Ok(())
        }
    }

    #[test]
    fn events_after_finish_are_dropped() {
        let mut sim = Simulation::new();
        let a = sim.add_entity("oneshot", Box::new(OneShot)).unwrap();
        // A second, never-finishing entity keeps the loop draining.
        sim.add_entity("idle", Box::new(Idle)).unwrap();
        sim.schedule(a, a, 1.0, Tag::ScheduleNow, Payload::Empty).unwrap();
        sim.schedule(a, a, 2.0, Tag::ScheduleNow, Payload::Empty).unwrap();
        // The second event hits a finished entity and is dropped with a
        // warning; the run still drains to t=2.
        let end = sim.start().unwrap();
        assert_eq!(end, 2.0);
    }

    #[test]
    fn run_ends_when_all_entities_finish() {
        let mut sim = Simulation::new();
        let a = sim.add_entity("oneshot", Box::new(OneShot)).unwrap();
        sim.schedule(a, a, 1.0, Tag::ScheduleNow, Payload::Empty).unwrap();
        sim.schedule(a, a, 2.0, Tag::ScheduleNow, Payload::Empty).unwrap();
        // The loop stops as soon as every entity is finished, before
        // the t=2 event is dispatched.
        let end = sim.start().unwrap();
        assert_eq!(end, 1.0);
    }

    /// Pauses for 5 s at startup, recording when the wake-up lands.
    struct Sleeper {
        log: Log,
    }

    impl Entity for Sleeper {
        fn on_start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
            ctx.pause(5.0)
        }

        fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
            let marker = ev.payload.as_object().unwrap_or(0);
            self.log.borrow_mut().push((ctx.now(), marker));
            Ok(())
        }
    }

    #[test]
    fn pause_defers_intervening_events() {
        let mut sim = Simulation::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let s = sim
            .add_entity("sleeper", Box::new(Sleeper { log: Rc::clone(&log) }))
            .unwrap();
        sim.schedule(s, s, 1.0, Tag::ScheduleNow, Payload::Object(9)).unwrap();
        sim.start().unwrap();

        let seen = log.borrow();
        // Wake-up (marker 0, at t=5) is handled before the deferred event.
        assert_eq!(seen[0], (5.0, 0));
        assert_eq!(seen[1], (5.0, 9));
    }
}
