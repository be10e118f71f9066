//! # gridsim-engine::entity
//!
//! The entity runtime. Behavior is a trait driven by the kernel; the
//! per-entity record holds the lifecycle state, the deferred queue of
//! delivered-but-unconsumed events, the current receive filter, and
//! the named ports used for symbolic send-to-port addressing.

use crate::{event::Event, sim::Ctx};
use fxhash::FxHashMap;
use gridsim_types::{errors::SimError, id::EntityId, tags::Tag};
use std::collections::VecDeque;

/// Lifecycle state of a simulation entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    New,
    Running,
    Finished,
}

/// Predicate over events used for selective receive.
pub type ReceiveFilter = Box<dyn Fn(&Event) -> bool>;

/// Behavior of a simulation entity, stepped by the kernel.
///
/// Entities run one at a time in event-delivery order; an entity only
/// yields control by returning from one of these methods. Suspension
/// between events is expressed with `Ctx::select` and `Ctx::pause`.
/// The `Any` supertrait lets callers downcast a registered behavior to
/// its concrete type, e.g. to inspect router tables after a run.
pub trait Entity: std::any::Any {
    /// Called once when the simulation starts, before any event.
    fn on_start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
        let _ = ctx;
        Ok(())
    }

    /// Called for every event dispatched to this entity.
    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError>;

    /// Called once after the event loop ends; flush trace files here.
    fn at_end(&mut self, ctx: &mut Ctx<'_>) {
        let _ = ctx;
    }
}

/// Kernel-side record for one registered entity.
pub(crate) struct EntityRecord {
    pub id: EntityId,
    pub name: String,
    pub state: EntityState,
    pub deferred: VecDeque<Event>,
    pub filter: Option<ReceiveFilter>,
    pub ports: FxHashMap<String, EntityId>,
    /// Taken out while the behavior is being stepped.
    pub behavior: Option<Box<dyn Entity>>,
}

impl EntityRecord {
    pub fn new(id: EntityId, name: String) -> Self {
        Self {
            id,
            name,
            state: EntityState::New,
            deferred: VecDeque::new(),
            filter: None,
            ports: FxHashMap::default(),
            behavior: None,
        }
    }

    /// Index of the first deferred event the current filter lets
    /// through. `END_OF_SIMULATION` always passes. Non-matching events
    /// stay in place and keep their order.
    pub fn dispatchable(&self) -> Option<usize> {
        match &self.filter {
            None => {
                if self.deferred.is_empty() {
                    None
                } else {
                    Some(0)
                }
            }
            Some(f) => self
                .deferred
                .iter()
                .position(|e| e.tag == Tag::EndOfSimulation || f(e)),
        }
    }
}
