//! # gridsim-types::id
//!
//! Core identifier types. Distinct aliases keep the different id spaces
//! from being mixed up at call sites.

/// A unique identifier for a simulation entity.
/// Invariant: ids are dense, assigned in registration order from 0.
pub type EntityId = u32;

/// A unique identifier for a scheduled event in the future-event queue.
pub type EventId = u64;

/// A unique identifier for a packet. Fragments of one packet share it.
pub type PacketId = u64;

/// A unique identifier for an admitted network flow.
pub type FlowId = u64;

/// A unique, process-wide identifier for an advance reservation.
pub type ReservationId = u64;

/// Index into a scheduler's per-class weight or rate vector.
pub type ServiceClass = usize;
