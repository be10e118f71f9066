//! # gridsim-types::reservation
//!
//! Advance-reservation records and the wire message exchanged with a
//! reservation-capable allocation policy.

use crate::{
    id::{EntityId, ReservationId},
    time::SimTime,
};
use serde::{Deserialize, Serialize};

/// Lifecycle of an advance reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Unknown,
    NotCommitted,
    Committed,
    InProgress,
    Finished,
    Expired,
    Cancelled,
    Failed,
}

/// An agreement to allocate `num_units` resource units for the window
/// `[start_time, start_time + duration)`.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: ReservationId,
    pub user_id: EntityId,
    pub resource_id: EntityId,
    pub start_time: SimTime,
    pub duration: SimTime,
    pub num_units: u32,
    pub status: ReservationStatus,
    pub submission_time: SimTime,
    /// Free-form policy options, if any.
    pub options: Option<String>,
}

/// Error codes a reservation-capable policy answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationError {
    NoError,
    OperationFailure,
    InvalidStartTime,
    InvalidDuration,
    InvalidNumUnits,
    NoSuchReservation,
    CannotCommit,
}

/// Reply message for every operation in the reservation tag range.
#[derive(Debug, Clone)]
pub struct ReservationMessage {
    pub reservation_id: ReservationId,
    pub status: ReservationStatus,
    pub error: ReservationError,
}
