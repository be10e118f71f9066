//! # gridsim-types::tags
//!
//! The closed set of event tags used to dispatch behavior. Every tag
//! has a stable numeric code; the advance-reservation tags occupy the
//! reserved range starting at [`RESERVATION_TAG_BASE`].

use serde::{Deserialize, Serialize};

/// First numeric code of the reservation tag range.
pub const RESERVATION_TAG_BASE: i32 = 5000;

/// Dispatch tag carried by every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// Broadcast to all entities when the simulation is shutting down.
    EndOfSimulation,
    /// A link announces itself to the registry.
    RegisterLink,
    /// A resource announces itself to the registry.
    RegisterResource,
    /// A reservation-capable resource announces itself.
    RegisterResourceAr,
    /// Immediate internal delivery.
    ScheduleNow,
    /// Internal wake-up with no semantic content (pause completion).
    Insignificant,
    /// Application data handed to an Output port.
    SendPacket,
    /// A packet in transit between network elements.
    PktForward,
    /// Background-traffic packet; dropped at the destination Input.
    JunkPkt,
    /// A fragment carrying no payload (all but the last of a series).
    EmptyPkt,
    /// An outbound probe on its way to the target.
    InfopktSubmit,
    /// A probe bounced back toward its origin.
    InfopktReturn,
    /// A packet handed to an egress scheduler.
    SchedulerEnque,
    /// An egress scheduler releasing a packet to its router.
    SchedulerDeque,
    /// Distance-vector routing advertisement.
    RouterAd,

    // Flow transport.
    /// Admission of a new flow into the network.
    FlowSubmit,
    /// Forecast completion timer for an active flow.
    FlowHold,
    /// A link notifying a flow's destination that its share changed.
    FlowUpdate,
    /// Destination refreshing a link's per-flow bookkeeping record.
    FlowSync,
    /// Destination deregistering a completed flow from a link.
    FlowRelease,

    // Internal timing of links and schedulers.
    /// Propagation-delay wake-up of a link.
    LinkWakeup,
    /// Rate-controlled sub-queue drain timer.
    RateDrain,

    // Allocation-policy interface.
    GridletSubmit,
    GridletSubmitAck,
    GridletReturn,
    GridletStatus,
    GridletPause,
    GridletPauseAck,
    GridletResume,
    GridletResumeAck,
    GridletMove,
    GridletMoveAck,
    GridletCancel,

    // Advance-reservation range (codes >= RESERVATION_TAG_BASE).
    ReservationCreate,
    ReservationCancel,
    ReservationModify,
    ReservationStatus,
    ReservationCommit,
    ReservationListFreeTime,
}

impl Tag {
    /// Stable numeric code of the tag.
    pub fn code(self) -> i32 {
        match self {
            Tag::EndOfSimulation => -1,
            Tag::RegisterLink => 1,
            Tag::RegisterResource => 2,
            Tag::RegisterResourceAr => 3,
            Tag::ScheduleNow => 4,
            Tag::Insignificant => 5,
            Tag::SendPacket => 6,
            Tag::PktForward => 10,
            Tag::JunkPkt => 11,
            Tag::EmptyPkt => 12,
            Tag::InfopktSubmit => 13,
            Tag::InfopktReturn => 14,
            Tag::SchedulerEnque => 15,
            Tag::SchedulerDeque => 16,
            Tag::RouterAd => 17,
            Tag::FlowSubmit => 20,
            Tag::FlowHold => 21,
            Tag::FlowUpdate => 22,
            Tag::FlowSync => 23,
            Tag::FlowRelease => 24,
            Tag::LinkWakeup => 30,
            Tag::RateDrain => 31,
            Tag::GridletSubmit => 40,
            Tag::GridletSubmitAck => 41,
            Tag::GridletReturn => 42,
            Tag::GridletStatus => 43,
            Tag::GridletPause => 44,
            Tag::GridletPauseAck => 45,
            Tag::GridletResume => 46,
            Tag::GridletResumeAck => 47,
            Tag::GridletMove => 48,
            Tag::GridletMoveAck => 49,
            Tag::GridletCancel => 50,
            Tag::ReservationCreate => RESERVATION_TAG_BASE,
            Tag::ReservationCancel => RESERVATION_TAG_BASE + 1,
            Tag::ReservationModify => RESERVATION_TAG_BASE + 2,
            Tag::ReservationStatus => RESERVATION_TAG_BASE + 3,
            Tag::ReservationCommit => RESERVATION_TAG_BASE + 4,
            Tag::ReservationListFreeTime => RESERVATION_TAG_BASE + 5,
        }
    }

    /// True for tags in the advance-reservation range.
    pub fn is_reservation(self) -> bool {
        self.code() >= RESERVATION_TAG_BASE
    }
}
