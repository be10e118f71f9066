//! # gridsim-types::payload
//!
//! The owned payload variant carried by every event. Downstream
//! dispatch matches on the event tag first and the payload second;
//! payloads are owned by the event until delivery.

use crate::{
    gridlet::Gridlet,
    id::{EntityId, FlowId, ServiceClass},
    packet::{DataEnvelope, Packet},
    reservation::ReservationMessage,
};

/// A distance-vector routing advertisement.
#[derive(Debug, Clone)]
pub struct RouterAd {
    /// Name of the router this ad was (re-)flooded from.
    pub sender: String,
    /// Host names advertised.
    pub hosts: Vec<String>,
    pub hop_count: u32,
}

/// Flow-control notification between a link and a flow's destination.
#[derive(Debug, Clone, Copy)]
pub struct FlowNotice {
    pub flow: FlowId,
    pub link: EntityId,
    /// For `FLOW_UPDATE`: the link's new per-flow fair share.
    /// For `FLOW_SYNC`: the flow's current bottleneck rate.
    pub effective_bps: f64,
}

/// A self-event driving one egress scheduler of a router.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOp {
    pub link: EntityId,
    pub class: ServiceClass,
}

/// Payloads understood by the allocation-policy interface.
#[derive(Debug, Clone)]
pub enum PolicyPayload {
    Gridlet(Box<Gridlet>),
    GridletId(u64),
}

/// The owned datum attached to an event.
#[derive(Debug, Clone)]
pub enum Payload {
    Empty,
    Packet(Box<Packet>),
    Envelope(DataEnvelope),
    /// A bare integer id (flow ids, handles).
    Object(u64),
    RouterAd(RouterAd),
    FlowCtl(FlowNotice),
    Scheduler(SchedulerOp),
    Policy(PolicyPayload),
    Reservation(ReservationMessage),
}

impl Payload {
    pub fn as_packet(&self) -> Option<&Packet> {
        match self {
            Payload::Packet(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_packet(self) -> Option<Packet> {
        match self {
            Payload::Packet(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<u64> {
        match self {
            Payload::Object(v) => Some(*v),
            _ => None,
        }
    }
}
