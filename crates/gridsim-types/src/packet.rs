//! # gridsim-types::packet
//!
//! Packet records exchanged by the network layer: the common header,
//! the three concrete packet kinds, and the application-level
//! `DataEnvelope` that Output ports turn into packet series.

use crate::{
    id::{EntityId, FlowId, PacketId, ServiceClass},
    tags::Tag,
    time::SimTime,
};
use bytes::Bytes;
use indexmap::IndexMap;

/// Fields every packet kind carries.
#[derive(Debug, Clone)]
pub struct PacketHeader {
    pub id: PacketId,
    pub src: EntityId,
    pub dst: EntityId,
    /// The entity that most recently held the packet; links use it to
    /// pick the forwarding direction.
    pub last_hop: EntityId,
    pub size_bytes: u64,
    pub class: ServiceClass,
    /// The application-level tag delivered with the reassembled data.
    pub tag: Tag,
}

/// Application data handed to an Output port for transmission.
#[derive(Debug, Clone)]
pub struct DataEnvelope {
    pub data: Bytes,
    pub byte_size: u64,
    pub dst: EntityId,
    pub class: ServiceClass,
    pub tag: Tag,
    /// Effective baud for linkless direct delivery; stamped by the
    /// sending Output as `min(sender_baud, receiver_baud)`.
    pub direct_baud: Option<f64>,
}

/// An ordinary data packet, possibly one fragment of a series.
#[derive(Debug, Clone)]
pub struct DataPacket {
    pub header: PacketHeader,
    /// 1-based position in the fragment series.
    pub seq_no: u32,
    pub total_in_stream: u32,
    /// Only the last fragment of a series carries the payload.
    pub payload: Option<DataEnvelope>,
}

/// A diagnostic packet accumulating per-hop statistics on its path.
#[derive(Debug, Clone)]
pub struct ProbePacket {
    pub header: PacketHeader,
    pub hop_ids: Vec<EntityId>,
    pub entry_times: Vec<SimTime>,
    pub exit_times: Vec<SimTime>,
    pub baud_rates: Vec<f64>,
    /// Minimum baud rate observed so far.
    pub bottleneck_bps: f64,
}

impl ProbePacket {
    pub fn new(header: PacketHeader) -> Self {
        Self {
            header,
            hop_ids: Vec::new(),
            entry_times: Vec::new(),
            exit_times: Vec::new(),
            baud_rates: Vec::new(),
            bottleneck_bps: f64::INFINITY,
        }
    }

    /// Records entry into a hop.
    pub fn record_entry(&mut self, hop: EntityId, at: SimTime) {
        self.hop_ids.push(hop);
        self.entry_times.push(at);
    }

    pub fn record_exit(&mut self, at: SimTime) {
        self.exit_times.push(at);
    }

    /// Records the baud rate seen at a hop and folds it into the
    /// running bottleneck.
    pub fn record_baud(&mut self, bps: f64) {
        self.baud_rates.push(bps);
        if bps < self.bottleneck_bps {
            self.bottleneck_bps = bps;
        }
    }

    /// Number of links crossed per direction of a round trip, derived
    /// from the per-router baud samples (one per router traversal).
    pub fn hops(&self) -> usize {
        (self.baud_rates.len() / 2).saturating_sub(1)
    }
}

/// An admission-controlled analytic flow. The packet carries the whole
/// transfer; its forecast completion is revised as shares change.
#[derive(Debug, Clone)]
pub struct FlowPacket {
    pub header: PacketHeader,
    pub flow_id: FlowId,
    pub remaining_bytes: f64,
    pub start_time: SimTime,
    pub last_update_time: SimTime,
    /// Smallest per-flow fair share over the traversed links.
    pub bottleneck_bps: f64,
    pub bottleneck_link: Option<EntityId>,
    /// Fair share recorded per traversed link, in traversal order.
    pub link_shares: IndexMap<EntityId, f64>,
    /// Accumulated propagation latency.
    pub latency: SimTime,
    pub payload: Option<DataEnvelope>,
}

impl FlowPacket {
    /// Records this link's fair share and folds it into the bottleneck.
    pub fn record_share(&mut self, link: EntityId, share_bps: f64) {
        self.link_shares.insert(link, share_bps);
        if share_bps < self.bottleneck_bps {
            self.bottleneck_bps = share_bps;
            self.bottleneck_link = Some(link);
        }
    }

    /// Links traversed, in order.
    pub fn links(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.link_shares.keys().copied()
    }
}

/// The tagged union of all packet kinds.
#[derive(Debug, Clone)]
pub enum Packet {
    Data(DataPacket),
    Probe(ProbePacket),
    Flow(FlowPacket),
}

impl Packet {
    pub fn header(&self) -> &PacketHeader {
        match self {
            Packet::Data(p) => &p.header,
            Packet::Probe(p) => &p.header,
            Packet::Flow(p) => &p.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut PacketHeader {
        match self {
            Packet::Data(p) => &mut p.header,
            Packet::Probe(p) => &mut p.header,
            Packet::Flow(p) => &mut p.header,
        }
    }

    pub fn id(&self) -> PacketId {
        self.header().id
    }

    pub fn size_bytes(&self) -> u64 {
        self.header().size_bytes
    }

    pub fn dst(&self) -> EntityId {
        self.header().dst
    }

    pub fn is_flow(&self) -> bool {
        matches!(self, Packet::Flow(_))
    }

    /// Event tag a network element should forward this packet under:
    /// junk keeps its tag, everything else travels as `PKT_FORWARD`.
    pub fn forward_tag(&self) -> Tag {
        if self.header().tag == Tag::JunkPkt {
            Tag::JunkPkt
        } else {
            Tag::PktForward
        }
    }
}
