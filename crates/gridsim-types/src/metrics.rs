//! # gridsim-types::metrics
//!
//! Metric and label name constants shared by the workspace.

pub const MET_EVENTS_DISPATCHED: &str = "gridsim_events_dispatched";
pub const MET_EVENTS_CANCELLED: &str = "gridsim_events_cancelled";
pub const MET_EVENTS_DROPPED: &str = "gridsim_events_dropped";
pub const MET_PKT_FORWARDED: &str = "gridsim_packets_forwarded";
pub const MET_PKT_DROPPED: &str = "gridsim_packets_dropped";
pub const MET_JUNK_DROPPED: &str = "gridsim_junk_dropped";

pub const LBL_ENTITY: &str = "entity";
pub const LBL_REASON: &str = "reason";
