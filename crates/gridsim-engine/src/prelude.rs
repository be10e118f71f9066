//! # gridsim-engine::prelude
//!
//! Re-exports of the types most users of the engine need.

pub use crate::{
    entity::{Entity, EntityState, ReceiveFilter},
    event::Event,
    sim::{Ctx, Simulation},
    trace::TraceWriter,
    workload::{read_swf, WorkloadJob},
};

pub use gridsim_types::{
    config::*, errors::*, gridlet::*, id::*, packet::*, payload::*, reservation::*, tags::*,
    time::*,
};
