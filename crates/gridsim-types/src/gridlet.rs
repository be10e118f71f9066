//! # gridsim-types::gridlet
//!
//! The work-item record exchanged with allocation policies. Policies
//! themselves live outside the core; the record and its status set are
//! part of the event interface.

use crate::{id::EntityId, time::SimTime};
use serde::{Deserialize, Serialize};

/// Processing state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridletStatus {
    Created,
    Ready,
    Queued,
    InExec,
    Paused,
    Success,
    Cancelled,
    Failed,
    FailedResourceUnavailable,
}

/// A unit of work submitted to a simulated resource.
#[derive(Debug, Clone)]
pub struct Gridlet {
    pub id: u64,
    pub user_id: EntityId,
    /// Work in simulated units (requested runtime times PE rating).
    pub length: f64,
    pub input_size_bytes: u64,
    pub output_size_bytes: u64,
    pub num_pe: u32,
    pub status: GridletStatus,
    pub submission_time: SimTime,
    pub finish_time: Option<SimTime>,
}

impl Gridlet {
    /// Marks the work item failed and records the time, used when a
    /// simulated resource fails underneath it.
    pub fn fail(&mut self, at: SimTime, resource_unavailable: bool) {
        self.status = if resource_unavailable {
            GridletStatus::FailedResourceUnavailable
        } else {
            GridletStatus::Failed
        };
        self.finish_time = Some(at);
    }
}
