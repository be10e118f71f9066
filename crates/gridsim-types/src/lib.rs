//! # gridsim-types
//!
//! The shared data model for the GridSim workspace: identifiers,
//! simulated time, event tags and payloads, packet records, work items,
//! reservations, error types, and run configuration.

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod gridlet;
pub mod id;
pub mod metrics;
pub mod packet;
pub mod payload;
pub mod reservation;
pub mod tags;
pub mod time;
