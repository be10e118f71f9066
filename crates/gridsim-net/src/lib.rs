//! # gridsim-net
//!
//! The network transport layer riding on the event kernel: per-entity
//! I/O ports, point-to-point links with propagation delay and MTU
//! fragmentation, routers with per-egress packet schedulers and a
//! distance-vector routing protocol, and the analytic flow-level
//! transport variant.

#![forbid(unsafe_code)]

pub mod flow;
pub mod link;
pub mod ports;
pub mod router;
pub mod sched;
pub mod topology;
pub mod wiring;

pub use link::{LinkEnds, LinkRef, SimpleLink};
pub use ports::{Input, Output, TransportMode};
pub use router::Router;
pub use sched::{FifoScheduler, PacketScheduler, RateScheduler, ScfqScheduler, SchedulerKind};
pub use wiring::{HostHandles, HostSpec, Network};
