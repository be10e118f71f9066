//! # gridsim-types::errors
//!
//! Common error types for the workspace, one enum per error-kind
//! family: configuration errors are fatal at construction, network
//! errors are recoverable at forwarding time, kernel errors signal
//! invariant violations.

use crate::{id::EntityId, time::SimTime};
use thiserror::Error;

/// Errors raised while building a simulation from configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("entity name must be non-empty")]
    EmptyName,
    #[error("duplicate entity name {0:?}")]
    DuplicateName(String),
    #[error("baud rate must be positive, got {0}")]
    NonPositiveBaud(f64),
    #[error("propagation delay must be positive, got {0} ms")]
    NonPositiveDelay(f64),
    #[error("MTU must be positive")]
    ZeroMtu,
    #[error("scheduler weight must be strictly positive, got {0}")]
    NonPositiveWeight(f64),
    #[error("scheduler rate must be strictly positive, got {0}")]
    NonPositiveRate(f64),
    #[error("rate percentages sum to {0}, exceeding 100")]
    RateBudgetExceeded(f64),
    #[error("resource must have at least one processing element")]
    ZeroProcessingElements,
    #[error("topology error at line {line}: {message}")]
    Topology { line: usize, message: String },
    #[error("workload trace error at line {line}: {message}")]
    Workload { line: usize, message: String },
    #[error("workload archive error: {0}")]
    Archive(String),
    #[error("trace write error: {0}")]
    Trace(String),
    #[error("background traffic may not target the sending entity")]
    JunkToSelf,
}

/// Kernel invariant violations. All of these are fatal.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("unknown entity id {0}")]
    UnknownEntity(EntityId),
    #[error("unknown entity name {0:?}")]
    UnknownName(String),
    #[error("no port {port:?} on entity {entity}")]
    UnknownPort { entity: EntityId, port: String },
    #[error("clock would move backwards: {clock} -> {event_time}")]
    TimeRegression { clock: SimTime, event_time: SimTime },
    #[error("negative scheduling delay {0}")]
    NegativeDelay(f64),
    #[error("simulation already started")]
    AlreadyStarted,
    #[error("entity {0} registered but never installed")]
    MissingBehavior(EntityId),
}

/// Transient network-layer errors, self-healed by retry or drop.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("no route to {0:?}")]
    NoRoute(String),
    #[error("no scheduler bound for link {0:?}")]
    NoScheduler(String),
}
