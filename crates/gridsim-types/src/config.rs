//! # gridsim-types::config
//!
//! Strongly-typed run configuration, parsed from TOML by the CLI.
//! Discipline parameters are validated at load time so that invalid
//! weight/rate vectors never reach the network builder.

use crate::{errors::ConfigError, id::ServiceClass};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Queue discipline installed on every router egress port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discipline {
    Fifo,
    Scfq { weights: Vec<f64> },
    RateControlled { percentages: Vec<f64> },
    Flow,
}

impl Discipline {
    /// Rejects non-positive weights and rate budgets above 100%.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Discipline::Fifo | Discipline::Flow => Ok(()),
            Discipline::Scfq { weights } => {
                for &w in weights {
                    if w <= 0.0 {
                        return Err(ConfigError::NonPositiveWeight(w));
                    }
                }
                Ok(())
            }
            Discipline::RateControlled { percentages } => {
                for &p in percentages {
                    if p <= 0.0 {
                        return Err(ConfigError::NonPositiveRate(p));
                    }
                }
                let total: f64 = percentages.iter().sum();
                if total > 100.0 {
                    return Err(ConfigError::RateBudgetExceeded(total));
                }
                Ok(())
            }
        }
    }
}

/// Column separator for trace files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Separator {
    Space,
    Comma,
    Tab,
}

impl Separator {
    pub fn as_byte(self) -> u8 {
        match self {
            Separator::Space => b' ',
            Separator::Comma => b',',
            Separator::Tab => b'\t',
        }
    }
}

/// Per-entity trace file options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub separator: Separator,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("."),
            separator: Separator::Space,
        }
    }
}

/// Column indices (0-based) into a Standard Workload Format line.
/// Defaults follow the SWF field order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwfColumns {
    pub job_id: usize,
    pub submit_time: usize,
    pub run_time: usize,
    pub num_proc: usize,
    pub req_num_proc: usize,
    pub req_run_time: usize,
}

impl Default for SwfColumns {
    fn default() -> Self {
        Self {
            job_id: 0,
            submit_time: 1,
            run_time: 3,
            num_proc: 4,
            req_num_proc: 7,
            req_run_time: 8,
        }
    }
}

/// Workload trace input options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub path: PathBuf,
    /// MIPS-like rating used to turn requested runtime into work units.
    pub pe_rating: f64,
    #[serde(default)]
    pub columns: SwfColumns,
}

/// Destination choice for generated background traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrafficPattern {
    SendAll,
    #[default]
    SendOneOnly,
}

/// Background-traffic generation options. The generator's randomness
/// is drawn from the run seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficConfig {
    /// Seconds between generated packets.
    pub inter_arrival: f64,
    pub size_bytes: u64,
    pub count: u64,
    #[serde(default)]
    pub pattern: TrafficPattern,
    #[serde(default)]
    pub class: ServiceClass,
}

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub discipline: Discipline,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub workload: Option<WorkloadConfig>,
    #[serde(default)]
    pub traffic: Option<TrafficConfig>,
}

fn default_seed() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scfq_rejects_zero_weight() {
        let d = Discipline::Scfq {
            weights: vec![1.0, 0.0],
        };
        assert!(matches!(
            d.validate(),
            Err(ConfigError::NonPositiveWeight(_))
        ));
    }

    #[test]
    fn rate_budget_capped_at_hundred() {
        let d = Discipline::RateControlled {
            percentages: vec![60.0, 50.0],
        };
        assert!(matches!(
            d.validate(),
            Err(ConfigError::RateBudgetExceeded(_))
        ));
        let ok = Discipline::RateControlled {
            percentages: vec![60.0, 40.0],
        };
        assert!(ok.validate().is_ok());
    }
}
