//! # gridsim-cli::args
//!
//! Command-line argument structure, using `clap` derive.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Default tracing filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    pub log: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation over a topology file.
    Run(RunOpts),
    /// Parse and validate a topology file.
    Validate {
        #[arg(value_name = "TOPOLOGY_PATH")]
        topology: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct RunOpts {
    /// Path to the topology file.
    #[arg(short, long)]
    pub topology: PathBuf,

    /// Path to the run configuration (TOML). Defaults to FIFO egress
    /// ports, seed 1, no traces.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Simulated time at which the run is stopped.
    #[arg(long, default_value_t = 30.0)]
    pub until: f64,
}
