//! # gridsim-cli
//!
//! The `gridsim` binary: parses command-line arguments, initializes
//! tracing, and dispatches to the subcommand handlers.

#![forbid(unsafe_code)]

use crate::args::{Cli, Command};
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod drivers;

fn main() -> Result<()> {
    let args = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command {
        Command::Run(opts) => commands::run::exec(opts),
        Command::Validate { topology } => commands::validate::exec(topology),
    }
}
