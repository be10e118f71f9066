//! # gridsim-cli::commands::validate
//!
//! Parses a topology file and reports what it declares.

use anyhow::{Context, Result};
use gridsim_net::topology::load_topology;
use std::path::PathBuf;

pub fn exec(topology: PathBuf) -> Result<()> {
    let topo = load_topology(&topology)
        .with_context(|| format!("loading {}", topology.display()))?;

    println!(
        "{}: {} routers, {} links",
        topology.display(),
        topo.routers.len(),
        topo.links.len()
    );
    for router in &topo.routers {
        println!("  router {}{}", router.name, if router.trace { " (traced)" } else { "" });
    }
    for link in &topo.links {
        println!(
            "  link {} <-> {}: {} Gbps, {} ms, MTU {}",
            link.a,
            link.b,
            link.baud_bps / 1e9,
            link.prop_delay_ms,
            link.mtu
        );
    }
    Ok(())
}
