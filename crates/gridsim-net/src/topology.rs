//! # gridsim-net::topology
//!
//! Parser for the text topology format:
//!
//! ```text
//! # comments begin with '#'
//! <num_routers>
//! <router_name> [true|false]     # optional trace flag
//! ...
//! <router_a> <router_b> <baud_Gbps> <prop_delay_ms> <mtu_bytes>
//! ...
//! ```
//!
//! The same file feeds all four discipline variants; scheduler
//! parameters come from the run configuration.

use gridsim_types::errors::ConfigError;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct RouterDecl {
    pub name: String,
    pub trace: bool,
}

#[derive(Debug, Clone)]
pub struct LinkDecl {
    pub a: String,
    pub b: String,
    pub baud_bps: f64,
    pub prop_delay_ms: f64,
    pub mtu: u64,
}

#[derive(Debug, Clone)]
pub struct TopologyFile {
    pub routers: Vec<RouterDecl>,
    pub links: Vec<LinkDecl>,
}

pub fn load_topology(path: &Path) -> Result<TopologyFile, ConfigError> {
    parse_topology(&std::fs::read_to_string(path)?)
}

pub fn parse_topology(text: &str) -> Result<TopologyFile, ConfigError> {
    // Significant lines with their 1-based line numbers.
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(n, l)| (n + 1, l.split('#').next().unwrap_or("").trim()))
        .filter(|(_, l)| !l.is_empty());

    let (line, count) = lines.next().ok_or(ConfigError::Topology {
        line: 0,
        message: "empty topology file".into(),
    })?;
    let num_routers: usize = count.parse().map_err(|_| ConfigError::Topology {
        line,
        message: format!("expected router count, got {count:?}"),
    })?;

    let mut routers = Vec::with_capacity(num_routers);
    for _ in 0..num_routers {
        let (line, decl) = lines.next().ok_or(ConfigError::Topology {
            line: 0,
            message: "fewer router declarations than announced".into(),
        })?;
        let mut fields = decl.split_whitespace();
        let name = fields.next().unwrap().to_string();
        let trace = match fields.next() {
            None => false,
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                return Err(ConfigError::Topology {
                    line,
                    message: format!("expected true/false trace flag, got {other:?}"),
                })
            }
        };
        if routers.iter().any(|r: &RouterDecl| r.name == name) {
            return Err(ConfigError::Topology {
                line,
                message: format!("duplicate router {name:?}"),
            });
        }
        routers.push(RouterDecl { name, trace });
    }

    let mut links = Vec::new();
    for (line, decl) in lines {
        let fields: Vec<&str> = decl.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ConfigError::Topology {
                line,
                message: format!("expected 5 link fields, got {}", fields.len()),
            });
        }
        let known = |n: &str| routers.iter().any(|r| r.name == n);
        if !known(fields[0]) || !known(fields[1]) {
            return Err(ConfigError::Topology {
                line,
                message: format!("link references unknown router in {decl:?}"),
            });
        }
        let baud_gbps: f64 = fields[2].parse().map_err(|_| ConfigError::Topology {
            line,
            message: format!("bad baud rate {:?}", fields[2]),
        })?;
        let prop_delay_ms: f64 = fields[3].parse().map_err(|_| ConfigError::Topology {
            line,
            message: format!("bad propagation delay {:?}", fields[3]),
        })?;
        let mtu: u64 = fields[4].parse().map_err(|_| ConfigError::Topology {
            line,
            message: format!("bad MTU {:?}", fields[4]),
        })?;
        if baud_gbps <= 0.0 {
            return Err(ConfigError::NonPositiveBaud(baud_gbps));
        }
        if prop_delay_ms <= 0.0 {
            return Err(ConfigError::NonPositiveDelay(prop_delay_ms));
        }
        if mtu == 0 {
            return Err(ConfigError::ZeroMtu);
        }
        links.push(LinkDecl {
            a: fields[0].to_string(),
            b: fields[1].to_string(),
            baud_bps: baud_gbps * 1e9,
            prop_delay_ms,
            mtu,
        });
    }

    Ok(TopologyFile { routers, links })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# two routers, one wire
2
A true
B
A B 1 10 1500
";

    #[test]
    fn parses_routers_links_and_trace_flags() {
        let topo = parse_topology(SAMPLE).unwrap();
        assert_eq!(topo.routers.len(), 2);
        assert!(topo.routers[0].trace);
        assert!(!topo.routers[1].trace);
        assert_eq!(topo.links.len(), 1);
        let link = &topo.links[0];
        assert_eq!(link.baud_bps, 1e9);
        assert_eq!(link.prop_delay_ms, 10.0);
        assert_eq!(link.mtu, 1500);
    }

    #[test]
    fn rejects_unknown_router_in_link() {
        let err = parse_topology("1\nA\nA C 1 1 100\n").unwrap_err();
        assert!(matches!(err, ConfigError::Topology { line: 3, .. }));
    }

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(matches!(
            parse_topology("2\nA\nB\nA B 0 1 100\n").unwrap_err(),
            ConfigError::NonPositiveBaud(_)
        ));
        assert!(matches!(
            parse_topology("2\nA\nB\nA B 1 0 100\n").unwrap_err(),
            ConfigError::NonPositiveDelay(_)
        ));
        assert!(matches!(
            parse_topology("2\nA\nB\nA B 1 1 0\n").unwrap_err(),
            ConfigError::ZeroMtu
        ));
    }

    #[test]
    fn rejects_duplicate_router() {
        let err = parse_topology("2\nA\nA\n").unwrap_err();
        assert!(matches!(err, ConfigError::Topology { .. }));
    }
}
