//! # gridsim-engine::workload
//!
//! Reader for Standard Workload Format traces: whitespace-separated
//! columns, `;` comment lines, plain, gzip, or zip input. Only the
//! columns the simulator needs are extracted; their indices are
//! configurable.

use flate2::read::GzDecoder;
use gridsim_types::{config::SwfColumns, errors::ConfigError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One job extracted from a workload trace.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadJob {
    pub id: u64,
    pub submit_time: f64,
    pub run_time: f64,
    pub num_proc: u32,
    pub req_num_proc: u32,
    pub req_run_time: f64,
}

impl WorkloadJob {
    /// Job length in simulated work units. Traces mark unknown
    /// requested runtimes as negative; the actual runtime stands in.
    pub fn length(&self, pe_rating: f64) -> f64 {
        let runtime = if self.req_run_time > 0.0 {
            self.req_run_time
        } else {
            self.run_time
        };
        runtime * pe_rating
    }
}

/// Reads a workload trace, transparently decompressing `.gz` and
/// `.zip` files by extension.
pub fn read_swf(path: &Path, columns: &SwfColumns) -> Result<Vec<WorkloadJob>, ConfigError> {
    let text = read_source(path)?;
    parse_swf(&text, columns)
}

fn read_source(path: &Path) -> Result<String, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut text = String::new();
    match ext.as_str() {
        "gz" => {
            GzDecoder::new(File::open(path)?).read_to_string(&mut text)?;
        }
        "zip" => {
            let mut archive = zip::ZipArchive::new(File::open(path)?)
                .map_err(|e| ConfigError::Archive(e.to_string()))?;
            let mut entry = archive
                .by_index(0)
                .map_err(|e| ConfigError::Archive(e.to_string()))?;
            entry.read_to_string(&mut text)?;
        }
        _ => {
            File::open(path)?.read_to_string(&mut text)?;
        }
    }
    Ok(text)
}

fn parse_swf(text: &str, columns: &SwfColumns) -> Result<Vec<WorkloadJob>, ConfigError> {
    let mut jobs = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let job = WorkloadJob {
            id: field(&fields, columns.job_id, lineno)?,
            submit_time: field(&fields, columns.submit_time, lineno)?,
            run_time: field(&fields, columns.run_time, lineno)?,
            num_proc: field(&fields, columns.num_proc, lineno)?,
            req_num_proc: field(&fields, columns.req_num_proc, lineno)?,
            req_run_time: field(&fields, columns.req_run_time, lineno)?,
        };
        jobs.push(job);
    }
    Ok(jobs)
}

fn field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    lineno: usize,
) -> Result<T, ConfigError> {
    let raw = fields.get(index).ok_or_else(|| ConfigError::Workload {
        line: lineno + 1,
        message: format!("missing column {index}"),
    })?;
    raw.parse().map_err(|_| ConfigError::Workload {
        line: lineno + 1,
        message: format!("unparsable value {raw:?} in column {index}"),
    })
}
