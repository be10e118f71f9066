//! # gridsim-engine::trace
//!
//! Per-entity report files. Rows are
//! `simulated_time <sep> column… <sep> description` with a configurable
//! separator; files are created on demand and must be flushed at the
//! end of the simulation.

use gridsim_types::{config::Separator, errors::ConfigError, time::SimTime};
use std::fs::File;
use std::path::Path;

pub struct TraceWriter {
    writer: csv::Writer<File>,
}

impl TraceWriter {
    pub fn create(path: &Path, separator: Separator) -> Result<Self, ConfigError> {
        let file = File::create(path)?;
        let writer = csv::WriterBuilder::new()
            .delimiter(separator.as_byte())
            .flexible(true)
            .from_writer(file);
        Ok(Self { writer })
    }

    /// Appends one row: time, the given columns, and a description.
    pub fn record(
        &mut self,
        time: SimTime,
        columns: &[String],
        description: &str,
    ) -> Result<(), ConfigError> {
        let mut row = Vec::with_capacity(columns.len() + 2);
        row.push(format!("{time:.6}"));
        row.extend_from_slice(columns);
        row.push(description.to_string());
        self.writer
            .write_record(&row)
            .map_err(|e| ConfigError::Trace(e.to_string()))
    }

    pub fn flush(&mut self) -> Result<(), ConfigError> {
        self.writer
            .flush()
            .map_err(|e| ConfigError::Trace(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn rows_use_configured_separator() {
        let path = std::env::temp_dir().join("gridsim_trace_test.tsv");
        let mut w = TraceWriter::create(&path, Separator::Tab).unwrap();
        w.record(1.5, &["42".to_string()], "forwarded").unwrap();
        w.flush().unwrap();

        let mut contents = String::new();
        std::fs::File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents.trim_end(), "1.500000\t42\tforwarded");
        std::fs::remove_file(&path).ok();
    }
}
