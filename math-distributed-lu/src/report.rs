//! Summary of a completed factorization

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;

/// Outcome of a factorization run, produced by the root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorReport {
    /// Matrix dimension
    pub n: usize,
    /// Number of workers besides the root
    pub workers: usize,
    /// Elimination rounds performed (`n - 1`)
    pub rounds: usize,
    /// Rows reduced and written back over all rounds
    pub rows_eliminated: usize,
    /// Rows reduced by each worker, indexed by `rank - 1`
    pub rows_per_worker: Vec<usize>,
    /// Diagonal positions whose pivot was exactly zero
    pub degenerate_pivots: Vec<usize>,
    /// Wall-clock time of the round loop
    pub elapsed: Duration,
}

impl FactorReport {
    /// Whether `L * U` is expected to reproduce the input matrix.
    pub fn is_exact(&self) -> bool {
        self.degenerate_pivots.is_empty()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Write the report as pretty-printed JSON, replacing any existing file.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
