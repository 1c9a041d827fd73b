//! Append-only timing log
//!
//! One line per completed run, labelled by the implementation that produced
//! it: `MPI: 0.001234s n=100`, `Threads: ...`, `Serial: ...`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::report::FactorReport;

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "logs.txt";

/// Implementation a timing line belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum RunVariant {
    /// Single-threaded reference elimination
    Serial,
    /// Root and workers as threads of one process
    #[default]
    Threads,
    /// Root and workers as MPI ranks
    Mpi,
}

impl RunVariant {
    pub fn label(self) -> &'static str {
        match self {
            RunVariant::Serial => "Serial",
            RunVariant::Threads => "Threads",
            RunVariant::Mpi => "MPI",
        }
    }
}

/// Appends timing lines to a file, creating it on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLog {
    path: PathBuf,
    variant: RunVariant,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_FILE, RunVariant::default())
    }
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>, variant: RunVariant) -> Self {
        Self {
            path: path.into(),
            variant,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn variant(&self) -> RunVariant {
        self.variant
    }

    /// Log line for a run of `n x n` that took `elapsed`.
    pub fn format_entry(variant: RunVariant, elapsed: Duration, n: usize) -> String {
        format!("{}: {:.6}s n={n}", variant.label(), elapsed.as_secs_f64())
    }

    pub fn append(&self, elapsed: Duration, n: usize) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", Self::format_entry(self.variant, elapsed, n))?;
        Ok(())
    }

    pub fn record(&self, report: &FactorReport) -> Result<()> {
        self.append(report.elapsed, report.n)
    }

    /// [`record`](Self::record), with a failure reported through `log::error!`
    /// instead of returned.
    pub fn record_or_log(&self, report: &FactorReport) {
        if let Err(err) = self.record(report) {
            log::error!(
                "unable to append to run log '{}': {err}",
                self.path.display()
            );
        }
    }
}
