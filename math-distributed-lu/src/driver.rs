//! Run the whole process group inside one process
//!
//! Workers become scoped threads named `lu-worker-<rank>`; the calling thread
//! plays the root. Configuration is validated before any channel exists.

use std::thread;

use crate::comm::{Communicator, LocalComm, local_group};
use crate::config::FactorConfig;
use crate::coordinator::RoundCoordinator;
use crate::error::{LuError, Result};
use crate::matrix::MatrixStore;
use crate::report::FactorReport;
use crate::runlog::RunLog;
use crate::sequential::factorize_sequential;
use crate::worker::RoundWorker;

/// Factorize `matrix` in place with `workers` worker threads.
pub fn factorize_local(
    matrix: &mut MatrixStore,
    workers: usize,
    config: &FactorConfig,
) -> Result<FactorReport> {
    factorize_local_with(matrix, workers, config, |comm| comm)
}

/// Like [`factorize_local`], with `wrap` applied to every participant's
/// communicator (root included) before the run starts.
pub fn factorize_local_with<C, F>(
    matrix: &mut MatrixStore,
    workers: usize,
    config: &FactorConfig,
    wrap: F,
) -> Result<FactorReport>
where
    C: Communicator + Send,
    F: Fn(LocalComm) -> C,
{
    if workers == 0 {
        return Err(LuError::TooFewWorkers { workers });
    }
    let n = matrix.dim();

    let mut comms = local_group(workers)?.into_iter().map(wrap);
    let root = comms.next().ok_or(LuError::TooFewWorkers { workers })?;
    let worker_comms: Vec<C> = comms.collect();

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for comm in worker_comms {
            let rank = comm.rank();
            let handle = thread::Builder::new()
                .name(format!("lu-worker-{rank}"))
                .spawn_scoped(scope, move || -> Result<usize> {
                    RoundWorker::new(&comm)?.run(n)
                })?;
            handles.push((rank, handle));
        }

        let outcome = run_root(root, matrix, config);
        if let Err(err) = &outcome {
            log::debug!("root stopped: {err}");
        }

        let mut worker_failure: Option<LuError> = None;
        for (rank, handle) in handles {
            let err = match handle.join() {
                Ok(Ok(_)) => continue,
                Ok(Err(err)) => err,
                Err(_) => LuError::WorkerPanicked { rank },
            };
            log::debug!("worker {rank} stopped: {err}");
            let keep_first = match &worker_failure {
                None => false,
                Some(LuError::Disconnected { .. }) => matches!(err, LuError::Disconnected { .. }),
                Some(_) => true,
            };
            if !keep_first {
                worker_failure = Some(err);
            }
        }

        // A failing participant disconnects its peers; report the cause, not the echo.
        match (outcome, worker_failure) {
            (Err(LuError::Disconnected { .. }), Some(cause)) => Err(cause),
            (Err(err), _) => Err(err),
            (Ok(_), Some(err)) => Err(err),
            (Ok(report), None) => Ok(report),
        }
    })
}

/// Consumes the root communicator so its channels close when the run ends.
fn run_root<C: Communicator>(
    root: C,
    matrix: &mut MatrixStore,
    config: &FactorConfig,
) -> Result<FactorReport> {
    RoundCoordinator::new(&root, config)?.run(matrix)
}

/// Factorize, then append the timing to `run_log` if one is given.
///
/// Nothing is logged when the factorization fails. A log write failure is
/// reported through `log::error!` and does not fail the run.
pub fn run_local(
    matrix: &mut MatrixStore,
    workers: usize,
    config: &FactorConfig,
    run_log: Option<&RunLog>,
) -> Result<FactorReport> {
    let report = factorize_local(matrix, workers, config)?;
    if let Some(run_log) = run_log {
        run_log.record_or_log(&report);
    }
    Ok(report)
}

/// [`run_local`] for the single-threaded baseline.
pub fn run_sequential(
    matrix: &mut MatrixStore,
    config: &FactorConfig,
    run_log: Option<&RunLog>,
) -> Result<FactorReport> {
    let report = factorize_sequential(matrix, config)?;
    if let Some(run_log) = run_log {
        run_log.record_or_log(&report);
    }
    Ok(report)
}
