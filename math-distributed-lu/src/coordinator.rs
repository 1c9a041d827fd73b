//! Root side of the elimination rounds
//!
//! For each round the root broadcasts the pivot row, deals the round's rows to
//! their owners, tells every worker the round is over, then drains the workers
//! one after the other and writes every reduced row back at its save point.
//! The next pivot is read only after all writes of the round are applied.

use std::time::Instant;

use crate::comm::{Communicator, ROOT_RANK};
use crate::config::{FactorConfig, ZeroPivotPolicy};
use crate::error::{LuError, Result};
use crate::kernel;
use crate::matrix::MatrixStore;
use crate::plan::{EliminationPlan, SavePoint};
use crate::protocol::{RootMessage, WorkRow, WorkerReply};
use crate::report::FactorReport;

/// Root role driver.
pub struct RoundCoordinator<'a, C: Communicator> {
    comm: &'a C,
    config: &'a FactorConfig,
}

impl<'a, C: Communicator> RoundCoordinator<'a, C> {
    /// Check that `comm` is the root of a group with at least one worker.
    pub fn new(comm: &'a C, config: &'a FactorConfig) -> Result<Self> {
        if comm.rank() != ROOT_RANK {
            return Err(LuError::WrongRole {
                rank: comm.rank(),
                operation: "coordinate rounds",
            });
        }
        if comm.workers() == 0 {
            return Err(LuError::TooFewWorkers {
                workers: comm.workers(),
            });
        }
        Ok(Self { comm, config })
    }

    /// Factorize `matrix` in place.
    pub fn run(&self, matrix: &mut MatrixStore) -> Result<FactorReport> {
        let n = matrix.dim();
        let workers = self.comm.workers();
        let plan = EliminationPlan::new(n, workers)?;

        log::debug!(
            "LU {n}x{n}: {} rows over {} rounds on {workers} workers",
            plan.index().len(),
            plan.rounds()
        );

        let start = Instant::now();
        let mut rows_per_worker = vec![0; workers];
        let mut degenerate_pivots = Vec::new();

        for round in 0..plan.rounds() {
            let mut pivot = matrix.row_tail(SavePoint::diagonal(round));
            if kernel::is_degenerate(&pivot) {
                match self.config.zero_pivot {
                    ZeroPivotPolicy::Fail => {
                        return Err(LuError::DegeneratePivot { column: round });
                    }
                    ZeroPivotPolicy::Fallback => {
                        log::warn!(
                            "zero pivot at column {round}: continuing without pivoting, factors will not reproduce the input"
                        );
                        degenerate_pivots.push(round);
                    }
                }
            }

            self.comm.broadcast(&mut pivot)?;
            let dispatched = self.dispatch(&plan, round, matrix)?;
            for worker in 1..=workers {
                self.comm.send_to_worker(worker, RootMessage::EndOfRound)?;
            }
            for (slot, expected) in dispatched.iter().enumerate() {
                rows_per_worker[slot] += self.collect(&plan, round, slot + 1, expected, matrix)?;
            }

            log::debug!(
                "round {round}: active size {}, {} rows",
                pivot.len(),
                plan.round_ordinals(round).len()
            );
            let interval = self.config.progress_interval;
            if interval > 0 && (round + 1) % interval == 0 {
                log::info!("LU round {}/{}", round + 1, plan.rounds());
            }
        }

        let report = FactorReport {
            n,
            workers,
            rounds: plan.rounds(),
            rows_eliminated: rows_per_worker.iter().sum(),
            rows_per_worker,
            degenerate_pivots,
            elapsed: start.elapsed(),
        };
        log::info!(
            "LU {n}x{n} done: {} rounds, {} rows, {:.3} s",
            report.rounds,
            report.rows_eliminated,
            report.elapsed_secs()
        );
        Ok(report)
    }

    /// Send every row of `round` to its owner, in ordinal order.
    ///
    /// Returns the ordinals sent to each worker, indexed by `rank - 1`.
    fn dispatch(
        &self,
        plan: &EliminationPlan,
        round: usize,
        matrix: &MatrixStore,
    ) -> Result<Vec<Vec<usize>>> {
        let mut dispatched = vec![Vec::new(); plan.workers()];
        for ordinal in plan.round_ordinals(round) {
            let (Some(owner), Some(at)) = (plan.owner(ordinal), plan.save_point(ordinal)) else {
                return Err(LuError::UnknownOrdinal { ordinal });
            };
            let row = WorkRow {
                ordinal,
                values: matrix.row_tail(at),
            };
            self.comm.send_to_worker(owner, RootMessage::Work(row))?;
            dispatched[owner - 1].push(ordinal);
        }
        Ok(dispatched)
    }

    /// Drain one worker and apply its reduced rows. Returns the row count.
    ///
    /// `expected` holds the ordinals dispatched to `worker` this round, in
    /// increasing order; each must come back exactly once.
    fn collect(
        &self,
        plan: &EliminationPlan,
        round: usize,
        worker: usize,
        expected: &[usize],
        matrix: &mut MatrixStore,
    ) -> Result<usize> {
        let announced = match self.comm.recv_from_worker(worker)? {
            WorkerReply::Count(count) => count,
            reply => {
                return Err(LuError::ProtocolViolation {
                    rank: ROOT_RANK,
                    expected: "row count",
                    got: reply.kind(),
                });
            }
        };
        if announced != expected.len() {
            return Err(LuError::ReplyCountMismatch {
                worker,
                dispatched: expected.len(),
                announced,
            });
        }
        if announced == 0 {
            return Ok(0);
        }

        let batch = match self.comm.recv_from_worker(worker)? {
            WorkerReply::Batch(batch) => batch,
            reply => {
                return Err(LuError::ProtocolViolation {
                    rank: ROOT_RANK,
                    expected: "row batch",
                    got: reply.kind(),
                });
            }
        };
        if batch.len() != announced {
            return Err(LuError::BatchSizeMismatch {
                worker,
                announced,
                received: batch.len(),
            });
        }
        log::trace!("round {round}: {announced} rows from worker {worker}");

        let mut returned = vec![false; expected.len()];
        for row in batch.into_rows() {
            let slot = expected
                .binary_search(&row.ordinal)
                .ok()
                .filter(|&slot| !returned[slot])
                .ok_or(LuError::UnknownOrdinal {
                    ordinal: row.ordinal,
                })?;
            returned[slot] = true;
            let at = plan.save_point(row.ordinal).ok_or(LuError::UnknownOrdinal {
                ordinal: row.ordinal,
            })?;
            matrix.write_row(at, &row.values)?;
        }
        Ok(announced)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::comm::{LocalComm, local_group};
    use crate::protocol::ReducedRowBatch;
    use ndarray::array;

    /// Runs the coordinator on a scoped thread while `play` drives the only
    /// worker by hand on the test thread.
    fn run_against<F>(matrix: &mut MatrixStore, play: F) -> Result<FactorReport>
    where
        F: FnOnce(&LocalComm),
    {
        let mut group = local_group(1).unwrap();
        let worker = group.pop().unwrap();
        let root = group.pop().unwrap();
        let config = FactorConfig::default();
        let config = &config;

        thread::scope(|scope| {
            let coordinator = scope.spawn(move || -> Result<FactorReport> {
                RoundCoordinator::new(&root, config)?.run(matrix)
            });
            play(&worker);
            drop(worker);
            coordinator.join().unwrap()
        })
    }

    fn drain(worker: &LocalComm, active: usize) -> Vec<WorkRow> {
        let mut pivot = vec![0.0; active];
        worker.broadcast(&mut pivot).unwrap();
        let mut rows = Vec::new();
        while let RootMessage::Work(row) = worker.recv_from_root().unwrap() {
            rows.push(WorkRow {
                ordinal: row.ordinal,
                values: kernel::eliminate(&pivot, &row.values),
            });
        }
        rows
    }

    #[test]
    fn test_zero_count_after_receiving_rows_is_rejected() {
        let a = array![[2.0, 1.0], [4.0, 3.0]];
        let mut matrix = MatrixStore::new(a.clone()).unwrap();

        let outcome = run_against(&mut matrix, |worker| {
            drain(worker, 2);
            worker.send_to_root(WorkerReply::Count(0)).unwrap();
        });

        assert!(matches!(
            outcome,
            Err(LuError::ReplyCountMismatch {
                worker: 1,
                dispatched: 1,
                announced: 0
            })
        ));
        assert_eq!(matrix.as_array(), &a);
    }

    #[test]
    fn test_duplicated_ordinal_is_rejected() {
        let mut matrix =
            MatrixStore::new(array![[4.0, 3.0, 2.0], [2.0, 1.0, 1.0], [1.0, 2.0, 3.0]]).unwrap();

        let outcome = run_against(&mut matrix, |worker| {
            let rows = drain(worker, 3);
            assert_eq!(rows.len(), 2);
            let twice = vec![rows[0].clone(), rows[0].clone()];
            worker.send_to_root(WorkerReply::Count(2)).unwrap();
            worker
                .send_to_root(WorkerReply::Batch(ReducedRowBatch::from(twice)))
                .unwrap();
        });

        assert!(matches!(
            outcome,
            Err(LuError::UnknownOrdinal { ordinal: 0 })
        ));
    }

    #[test]
    fn test_honest_worker_completes_the_run() {
        let mut matrix = MatrixStore::new(array![[2.0, 1.0], [4.0, 3.0]]).unwrap();

        let report = run_against(&mut matrix, |worker| {
            let rows = drain(worker, 2);
            worker.send_to_root(WorkerReply::Count(rows.len())).unwrap();
            worker
                .send_to_root(WorkerReply::Batch(ReducedRowBatch::from(rows)))
                .unwrap();
        })
        .unwrap();

        assert!(report.is_exact());
        assert_eq!(matrix.as_array(), &array![[2.0, 1.0], [2.0, 1.0]]);
    }

    #[test]
    fn test_worker_cannot_coordinate() {
        let group = local_group(1).unwrap();
        let config = FactorConfig::default();
        assert!(matches!(
            RoundCoordinator::new(&group[1], &config),
            Err(LuError::WrongRole { rank: 1, .. })
        ));
    }
}
