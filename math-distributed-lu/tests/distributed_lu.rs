//! End-to-end factorizations over the in-process backend
//!
//! Distributed results are compared bit for bit with the sequential
//! reference, and `L * U` is checked against the input where no pivot was
//! degenerate.

use std::thread;

use approx::assert_relative_eq;
use math_distributed_lu::kernel;
use math_distributed_lu::{
    Communicator, FactorConfig, FactorReport, LocalComm, LuError, MatrixStore, ReducedRowBatch,
    RootMessage, RoundCoordinator, RunLog, RunVariant, WorkRow, WorkerReply, ZeroPivotPolicy,
    eliminate_sequential, factorize_local, factorize_local_with, local_group, max_abs_diff,
    random_matrix, run_local, run_sequential,
};
use ndarray::{Array2, array};

/// Random integer matrix made strictly diagonally dominant, so every pivot is non-zero.
fn dominant_matrix(n: usize, seed: u64) -> Array2<f64> {
    let mut a = random_matrix(n, Some(seed)).unwrap().into_array();
    for i in 0..n {
        a[[i, i]] += 60.0 * n as f64;
    }
    a
}

#[test]
fn test_lu_reconstructs_input() {
    let config = FactorConfig::default();
    for n in 1..=12 {
        for workers in 1..=5 {
            let a = dominant_matrix(n, (n * 31 + workers) as u64);
            let mut lu = MatrixStore::new(a.clone()).unwrap();

            let report = factorize_local(&mut lu, workers, &config).unwrap();
            assert!(report.is_exact());

            let scale = a.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
            let err = max_abs_diff(&lu.reconstruct(), &a).unwrap();
            assert!(
                err <= 1e-10 * scale,
                "n={n} workers={workers}: |LU - A| = {err}"
            );
        }
    }
}

#[test]
fn test_matches_sequential_bit_for_bit() {
    let config = FactorConfig::default();
    for (n, workers, seed) in [(2, 1, 1), (5, 2, 2), (8, 3, 3), (13, 4, 4), (20, 7, 5)] {
        let a = random_matrix(n, Some(seed)).unwrap();

        let mut reference = a.clone();
        let degenerate = eliminate_sequential(&mut reference, ZeroPivotPolicy::Fallback).unwrap();

        let mut distributed = a.clone();
        let report = factorize_local(&mut distributed, workers, &config).unwrap();

        assert_eq!(report.degenerate_pivots, degenerate);
        let identical = reference
            .as_slice()
            .iter()
            .zip(distributed.as_slice())
            .all(|(x, y)| x.to_bits() == y.to_bits());
        assert!(identical, "n={n} workers={workers} differs from the reference");
    }
}

#[test]
fn test_report_counts() {
    let mut lu = MatrixStore::new(dominant_matrix(6, 9)).unwrap();
    let report = factorize_local(&mut lu, 4, &FactorConfig::default()).unwrap();

    assert_eq!(report.n, 6);
    assert_eq!(report.workers, 4);
    assert_eq!(report.rounds, 5);
    assert_eq!(report.rows_eliminated, 15);
    assert_eq!(report.rows_per_worker, vec![4, 4, 4, 3]);
}

#[test]
fn test_more_workers_than_rows() {
    let a = array![[4.0, 3.0, 2.0], [2.0, 1.0, 1.0], [1.0, 2.0, 3.0]];
    let mut lu = MatrixStore::new(a.clone()).unwrap();

    let report = factorize_local(&mut lu, 8, &FactorConfig::default()).unwrap();

    assert_eq!(report.rows_per_worker, vec![1, 1, 1, 0, 0, 0, 0, 0]);
    assert!(max_abs_diff(&lu.reconstruct(), &a).unwrap() < 1e-12);
}

#[test]
fn test_single_element_matrix() {
    let mut lu = MatrixStore::new(array![[7.0]]).unwrap();
    let report = factorize_local(&mut lu, 2, &FactorConfig::default()).unwrap();

    assert_eq!(report.rounds, 0);
    assert_eq!(report.rows_eliminated, 0);
    assert_eq!(lu.as_array(), &array![[7.0]]);
}

#[test]
fn test_three_by_three_merged_factors() {
    let mut lu =
        MatrixStore::new(array![[4.0, 3.0, 2.0], [2.0, 1.0, 1.0], [1.0, 2.0, 3.0]]).unwrap();
    factorize_local(&mut lu, 1, &FactorConfig::default()).unwrap();

    let expected = array![[4.0, 3.0, 2.0], [0.5, -0.5, 0.0], [0.25, -2.5, 2.5]];
    assert_eq!(lu.as_array(), &expected);
}

/// The test thread plays the only worker by hand, so the matrix state after
/// round 1 is observed through what the root sends for round 2.
#[test]
fn test_first_round_rows_land_at_their_save_points() {
    let mut matrix =
        MatrixStore::new(array![[4.0, 3.0, 2.0], [2.0, 1.0, 1.0], [1.0, 2.0, 3.0]]).unwrap();
    let mut group = local_group(1).unwrap();
    let worker = group.pop().unwrap();
    let root = group.pop().unwrap();
    let config = FactorConfig::default();

    let report = thread::scope(|scope| {
        let worker = worker;
        let (matrix, config) = (&mut matrix, &config);
        // The root endpoint moves into its thread; only its owner may receive on it.
        let coordinator = scope.spawn(move || -> math_distributed_lu::Result<FactorReport> {
            RoundCoordinator::new(&root, config)?.run(matrix)
        });

        // Round 1
        let mut pivot = vec![0.0; 3];
        worker.broadcast(&mut pivot).unwrap();
        assert_eq!(pivot, vec![4.0, 3.0, 2.0]);

        let mut batch = ReducedRowBatch::new();
        while let RootMessage::Work(row) = worker.recv_from_root().unwrap() {
            batch.push(WorkRow {
                ordinal: row.ordinal,
                values: kernel::eliminate(&pivot, &row.values),
            });
        }
        assert_eq!(
            batch.rows(),
            &[
                WorkRow {
                    ordinal: 0,
                    values: vec![0.5, -0.5, 0.0],
                },
                WorkRow {
                    ordinal: 1,
                    values: vec![0.25, 1.25, 2.5],
                },
            ]
        );
        worker.send_to_root(WorkerReply::Count(2)).unwrap();
        worker.send_to_root(WorkerReply::Batch(batch)).unwrap();

        // Round 2 reads the rows written back at save points (1, 0) and (2, 0)
        let mut pivot = vec![0.0; 2];
        worker.broadcast(&mut pivot).unwrap();
        assert_eq!(pivot, vec![-0.5, 0.0]);

        let RootMessage::Work(row) = worker.recv_from_root().unwrap() else {
            panic!("expected the round 2 work row");
        };
        assert_eq!(
            row,
            WorkRow {
                ordinal: 2,
                values: vec![1.25, 2.5],
            }
        );
        assert_eq!(worker.recv_from_root().unwrap(), RootMessage::EndOfRound);

        let reduced = WorkRow {
            ordinal: row.ordinal,
            values: kernel::eliminate(&pivot, &row.values),
        };
        worker.send_to_root(WorkerReply::Count(1)).unwrap();
        worker
            .send_to_root(WorkerReply::Batch(ReducedRowBatch::from(vec![reduced])))
            .unwrap();

        coordinator.join().unwrap().unwrap()
    });

    assert_eq!(report.rows_eliminated, 3);
    assert_relative_eq!(matrix.as_array()[[2, 1]], -2.5);
    assert_relative_eq!(matrix.as_array()[[2, 2]], 2.5);
}

#[test]
fn test_worker_reply_with_foreign_ordinal_is_rejected() {
    let mut matrix = MatrixStore::new(array![[2.0, 1.0], [4.0, 3.0]]).unwrap();
    let mut group = local_group(1).unwrap();
    let worker = group.pop().unwrap();
    let root = group.pop().unwrap();
    let config = FactorConfig::default();

    let outcome = thread::scope(|scope| {
        let worker = worker;
        let (matrix, config) = (&mut matrix, &config);
        // The root endpoint moves into its thread; only its owner may receive on it.
        let coordinator = scope.spawn(move || -> math_distributed_lu::Result<FactorReport> {
            RoundCoordinator::new(&root, config)?.run(matrix)
        });

        let mut pivot = vec![0.0; 2];
        worker.broadcast(&mut pivot).unwrap();
        while let RootMessage::Work(_) = worker.recv_from_root().unwrap() {}
        worker.send_to_root(WorkerReply::Count(1)).unwrap();
        worker
            .send_to_root(WorkerReply::Batch(ReducedRowBatch::from(vec![WorkRow {
                ordinal: 40,
                values: vec![2.0, 1.0],
            }])))
            .unwrap();

        coordinator.join().unwrap()
    });

    assert!(matches!(outcome, Err(LuError::UnknownOrdinal { ordinal: 40 })));
}

#[test]
fn test_zero_workers_is_rejected_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    let run_log = RunLog::new(dir.path().join("logs.txt"), RunVariant::Threads);
    let a = random_matrix(4, Some(3)).unwrap();
    let mut lu = a.clone();

    let err = run_local(&mut lu, 0, &FactorConfig::default(), Some(&run_log)).unwrap_err();

    assert!(matches!(err, LuError::TooFewWorkers { workers: 0 }));
    assert!(err.is_config_error());
    assert_eq!(lu, a);
    assert!(!run_log.path().exists());
}

#[test]
fn test_run_local_appends_one_line() {
    let dir = tempfile::tempdir().unwrap();
    let run_log = RunLog::new(dir.path().join("logs.txt"), RunVariant::Threads);
    let mut lu = MatrixStore::new(dominant_matrix(5, 11)).unwrap();

    run_local(&mut lu, 2, &FactorConfig::default(), Some(&run_log)).unwrap();

    let text = std::fs::read_to_string(run_log.path()).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("Threads: "));
    assert!(text.trim_end().ends_with("n=5"));
}

#[test]
fn test_unwritable_run_log_does_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let run_log = RunLog::new(
        dir.path().join("no-such-dir").join("logs.txt"),
        RunVariant::Threads,
    );
    let a = dominant_matrix(4, 5);
    let mut lu = MatrixStore::new(a.clone()).unwrap();

    let report = run_local(&mut lu, 3, &FactorConfig::default(), Some(&run_log)).unwrap();

    assert!(report.is_exact());
    assert!(max_abs_diff(&lu.reconstruct(), &a).unwrap() < 1e-9);
}

#[test]
fn test_zero_pivot_fallback_is_reported() {
    let a = array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0], [6.0, 7.0, 9.0]];
    let mut lu = MatrixStore::new(a.clone()).unwrap();

    let report = factorize_local(&mut lu, 2, &FactorConfig::default()).unwrap();

    assert_eq!(report.degenerate_pivots, vec![0]);
    assert!(!report.is_exact());
    // Multipliers fall back to zero and the trailing entries pass through round 1.
    assert_eq!(lu.as_array()[[1, 0]], 0.0);
    assert_eq!(lu.as_array()[[2, 0]], 0.0);
}

#[test]
fn test_zero_pivot_fail_policy_stops_every_participant() {
    // The zero appears only in round 2, after round 1 rewrote row 1.
    let a = array![[1.0, 2.0, 3.0], [2.0, 4.0, 7.0], [3.0, 1.0, 1.0]];
    let mut lu = MatrixStore::new(a.clone()).unwrap();
    let config = FactorConfig::builder().fail_on_zero_pivot(true).build();

    let err = factorize_local(&mut lu, 3, &config).unwrap_err();

    assert!(matches!(err, LuError::DegeneratePivot { column: 1 }));
    assert!(err.is_numerical_error());
    assert_eq!(lu.as_array()[[1, 0]], 2.0 / 1.0);
}

/// Local endpoint whose worker `broken` rejects every directed message.
struct BrokenWorker {
    inner: LocalComm,
    broken: usize,
}

impl Communicator for BrokenWorker {
    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn broadcast(&self, row: &mut [f64]) -> math_distributed_lu::Result<()> {
        self.inner.broadcast(row)
    }

    fn send_to_worker(&self, worker: usize, message: RootMessage) -> math_distributed_lu::Result<()> {
        self.inner.send_to_worker(worker, message)
    }

    fn recv_from_root(&self) -> math_distributed_lu::Result<RootMessage> {
        if self.rank() == self.broken {
            return Err(LuError::ProtocolViolation {
                rank: self.rank(),
                expected: "work row or end of round",
                got: "corrupted frame",
            });
        }
        self.inner.recv_from_root()
    }

    fn send_to_root(&self, reply: WorkerReply) -> math_distributed_lu::Result<()> {
        self.inner.send_to_root(reply)
    }

    fn recv_from_worker(&self, worker: usize) -> math_distributed_lu::Result<WorkerReply> {
        self.inner.recv_from_worker(worker)
    }
}

#[test]
fn test_worker_failure_is_reported_over_the_disconnect_it_causes() {
    let mut lu =
        MatrixStore::new(array![[4.0, 3.0, 2.0], [2.0, 1.0, 1.0], [1.0, 2.0, 3.0]]).unwrap();

    let err = factorize_local_with(&mut lu, 2, &FactorConfig::default(), |inner| BrokenWorker {
        inner,
        broken: 2,
    })
    .unwrap_err();

    assert!(
        matches!(err, LuError::ProtocolViolation { rank: 2, .. }),
        "got {err:?}"
    );
}

#[test]
fn test_run_sequential_logs_a_serial_line() {
    let dir = tempfile::tempdir().unwrap();
    let run_log = RunLog::new(dir.path().join("logs.txt"), RunVariant::Serial);
    let a = random_matrix(7, Some(21)).unwrap();

    let mut sequential = a.clone();
    let report =
        run_sequential(&mut sequential, &FactorConfig::default(), Some(&run_log)).unwrap();
    let mut distributed = a.clone();
    factorize_local(&mut distributed, 3, &FactorConfig::default()).unwrap();

    assert_eq!(report.rows_eliminated, 21);
    assert_eq!(sequential, distributed);
    let text = std::fs::read_to_string(run_log.path()).unwrap();
    assert!(text.starts_with("Serial: "));
    assert!(text.trim_end().ends_with("n=7"));
}
