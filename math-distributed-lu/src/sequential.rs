//! Single-threaded reference elimination
//!
//! Runs the same rounds, in the same ordinal order, with the same kernel as the
//! distributed protocol. The results are therefore bit-identical, which makes
//! this the oracle for the distributed runs.

use std::time::Instant;

use crate::config::{FactorConfig, ZeroPivotPolicy};
use crate::error::{LuError, Result};
use crate::kernel;
use crate::matrix::MatrixStore;
use crate::plan::{SavePoint, SavePointIndex};
use crate::report::FactorReport;

/// Factorize `matrix` in place without pivoting.
///
/// Returns the diagonal positions whose pivot was exactly zero.
pub fn eliminate_sequential(
    matrix: &mut MatrixStore,
    policy: ZeroPivotPolicy,
) -> Result<Vec<usize>> {
    let index = SavePointIndex::build(matrix.dim());
    let mut degenerate = Vec::new();

    for round in 0..index.rounds() {
        let pivot = matrix.row_tail(SavePoint::diagonal(round));
        if kernel::is_degenerate(&pivot) {
            if policy == ZeroPivotPolicy::Fail {
                return Err(LuError::DegeneratePivot { column: round });
            }
            degenerate.push(round);
        }

        for ordinal in index.round_ordinals(round) {
            let at = index
                .get(ordinal)
                .ok_or(LuError::UnknownOrdinal { ordinal })?;
            let reduced = kernel::eliminate(&pivot, &matrix.row_tail(at));
            matrix.write_row(at, &reduced)?;
        }
    }

    Ok(degenerate)
}

/// Timed [`eliminate_sequential`], reported like a distributed run with no workers.
pub fn factorize_sequential(
    matrix: &mut MatrixStore,
    config: &FactorConfig,
) -> Result<FactorReport> {
    let n = matrix.dim();
    let start = Instant::now();
    let degenerate_pivots = eliminate_sequential(matrix, config.zero_pivot)?;
    let elapsed = start.elapsed();

    for &column in &degenerate_pivots {
        log::warn!(
            "zero pivot at column {column}: continuing without pivoting, factors will not reproduce the input"
        );
    }
    let rounds = n - 1;
    Ok(FactorReport {
        n,
        workers: 0,
        rounds,
        rows_eliminated: n * rounds / 2,
        rows_per_worker: Vec::new(),
        degenerate_pivots,
        elapsed,
    })
}
