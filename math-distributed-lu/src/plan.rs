//! Row ownership and write-back locations
//!
//! Every non-pivot row of every elimination round gets a global ordinal. Rounds
//! are enumerated from the full matrix down to the last 2x2 block, and rows are
//! enumerated top to bottom inside a round, so ordinals are stable for the whole
//! run and identical on every participant.
//!
//! - [`assign_worker`]: round-robin owner of an ordinal
//! - [`SavePointIndex`]: where a reduced row lands in the matrix
//! - [`EliminationPlan`]: both tables, built once by the root before round 1

use std::ops::Range;

use serde::Serialize;

use crate::error::{LuError, Result};

/// Worker owning a global row ordinal: `(ordinal mod workers) + 1`.
///
/// Worker ids are ranks, so they start at 1; rank 0 is the root.
pub fn assign_worker(ordinal: usize, workers: usize) -> Result<usize> {
    if workers == 0 {
        return Err(LuError::TooFewWorkers { workers });
    }
    Ok(ordinal % workers + 1)
}

/// Position of a row's leading (pivot-column) entry inside the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SavePoint {
    /// Matrix row
    pub row: usize,
    /// Column of the pivot of the round that reduces this row
    pub col: usize,
}

impl SavePoint {
    /// Diagonal anchor of the pivot row for the round eliminating `column`.
    pub fn diagonal(column: usize) -> Self {
        Self {
            row: column,
            col: column,
        }
    }

    /// Flat row-major offset in an `n x n` buffer.
    pub fn offset(&self, n: usize) -> usize {
        self.row * n + self.col
    }
}

/// Ordinal to save-point table.
///
/// Round `r` works on the active submatrix of size `n - r` and owns ordinals
/// `round_starts[r]..round_starts[r + 1]`.
#[derive(Debug, Clone)]
pub struct SavePointIndex {
    n: usize,
    points: Vec<SavePoint>,
    round_starts: Vec<usize>,
}

impl SavePointIndex {
    /// Enumerate all rounds of an `n x n` elimination.
    pub fn build(n: usize) -> Self {
        let rounds = n.saturating_sub(1);
        let mut points = Vec::with_capacity(n * rounds / 2);
        let mut round_starts = Vec::with_capacity(rounds + 1);

        for column in 0..rounds {
            round_starts.push(points.len());
            for row in (column + 1)..n {
                points.push(SavePoint { row, col: column });
            }
        }
        round_starts.push(points.len());

        Self {
            n,
            points,
            round_starts,
        }
    }

    /// Matrix dimension the index was built for.
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Total number of ordinals, `n (n - 1) / 2`.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of elimination rounds, `n - 1` (zero for a 1x1 matrix).
    pub fn rounds(&self) -> usize {
        self.round_starts.len() - 1
    }

    /// Save point of an ordinal, `None` if the ordinal was never assigned.
    pub fn get(&self, ordinal: usize) -> Option<SavePoint> {
        self.points.get(ordinal).copied()
    }

    /// Ordinals dispatched during `round`, in increasing order.
    pub fn round_ordinals(&self, round: usize) -> Range<usize> {
        match (self.round_starts.get(round), self.round_starts.get(round + 1)) {
            (Some(&start), Some(&end)) => start..end,
            _ => 0..0,
        }
    }

    /// Round that dispatches `ordinal`.
    pub fn round_of(&self, ordinal: usize) -> Option<usize> {
        self.get(ordinal).map(|point| point.col)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, SavePoint)> + '_ {
        self.points.iter().copied().enumerate()
    }
}

/// Row ownership and save points for one run, fixed before the first round.
#[derive(Debug, Clone)]
pub struct EliminationPlan {
    index: SavePointIndex,
    owners: Vec<usize>,
    workers: usize,
}

impl EliminationPlan {
    /// Build the plan for an `n x n` matrix shared among `workers` workers.
    pub fn new(n: usize, workers: usize) -> Result<Self> {
        if n == 0 {
            return Err(LuError::InvalidDimension { n });
        }
        if workers == 0 {
            return Err(LuError::TooFewWorkers { workers });
        }

        let index = SavePointIndex::build(n);
        let owners = (0..index.len())
            .map(|ordinal| assign_worker(ordinal, workers))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            index,
            owners,
            workers,
        })
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn rounds(&self) -> usize {
        self.index.rounds()
    }

    pub fn index(&self) -> &SavePointIndex {
        &self.index
    }

    /// Rank of the worker that reduces `ordinal`.
    pub fn owner(&self, ordinal: usize) -> Option<usize> {
        self.owners.get(ordinal).copied()
    }

    pub fn save_point(&self, ordinal: usize) -> Option<SavePoint> {
        self.index.get(ordinal)
    }

    pub fn round_ordinals(&self, round: usize) -> Range<usize> {
        self.index.round_ordinals(round)
    }

    /// Rows each worker receives over the whole run, indexed by `rank - 1`.
    pub fn rows_per_worker(&self) -> Vec<usize> {
        let mut counts = vec![0; self.workers];
        for &owner in &self.owners {
            counts[owner - 1] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_assign_worker_round_robin() {
        let owners: Vec<usize> = (0..7).map(|g| assign_worker(g, 3).unwrap()).collect();
        assert_eq!(owners, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn test_assign_worker_deterministic() {
        for g in 0..50 {
            assert_eq!(assign_worker(g, 4).unwrap(), assign_worker(g, 4).unwrap());
        }
    }

    #[test]
    fn test_assign_worker_zero_workers() {
        let err = assign_worker(0, 0).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_every_worker_used() {
        let plan = EliminationPlan::new(6, 4).unwrap();
        // 15 rows over 4 workers
        assert_eq!(plan.rows_per_worker(), vec![4, 4, 4, 3]);
        assert!(plan.rows_per_worker().iter().all(|&c| c > 0));
    }

    #[test]
    fn test_index_layout_n3() {
        let index = SavePointIndex::build(3);
        assert_eq!(index.len(), 3);
        assert_eq!(index.rounds(), 2);
        assert_eq!(index.round_ordinals(0), 0..2);
        assert_eq!(index.round_ordinals(1), 2..3);
        assert_eq!(index.get(0), Some(SavePoint { row: 1, col: 0 }));
        assert_eq!(index.get(1), Some(SavePoint { row: 2, col: 0 }));
        assert_eq!(index.get(2), Some(SavePoint { row: 2, col: 1 }));
        assert_eq!(index.get(3), None);
    }

    #[test]
    fn test_index_is_bijection_onto_subdiagonal() {
        for n in 1..12 {
            let index = SavePointIndex::build(n);
            assert_eq!(index.len(), n * (n - 1) / 2);

            let offsets: HashSet<usize> = index.iter().map(|(_, p)| p.offset(n)).collect();
            assert_eq!(offsets.len(), index.len());

            let expected: HashSet<usize> = (0..n)
                .flat_map(|row| (0..row).map(move |col| row * n + col))
                .collect();
            assert_eq!(offsets, expected);
        }
    }

    #[test]
    fn test_round_ranges_cover_all_ordinals() {
        let index = SavePointIndex::build(7);
        let mut next = 0;
        for round in 0..index.rounds() {
            let range = index.round_ordinals(round);
            assert_eq!(range.start, next);
            assert_eq!(range.len(), 7 - 1 - round);
            for g in range.clone() {
                assert_eq!(index.round_of(g), Some(round));
            }
            next = range.end;
        }
        assert_eq!(next, index.len());
        assert!(index.round_ordinals(index.rounds()).is_empty());
    }

    #[test]
    fn test_single_element_matrix_has_no_rounds() {
        let plan = EliminationPlan::new(1, 2).unwrap();
        assert_eq!(plan.rounds(), 0);
        assert!(plan.index().is_empty());
        assert_eq!(plan.rows_per_worker(), vec![0, 0]);
    }

    #[test]
    fn test_plan_rejects_bad_configuration() {
        assert!(matches!(
            EliminationPlan::new(0, 2),
            Err(LuError::InvalidDimension { n: 0 })
        ));
        assert!(matches!(
            EliminationPlan::new(4, 0),
            Err(LuError::TooFewWorkers { workers: 0 })
        ));
    }
}
