//! Forward-elimination kernel
//!
//! Reduces one target row against the pivot row of the current round. The
//! reduced row keeps the multiplier in its leading slot (the L entry) and the
//! updated trailing coefficients after it (the U block).

/// Whether a pivot row has an exactly-zero leading entry.
pub fn is_degenerate(pivot: &[f64]) -> bool {
    pivot.first().is_some_and(|&lead| lead == 0.0)
}

/// L multiplier for a target row. A zero pivot yields a zero multiplier.
pub fn multiplier(pivot_lead: f64, target_lead: f64) -> f64 {
    if pivot_lead == 0.0 {
        0.0
    } else {
        target_lead / pivot_lead
    }
}

/// Reduce `target` against `pivot`; both rows have the active submatrix length.
///
/// `R[0] = T[0] / P[0]` and `R[k] = T[k] - P[k] * R[0]` for `k >= 1`.
pub fn eliminate(pivot: &[f64], target: &[f64]) -> Vec<f64> {
    debug_assert_eq!(pivot.len(), target.len());

    let (Some(&pivot_lead), Some(&target_lead)) = (pivot.first(), target.first()) else {
        return Vec::new();
    };

    let mult = multiplier(pivot_lead, target_lead);
    let mut reduced = Vec::with_capacity(target.len());
    reduced.push(mult);
    reduced.extend(
        target[1..]
            .iter()
            .zip(&pivot[1..])
            .map(|(&t, &p)| t - p * mult),
    );
    reduced
}
