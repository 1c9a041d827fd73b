//! Console rendering of matrices and factors

use std::fmt::Write;

use ndarray::Array2;

use crate::matrix::MatrixStore;

/// One line per row, tab separated, two decimals.
pub fn render_matrix(matrix: &Array2<f64>) -> String {
    let mut out = String::new();
    for row in matrix.rows() {
        let line = row
            .iter()
            .map(|v| format!("{v:>7.2}"))
            .collect::<Vec<_>>()
            .join("\t");
        // writing to a String cannot fail
        let _ = writeln!(out, "{line}");
    }
    out
}

/// Unit lower triangular factor of a factorized store.
pub fn render_lower(lu: &MatrixStore) -> String {
    render_matrix(&lu.lower())
}

/// Upper triangular factor of a factorized store.
pub fn render_upper(lu: &MatrixStore) -> String {
    render_matrix(&lu.upper())
}
