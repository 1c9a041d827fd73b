//! Random test matrices

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::matrix::MatrixStore;

/// Smallest generated value
pub const VALUE_MIN: i32 = -50;
/// Largest generated value
pub const VALUE_MAX: i32 = 50;

/// `n x n` matrix of integers drawn uniformly from `[VALUE_MIN, VALUE_MAX]`.
///
/// A fixed `seed` gives the same matrix on every call.
pub fn random_matrix(n: usize, seed: Option<u64>) -> Result<MatrixStore> {
    let mut rng: StdRng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => {
            let mut thread_rng = rand::rng();
            StdRng::from_rng(&mut thread_rng)
        }
    };

    let values = (0..n * n)
        .map(|_| f64::from(rng.random_range(VALUE_MIN..=VALUE_MAX)))
        .collect();
    MatrixStore::from_row_major(n, values)
}
