//! Matrix store owned by the root
//!
//! A square row-major buffer that starts as `A` and ends holding the merged
//! factors: multipliers of the unit lower triangular `L` strictly below the
//! diagonal, `U` on and above it.

use ndarray::{Array2, ArrayView1, Zip, s};

use crate::error::{LuError, Result};
use crate::plan::SavePoint;

/// Square matrix factorized in place.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixStore {
    data: Array2<f64>,
}

impl MatrixStore {
    /// Wrap a square array.
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let n = data.nrows();
        if n == 0 {
            return Err(LuError::InvalidDimension { n });
        }
        if n != data.ncols() {
            return Err(LuError::DimensionMismatch {
                expected: n,
                got: data.ncols(),
            });
        }
        Ok(Self {
            data: data.as_standard_layout().into_owned(),
        })
    }

    /// Build from `n * n` values in row-major order.
    pub fn from_row_major(n: usize, values: Vec<f64>) -> Result<Self> {
        if n == 0 {
            return Err(LuError::InvalidDimension { n });
        }
        let got = values.len();
        let data = Array2::from_shape_vec((n, n), values).map_err(|_| {
            LuError::DimensionMismatch {
                expected: n * n,
                got,
            }
        })?;
        Ok(Self { data })
    }

    pub fn dim(&self) -> usize {
        self.data.nrows()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_array(self) -> Array2<f64> {
        self.data
    }

    /// Row-major view of the whole buffer.
    pub fn as_slice(&self) -> &[f64] {
        // from_shape_vec and as_standard_layout both yield C order
        self.data
            .as_slice()
            .expect("matrix store is always in standard layout")
    }

    /// Copy of the row segment starting at `at` and running to the last column.
    pub fn row_tail(&self, at: SavePoint) -> Vec<f64> {
        self.data.slice(s![at.row, at.col..]).to_vec()
    }

    /// Overwrite the row segment starting at `at` with `values` in one step.
    pub fn write_row(&mut self, at: SavePoint, values: &[f64]) -> Result<()> {
        let mut segment = self.data.slice_mut(s![at.row, at.col..]);
        if segment.len() != values.len() {
            return Err(LuError::RowLength {
                expected: segment.len(),
                got: values.len(),
            });
        }
        segment.assign(&ArrayView1::from(values));
        Ok(())
    }

    /// Unit lower triangular factor.
    pub fn lower(&self) -> Array2<f64> {
        let n = self.dim();
        Array2::from_shape_fn((n, n), |(i, j)| match i.cmp(&j) {
            std::cmp::Ordering::Greater => self.data[[i, j]],
            std::cmp::Ordering::Equal => 1.0,
            std::cmp::Ordering::Less => 0.0,
        })
    }

    /// Upper triangular factor, diagonal included.
    pub fn upper(&self) -> Array2<f64> {
        let n = self.dim();
        Array2::from_shape_fn((n, n), |(i, j)| if j >= i { self.data[[i, j]] } else { 0.0 })
    }

    /// `L * U`, which equals the input matrix when no pivot was degenerate.
    pub fn reconstruct(&self) -> Array2<f64> {
        self.lower().dot(&self.upper())
    }
}

/// Largest absolute element-wise difference between two equally shaped arrays.
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> Result<f64> {
    if a.dim() != b.dim() {
        return Err(LuError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(Zip::from(a)
        .and(b)
        .fold(0.0_f64, |acc, &x, &y| acc.max((x - y).abs())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_rejects_non_square() {
        let err = MatrixStore::new(Array2::zeros((2, 3))).unwrap_err();
        assert!(matches!(
            err,
            LuError::DimensionMismatch {
                expected: 2,
                got: 3
            }
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(MatrixStore::new(Array2::zeros((0, 0))).is_err());
        assert!(MatrixStore::from_row_major(0, vec![]).is_err());
        assert!(MatrixStore::from_row_major(2, vec![1.0; 3]).is_err());
    }

    #[test]
    fn test_row_tail_and_write_row() {
        let mut m = MatrixStore::new(array![[4.0, 3.0, 2.0], [2.0, 1.0, 1.0], [1.0, 2.0, 3.0]])
            .unwrap();
        let at = SavePoint { row: 1, col: 0 };
        assert_eq!(m.row_tail(at), vec![2.0, 1.0, 1.0]);

        m.write_row(at, &[0.5, -0.5, 0.0]).unwrap();
        assert_eq!(m.as_slice()[3..6], [0.5, -0.5, 0.0]);
        assert_eq!(m.as_slice()[at.offset(3)], 0.5);

        let err = m.write_row(SavePoint { row: 2, col: 1 }, &[1.0]).unwrap_err();
        assert!(matches!(err, LuError::RowLength { expected: 2, got: 1 }));
    }

    #[test]
    fn test_lower_upper_split() {
        let m = MatrixStore::new(array![[4.0, 3.0], [0.5, -0.5]]).unwrap();
        assert_eq!(m.lower(), array![[1.0, 0.0], [0.5, 1.0]]);
        assert_eq!(m.upper(), array![[4.0, 3.0], [0.0, -0.5]]);

        let a = m.reconstruct();
        assert_relative_eq!(a[[1, 0]], 2.0);
        assert_relative_eq!(a[[1, 1]], 1.0);
    }

    #[test]
    fn test_max_abs_diff() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let b = array![[1.0, 2.5], [2.0, 4.0]];
        assert_relative_eq!(max_abs_diff(&a, &b).unwrap(), 1.0);
        assert_eq!(max_abs_diff(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_max_abs_diff_rejects_different_shapes() {
        let a = Array2::<f64>::zeros((2, 2));
        let b = Array2::<f64>::zeros((3, 3));
        assert!(matches!(
            max_abs_diff(&a, &b),
            Err(LuError::DimensionMismatch { expected: 4, got: 9 })
        ));
    }
}
