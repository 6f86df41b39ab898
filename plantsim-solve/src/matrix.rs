use std::ops::{Index, IndexMut};

use nalgebra::{DMatrix, DVector};

use crate::InversionError;

/// An owned, square, dense matrix indexed by `(row, column)`.
///
/// This is a narrow utility for equipment models, not a general linear
/// algebra type: it only knows how to be filled, multiplied by a vector or
/// matrix, and inverted.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    data: DMatrix<f64>,
}

impl DenseMatrix {
    /// Creates an `n × n` matrix of zeros.
    #[must_use]
    pub fn zeros(n: usize) -> Self {
        Self {
            data: DMatrix::zeros(n, n),
        }
    }

    /// Number of rows (and columns).
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.nrows()
    }

    /// Adds `value` to the entry at `(row, column)`.
    pub fn add(&mut self, row: usize, column: usize, value: f64) {
        self.data[(row, column)] += value;
    }

    /// Returns `self · v`.
    ///
    /// # Panics
    ///
    /// Panics if `v.len()` differs from the matrix dimension.
    #[must_use]
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        let v = DVector::from_column_slice(v);
        (&self.data * v).iter().copied().collect()
    }

    /// Returns `self · other`.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    #[must_use]
    pub fn mul_mat(&self, other: &DenseMatrix) -> DenseMatrix {
        DenseMatrix {
            data: &self.data * &other.data,
        }
    }

    /// Inverts the matrix in place through an LU decomposition with partial
    /// pivoting.
    ///
    /// A pivot at or below `n · ε · max|a_ij|` is treated as zero.
    ///
    /// On error the matrix is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an [`InversionError`] if the matrix is empty, contains a
    /// non-finite entry, or is singular.
    pub fn invert(&mut self) -> Result<(), InversionError> {
        let n = self.dim();
        if n == 0 {
            return Err(InversionError::Empty);
        }

        for column in 0..n {
            for row in 0..n {
                if !self.data[(row, column)].is_finite() {
                    return Err(InversionError::NonFinite { row, column });
                }
            }
        }

        let scale = self.data.amax();
        #[allow(clippy::cast_precision_loss)]
        let tolerance = scale * f64::EPSILON * n as f64;

        let lu = self.data.clone().lu();
        let (column, pivot) = lu
            .u()
            .diagonal()
            .iter()
            .map(|d| d.abs())
            .enumerate()
            .fold((0, f64::INFINITY), |smallest, candidate| {
                if candidate.1 < smallest.1 { candidate } else { smallest }
            });
        if pivot <= tolerance {
            return Err(InversionError::Singular { column, pivot });
        }

        self.data = lu
            .try_inverse()
            .ok_or(InversionError::Singular { column, pivot })?;
        Ok(())
    }
}

impl Index<(usize, usize)> for DenseMatrix {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.data[index]
    }
}

impl IndexMut<(usize, usize)> for DenseMatrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f64 {
        &mut self.data[index]
    }
}
