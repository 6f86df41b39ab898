use thiserror::Error;

/// Errors that can occur while inverting a [`DenseMatrix`](crate::DenseMatrix).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InversionError {
    /// No usable pivot was found in a column.
    ///
    /// The matrix is singular, or too close to singular for its scale.
    #[error("matrix is singular: no pivot in column {column} (largest candidate {pivot:e})")]
    Singular { column: usize, pivot: f64 },

    /// The matrix contains a NaN or infinite entry.
    #[error("matrix has a non-finite entry at ({row}, {column})")]
    NonFinite { row: usize, column: usize },

    /// The matrix has no rows.
    #[error("matrix is empty")]
    Empty,
}
