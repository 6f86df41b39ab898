//! Dense matrix kernel for equipment-level linear systems.
//!
//! Equipment models assemble a small dense system every time their flow
//! state changes, invert it once, and then reuse the inverse to map inlet
//! conditions onto outlet conditions. This crate provides only what that
//! needs: an owned square matrix backed by `nalgebra`, matrix-vector
//! products, and in-place LU inversion with a scale-aware singularity test.

mod error;
mod matrix;

pub use error::InversionError;
pub use matrix::DenseMatrix;
