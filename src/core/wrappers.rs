//! Wrappers for faer dense matrix types and vector operations.
//!
//! This module implements the operator capability traits for `faer::Mat` and the
//! inner-product trait for `Vec<T>`, so that dense faer matrices can be handed
//! straight to the Chebyshev kernel and its eigenvalue estimators.
//!
//! # Features
//! - Matrix-vector and matrix-transpose-vector multiplication for `faer` dense matrices.
//! - Diagonal extraction and shape queries for `faer` dense matrices.
//! - Inner product and norm operations for vectors, with optional Rayon parallelism.
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)
//! - [num-traits crate documentation](https://docs.rs/num-traits)

use crate::core::traits::{DiagonalExtract, InnerProduct, MatShape, MatTransVec, MatVec};
use faer::Mat;
use num_traits::Float;

/// Implements matrix-vector multiplication for `faer::Mat`.
///
/// Computes `y = A * x` where `A` is a dense matrix, `x` and `y` are vectors.
impl<T: Float> MatVec<Vec<T>> for Mat<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = (0..self.ncols()).fold(T::zero(), |acc, j| acc + self[(i, j)] * x[j]);
        }
    }
}

/// Implements matrix-transpose-vector multiplication for `faer::Mat`.
///
/// Computes `y = A^T * x` where `A` is a dense matrix, `x` and `y` are vectors.
impl<T: Float> MatTransVec<Vec<T>> for Mat<T> {
    fn mattransvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(self.ncols(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.nrows(), x.len(), "Input vector x has incorrect length");
        for (j, yj) in y.iter_mut().enumerate() {
            *yj = (0..self.nrows()).fold(T::zero(), |acc, i| acc + self[(i, j)] * x[i]);
        }
    }
}

impl<T> MatShape for Mat<T> {
    fn nrows(&self) -> usize {
        Mat::nrows(self)
    }
    fn ncols(&self) -> usize {
        Mat::ncols(self)
    }
}

/// Extracts `A[(i, i)]` for every row; rows past the last column read as zero.
impl<T: Float> DiagonalExtract<T> for Mat<T> {
    fn diagonal(&self) -> Vec<T> {
        (0..Mat::nrows(self))
            .map(|i| if i < Mat::ncols(self) { self[(i, i)] } else { T::zero() })
            .collect()
    }
}

/// Implements inner product and norm for vectors, with optional Rayon parallelism.
///
/// If the `rayon` feature is enabled, uses parallel iterators for performance.
impl<T: Float + Send + Sync> InnerProduct<Vec<T>> for () {
    type Scalar = T;
    /// Computes the dot product of two vectors: `x^T y`.
    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            x.as_slice()
                .par_iter()
                .zip(y.as_slice().par_iter())
                .map(|(xi, yi)| *xi * *yi)
                .reduce(|| T::zero(), |acc, v| acc + v)
        }
        #[cfg(not(feature = "rayon"))]
        {
            x.iter()
                .zip(y.iter())
                .map(|(xi, yi)| *xi * *yi)
                .fold(T::zero(), |acc, v| acc + v)
        }
    }
    /// Computes the Euclidean norm of a vector: `||x||_2`.
    fn norm(&self, x: &Vec<T>) -> T {
        self.dot(x, x).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_product_matches_explicit_transpose() {
        let a = Mat::from_fn(2, 3, |i, j| (i * 3 + j) as f64 + 1.0);
        let at = Mat::from_fn(3, 2, |i, j| a[(j, i)]);
        let x = vec![1.0, -2.0];
        let mut y1 = vec![0.0; 3];
        let mut y2 = vec![0.0; 3];
        a.mattransvec(&x, &mut y1);
        at.matvec(&x, &mut y2);
        assert_eq!(y1, y2);
    }

    #[test]
    fn diagonal_of_dense() {
        let a = Mat::from_fn(3, 3, |i, j| if i == j { (i + 1) as f64 } else { 7.0 });
        assert_eq!(DiagonalExtract::diagonal(&a), vec![1.0, 2.0, 3.0]);
        assert_eq!(MatShape::nnz(&a), 9);
    }
}
