// Compressed sparse row operator backed by faer.

use faer::sparse::{
    SparseRowMat,            // owning numeric CSR alias
    SymbolicSparseRowMat,    // owning symbolic CSR alias
};
use num_traits::Float;

use crate::core::traits::{DiagonalExtract, MatShape, MatTransVec, MatVec};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A CSR matrix usable as the operator of the Chebyshev kernel.
pub struct CsrMatrix<T> {
    inner: SparseRowMat<usize, T>,
}

impl<T: Float> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    ///
    /// Column indices must be sorted within each row.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        // second argument `None` means “no separate row_nnz”
        let symbolic = SymbolicSparseRowMat::new_checked(nrows, ncols, row_ptr, None, col_idx);
        let inner = SparseRowMat::new(symbolic, values);
        Self { inner }
    }

    /// Copy the nonzeros of a dense faer matrix.
    pub fn from_dense(a: &faer::Mat<T>) -> Self {
        let (nrows, ncols) = (a.nrows(), a.ncols());
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for i in 0..nrows {
            for j in 0..ncols {
                let v = a[(i, j)];
                if v != T::zero() {
                    col_idx.push(j);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }
        Self::from_csr(nrows, ncols, row_ptr, col_idx, values)
    }

    /// Tridiagonal `[lower, diag, upper]` stencil of size `n`.
    pub fn tridiagonal(n: usize, lower: T, diag: T, upper: T) -> Self {
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::with_capacity(3 * n);
        let mut values = Vec::with_capacity(3 * n);
        row_ptr.push(0);
        for i in 0..n {
            if i > 0 {
                col_idx.push(i - 1);
                values.push(lower);
            }
            col_idx.push(i);
            values.push(diag);
            if i + 1 < n {
                col_idx.push(i + 1);
                values.push(upper);
            }
            row_ptr.push(col_idx.len());
        }
        Self::from_csr(n, n, row_ptr, col_idx, values)
    }

    fn row_ptr(&self) -> &[usize] {
        self.inner.as_ref().symbolic().row_ptr()
    }

    fn col_idx(&self) -> &[usize] {
        self.inner.as_ref().symbolic().col_idx()
    }

    fn values(&self) -> &[T] {
        self.inner.as_ref().val()
    }

    fn row_dot(&self, i: usize, x: &[T]) -> T {
        let (rp, ci, va) = (self.row_ptr(), self.col_idx(), self.values());
        (rp[i]..rp[i + 1]).fold(T::zero(), |acc, k| acc + va[k] * x[ci[k]])
    }
}

impl<T: Float + Send + Sync> MatVec<Vec<T>> for CsrMatrix<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(x.len(), MatShape::ncols(self));
        assert_eq!(y.len(), MatShape::nrows(self));
        #[cfg(feature = "rayon")]
        y.par_iter_mut().enumerate().for_each(|(i, yi)| *yi = self.row_dot(i, x));
        #[cfg(not(feature = "rayon"))]
        y.iter_mut().enumerate().for_each(|(i, yi)| *yi = self.row_dot(i, x));
    }
}

impl<T: Float> MatTransVec<Vec<T>> for CsrMatrix<T> {
    fn mattransvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(x.len(), MatShape::nrows(self));
        assert_eq!(y.len(), MatShape::ncols(self));
        y.iter_mut().for_each(|v| *v = T::zero());
        let (rp, ci, va) = (self.row_ptr(), self.col_idx(), self.values());
        for (i, &xi) in x.iter().enumerate() {
            for k in rp[i]..rp[i + 1] {
                y[ci[k]] = y[ci[k]] + va[k] * xi;
            }
        }
    }
}

impl<T> MatShape for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
    fn nnz(&self) -> usize {
        let rp = self.inner.as_ref().symbolic().row_ptr();
        rp[rp.len() - 1] - rp[0]
    }
}

impl<T: Float> DiagonalExtract<T> for CsrMatrix<T> {
    fn diagonal(&self) -> Vec<T> {
        let (rp, ci, va) = (self.row_ptr(), self.col_idx(), self.values());
        (0..MatShape::nrows(self))
            .map(|i| {
                (rp[i]..rp[i + 1])
                    .filter(|&k| ci[k] == i)
                    .fold(T::zero(), |acc, k| acc + va[k])
            })
            .collect()
    }
}
