//! Core linear-algebra traits for kryst-cheby.
//!
//! The Chebyshev kernel never looks inside the operator. Everything it needs is
//! expressed by the capabilities below; [`LinearOperator`] bundles them.

/// Matrix–vector product: y ← A x.
pub trait MatVec<V> {
    /// Compute y = A · x.
    fn matvec(&self, x: &V, y: &mut V);
}

/// Transposed matrix–vector product: y ← Aᵀ x.
pub trait MatTransVec<V> {
    /// Compute y = Aᵀ · x.
    fn mattransvec(&self, x: &V, y: &mut V);
}

/// Shape queries on an operator.
pub trait MatShape {
    /// Number of rows (range dimension).
    fn nrows(&self) -> usize;
    /// Number of columns (domain dimension).
    fn ncols(&self) -> usize;
    /// Number of stored nonzeros; dense operators report every entry.
    fn nnz(&self) -> usize {
        self.nrows() * self.ncols()
    }
}

/// Access to the row-local diagonal.
pub trait DiagonalExtract<T> {
    /// Return `[a_00, a_11, ...]`, one entry per row.
    fn diagonal(&self) -> Vec<T>;
}

/// Inner products & norms.
pub trait InnerProduct<V> {
    /// Associated scalar type.
    type Scalar: Copy + PartialOrd;
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> Self::Scalar;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> Self::Scalar;
}

/// Everything the Chebyshev kernel requires from the operator it smooths.
pub trait LinearOperator<T>:
    MatVec<Vec<T>> + MatTransVec<Vec<T>> + MatShape + DiagonalExtract<T>
{
}

impl<T, M> LinearOperator<T> for M where
    M: MatVec<Vec<T>> + MatTransVec<Vec<T>> + MatShape + DiagonalExtract<T>
{
}
