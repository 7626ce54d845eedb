//! Preconditioners for linear solvers.
//!
//! This module defines the Preconditioner trait and the two kernels the
//! Chebyshev smoother is made of: the floored inverse diagonal and the
//! polynomial recurrence itself.

use crate::error::KError;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<M, V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &V, z: &mut V) -> Result<(), KError>;
    /// Optionally: setup/factorize from A
    fn setup(&mut self, _a: &M) -> Result<(), KError> { Ok(()) }
}

pub mod chebyshev;
pub mod diagonal;

// Re-exports for convenience
pub use chebyshev::{ChebyshevIterator, SpectralBounds};
pub use diagonal::InverseDiagonal;
