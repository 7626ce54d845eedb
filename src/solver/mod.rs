//! Krylov solver interfaces.
//!
//! Only PCG is provided: it is the outer solver the Chebyshev smoother is
//! normally paired with, and its coefficient recurrence doubles as the
//! Lanczos process behind the CG-based eigenvalue estimator.

use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Common interface for any iterative solver.
pub trait LinearSolver<M, V> {
    type Error;
    type Scalar: Copy + PartialOrd;
    /// Solve A·x = b, writing result into `x` (which holds the initial guess).
    /// Returns iteration stats (including convergence info).
    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        b: &V,
        x: &mut V,
    ) -> Result<SolveStats<Self::Scalar>, Self::Error>;
}

pub mod pcg;
pub use pcg::{LanczosCoefficients, PcgSolver};
