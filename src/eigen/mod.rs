//! Extremal eigenvalue estimation for the Jacobi-scaled operator D⁻¹A.
//!
//! Two independent strategies:
//! - [`power::power_method`]: dominant eigenvalue by power iteration; cheap,
//!   yields LambdaMax only.
//! - [`lanczos::cg_estimate`]: Ritz values of the tridiagonal Lanczos matrix
//!   implied by a short PCG run; yields LambdaMin and LambdaMax.
//!
//! Both treat reaching the iteration budget as a normal outcome and report it
//! through [`EigenEstimate::converged`] rather than as an error.

pub mod lanczos;
pub mod power;

pub use lanczos::{cg_estimate, krylov_bounds, CgEstimateOptions};
pub use power::{power_method, PowerMethodOptions};

use num_traits::Float;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Result of an eigenvalue estimator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EigenEstimate<T> {
    /// Only the Krylov estimator provides a lower bound.
    pub lambda_min: Option<T>,
    pub lambda_max: T,
    pub iterations: usize,
    /// `false` when the budget ran out or the iteration broke down early.
    pub converged: bool,
}

/// Deterministic pseudo-random vector with entries in `[-1, 1)`.
pub(crate) fn random_vector<T: Float>(n: usize, seed: u64) -> Vec<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| T::from(rng.gen_range(-1.0f64..1.0)).unwrap_or_else(T::one))
        .collect()
}
