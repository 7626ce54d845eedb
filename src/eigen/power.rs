//! Power iteration for the largest eigenvalue of D⁻¹A.

use log::{debug, trace};
use num_traits::Float;

use crate::core::traits::{InnerProduct, MatShape, MatVec};
use crate::eigen::{random_vector, EigenEstimate};
use crate::error::KError;
use crate::preconditioner::InverseDiagonal;

/// Budget and stopping rule of [`power_method`].
#[derive(Clone, Debug, PartialEq)]
pub struct PowerMethodOptions<T> {
    pub max_iters: usize,
    /// Stop once successive estimates agree to this relative tolerance.
    pub tol: T,
    /// Seed of the random starting vector.
    pub seed: u64,
}

impl<T: Float> PowerMethodOptions<T> {
    pub fn new(max_iters: usize, tol: T) -> Self {
        Self { max_iters, tol, seed: 0x5eed_cafe }
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Estimate the spectral radius of `diag(inv_diag)·A` from the Rayleigh
/// quotients `λ_k = (v_k · D⁻¹A v_k) / (v_k · v_k)`.
///
/// A zero iterate (zero or nilpotent scaled operator) ends the iteration with
/// the estimate reached so far. Running out of iterations is reported through
/// `converged = false`, not as an error.
pub fn power_method<M, T>(
    a: &M,
    inv_diag: &InverseDiagonal<T>,
    opts: &PowerMethodOptions<T>,
) -> Result<EigenEstimate<T>, KError>
where
    M: MatVec<Vec<T>> + MatShape,
    T: Float + Send + Sync,
{
    let n = a.nrows();
    if a.ncols() != n {
        return Err(KError::NotSquare { nrows: n, ncols: a.ncols() });
    }
    if inv_diag.len() != n {
        return Err(KError::ShapeMismatch { what: "inverse diagonal", expected: n, found: inv_diag.len() });
    }
    let ip = ();
    let mut estimate = EigenEstimate { lambda_min: None, lambda_max: T::zero(), iterations: 0, converged: false };

    let mut v: Vec<T> = random_vector(n, opts.seed);
    let v_norm = ip.norm(&v);
    if n == 0 || v_norm == T::zero() {
        return Ok(estimate);
    }
    v.iter_mut().for_each(|vi| *vi = *vi / v_norm);

    let mut y = vec![T::zero(); n];
    let mut previous: Option<T> = None;
    for k in 1..=opts.max_iters {
        a.matvec(&v, &mut y);
        inv_diag.scale_in_place(&mut y);
        let lambda = ip.dot(&y, &v) / ip.dot(&v, &v);
        estimate.lambda_max = lambda;
        estimate.iterations = k;
        trace!("power method iteration {k}: lambda = {:?}", lambda.to_f64());

        if let Some(prev) = previous {
            if (lambda - prev).abs() <= opts.tol * lambda.abs() {
                estimate.converged = true;
                break;
            }
        }
        previous = Some(lambda);

        let y_norm = ip.norm(&y);
        if y_norm == T::zero() || !y_norm.is_finite() {
            debug!("power method stopped at iteration {k}: iterate has norm {:?}", y_norm.to_f64());
            return Ok(estimate);
        }
        for (vi, &yi) in v.iter_mut().zip(&y) {
            *vi = yi / y_norm;
        }
    }
    debug!(
        "power method: lambda_max = {:?} after {} iterations (converged: {})",
        estimate.lambda_max.to_f64(),
        estimate.iterations,
        estimate.converged
    );
    Ok(estimate)
}
