//! Spectral bounds from the Lanczos coefficients of a short PCG run.
//!
//! PCG applied to A with preconditioner M produces step lengths αₖ and
//! direction updates βₖ. The symmetric tridiagonal matrix
//!
//! ```text
//! T[0,0]   = 1/α₀
//! T[j,j]   = 1/αⱼ + βⱼ₋₁/αⱼ₋₁
//! T[j,j+1] = T[j+1,j] = √βⱼ / αⱼ
//! ```
//!
//! is the Lanczos matrix of M⁻¹A (Saad §6.7.3); its extreme eigenvalues are
//! Ritz approximations of the extreme eigenvalues of M⁻¹A, from the inside.

use faer::{Mat, Side};
use log::{debug, warn};
use num_traits::Float;

use crate::core::traits::{DiagonalExtract, MatShape, MatVec};
use crate::eigen::{random_vector, EigenEstimate};
use crate::error::KError;
use crate::preconditioner::{InverseDiagonal, Preconditioner};
use crate::solver::{LanczosCoefficients, LinearSolver, PcgSolver};

/// Budget and stopping rule of [`cg_estimate`].
#[derive(Clone, Debug, PartialEq)]
pub struct CgEstimateOptions<T> {
    pub max_iters: usize,
    /// Relative residual at which the PCG run stops early.
    pub tol: T,
    /// Seed of the synthetic right-hand side.
    pub seed: u64,
}

impl<T: Float> CgEstimateOptions<T> {
    pub fn new(max_iters: usize, tol: T) -> Self {
        Self { max_iters, tol, seed: 0x5eed_cafe }
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Estimate `(LambdaMin, LambdaMax)` of `diag(inv_diag)·A` with a Jacobi-PCG
/// run against a random right-hand side.
pub fn cg_estimate<M, T>(
    a: &M,
    inv_diag: &InverseDiagonal<T>,
    opts: &CgEstimateOptions<T>,
) -> Result<EigenEstimate<T>, KError>
where
    M: MatVec<Vec<T>> + MatShape + DiagonalExtract<T>,
    T: Float + Send + Sync,
{
    let n = a.nrows();
    if a.ncols() != n {
        return Err(KError::NotSquare { nrows: n, ncols: a.ncols() });
    }
    if inv_diag.len() != n {
        return Err(KError::ShapeMismatch { what: "inverse diagonal", expected: n, found: inv_diag.len() });
    }
    let rhs = random_vector(n, opts.seed);
    krylov_bounds(a, inv_diag, &rhs, opts.max_iters, opts.tol)
}

/// Extreme Ritz values of `M⁻¹A` from PCG on `A x = rhs`, `x₀ = 0`.
///
/// A breakdown (non-positive curvature or an indefinite preconditioner) ends
/// the run; the coefficients gathered up to that point are still used. Only a
/// breakdown before the first completed step is an error.
pub fn krylov_bounds<M, T>(
    a: &M,
    pc: &dyn Preconditioner<M, Vec<T>>,
    rhs: &[T],
    max_iters: usize,
    tol: T,
) -> Result<EigenEstimate<T>, KError>
where
    M: MatVec<Vec<T>>,
    T: Float + Send + Sync,
{
    let b = rhs.to_vec();
    let mut x = vec![T::zero(); b.len()];
    let mut solver = PcgSolver::new(tol, max_iters).with_lanczos(true);
    let outcome = solver.solve(a, Some(pc), &b, &mut x);
    let coeffs = solver.lanczos.take().unwrap_or_default();

    let converged = match outcome {
        Ok(stats) => stats.converged,
        Err(e @ (KError::IndefiniteMatrix | KError::IndefinitePreconditioner)) => {
            warn!("CG eigenvalue estimation broke down after {} steps: {e}", coeffs.alphas.len());
            false
        }
        Err(e) => return Err(e),
    };
    if coeffs.alphas.is_empty() {
        return Err(KError::Breakdown("no CG step completed; the scaled operator is not positive definite along the start vector".into()));
    }
    let (lambda_min, lambda_max) = tridiagonal_extremes(&coeffs)?;
    debug!(
        "CG estimate: lambda in [{lambda_min:e}, {lambda_max:e}] from {} Lanczos steps (converged: {converged})",
        coeffs.alphas.len()
    );
    let cast = |v: f64| T::from(v).ok_or_else(|| KError::EigenSolve(format!("{v} is not representable")));
    Ok(EigenEstimate {
        lambda_min: Some(cast(lambda_min)?),
        lambda_max: cast(lambda_max)?,
        iterations: coeffs.alphas.len(),
        converged,
    })
}

/// Smallest and largest eigenvalue of the Lanczos tridiagonal matrix.
fn tridiagonal_extremes<T: Float>(coeffs: &LanczosCoefficients<T>) -> Result<(f64, f64), KError> {
    let to_f64 = |v: T| {
        v.to_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| KError::EigenSolve("non-finite Lanczos coefficient".into()))
    };
    let alphas = coeffs.alphas.iter().map(|&v| to_f64(v)).collect::<Result<Vec<_>, _>>()?;
    let betas = coeffs.betas.iter().map(|&v| to_f64(v)).collect::<Result<Vec<_>, _>>()?;
    let k = alphas.len();

    let mut t = Mat::<f64>::zeros(k, k);
    for j in 0..k {
        let mut d = 1.0 / alphas[j];
        if j > 0 {
            d += betas[j - 1] / alphas[j - 1];
        }
        t[(j, j)] = d;
        if j + 1 < k {
            let e = betas[j].sqrt() / alphas[j];
            t[(j, j + 1)] = e;
            t[(j + 1, j)] = e;
        }
    }
    let evd = t
        .as_ref()
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| KError::EigenSolve(format!("{e:?}")))?;
    let s = evd.S();
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for i in 0..k {
        lo = lo.min(s[i]);
        hi = hi.max(s[i]);
    }
    Ok((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::CsrMatrix;
    use approx::assert_relative_eq;
    use faer::Mat;

    fn diag(d: &[f64]) -> Mat<f64> {
        Mat::from_fn(d.len(), d.len(), |i, j| if i == j { d[i] } else { 0.0 })
    }

    #[test]
    fn identity_gives_unit_bounds() {
        let a = diag(&[1.0; 5]);
        let inv = InverseDiagonal::<f64>::ones(5);
        let est = cg_estimate(&a, &inv, &CgEstimateOptions::new(10, 1e-12)).unwrap();
        assert_relative_eq!(est.lambda_max, 1.0, epsilon = 1e-12);
        assert_relative_eq!(est.lambda_min.unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(est.iterations, 1);
        assert!(est.converged);
    }

    #[test]
    fn diagonal_spectrum_is_recovered() {
        let d: Vec<f64> = (1..=8).map(|i| i as f64).collect();
        let a = diag(&d);
        let inv = InverseDiagonal::<f64>::ones(8);
        let est = cg_estimate(&a, &inv, &CgEstimateOptions::new(8, 1e-13)).unwrap();
        assert_relative_eq!(est.lambda_max, 8.0, max_relative = 1e-6);
        assert_relative_eq!(est.lambda_min.unwrap(), 1.0, max_relative = 1e-6);
    }

    #[test]
    fn scaled_laplacian_bounds_lie_inside_true_spectrum() {
        let n = 20;
        let a = CsrMatrix::tridiagonal(n, -1.0, 2.0, -1.0);
        let inv = InverseDiagonal::from_operator(&a, 1e-12).unwrap();
        let est = cg_estimate(&a, &inv, &CgEstimateOptions::new(n, 1e-12)).unwrap();
        let h = std::f64::consts::PI / (n as f64 + 1.0);
        let (true_min, true_max) = (1.0 - h.cos(), 1.0 + h.cos());
        let lmin = est.lambda_min.unwrap();
        assert!(lmin >= true_min - 1e-10 && est.lambda_max <= true_max + 1e-10);
        assert_relative_eq!(est.lambda_max, true_max, max_relative = 1e-4);
        assert_relative_eq!(lmin, true_min, max_relative = 1e-2);
    }

    #[test]
    fn breakdown_keeps_completed_steps() {
        let a = diag(&[1.0, -1.0]);
        let inv = InverseDiagonal::<f64>::ones(2);
        let est = krylov_bounds(&a, &inv, &[1.0, 0.1], 10, 1e-12).unwrap();
        assert_eq!(est.iterations, 1);
        assert!(!est.converged);
        assert_relative_eq!(est.lambda_max, 0.99 / 1.01, epsilon = 1e-12);
    }

    #[test]
    fn breakdown_on_first_step_is_an_error() {
        let a = diag(&[1.0, -5.0]);
        let inv = InverseDiagonal::<f64>::ones(2);
        assert!(matches!(krylov_bounds(&a, &inv, &[1.0, 1.0], 10, 1e-12), Err(KError::Breakdown(_))));
    }
}
