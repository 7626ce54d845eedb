//! Lifecycle driver for the Chebyshev preconditioner.
//!
//! A [`ChebyshevContext`] borrows the operator for its whole lifetime and walks
//! the state machine
//!
//! ```text
//! Uninitialized --initialize--> Initialized --compute--> Computed --apply_inverse--> Computed
//!                                    ^                       |
//!                                    +------ initialize -----+  (compute may be repeated)
//! ```
//!
//! Calling a phase out of order is reported as an error; no missing phase is
//! ever re-run behind the caller's back.

use std::fmt;
use std::time::Instant;

use log::{debug, warn};
use num_traits::Float;

use crate::config::options::{ChebyshevFlags, ChebyshevOptions, EigenEstimator, ParameterValue};
use crate::core::traits::LinearOperator;
use crate::eigen::{
    cg_estimate, krylov_bounds, power_method, CgEstimateOptions, EigenEstimate, PowerMethodOptions,
};
use crate::error::KError;
use crate::preconditioner::{ChebyshevIterator, InverseDiagonal, Preconditioner, SpectralBounds};
use crate::utils::metrics::{ApplyStats, PhaseMetrics};

/// Externally visible phase of a [`ChebyshevContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Computed,
}

/// How [`ChebyshevContext::condest`] estimates the condition number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CondestType<T> {
    /// `‖M⁻¹e‖∞ / ‖e‖∞` for the all-ones vector `e`.
    Cheap,
    /// `λmax / λmin` of `M⁻¹A`, from the Lanczos coefficients of a PCG run
    /// preconditioned by this kernel.
    Krylov { max_iters: usize, tol: T },
}

/// Data that exists only once Compute has succeeded.
#[derive(Clone, Debug)]
struct ComputedData<T> {
    inv_diag: InverseDiagonal<T>,
    iterator: ChebyshevIterator<T>,
    /// `None` when LambdaMax was supplied by the caller.
    estimate: Option<EigenEstimate<T>>,
    /// Both bounds configured as exactly 1.
    identity: bool,
}

#[derive(Clone, Debug)]
enum Phase<T> {
    Uninitialized,
    Initialized,
    Computed(Box<ComputedData<T>>),
}

/// Chebyshev polynomial preconditioner over a borrowed operator.
pub struct ChebyshevContext<'a, M, T> {
    op: &'a M,
    options: ChebyshevOptions<T>,
    phase: Phase<T>,
    metrics: PhaseMetrics,
    condest: Option<T>,
    num_rows: usize,
    nnz: usize,
}

impl<'a, M, T> ChebyshevContext<'a, M, T>
where
    M: LinearOperator<T>,
    T: Float + Send + Sync,
{
    pub fn new(op: &'a M, options: ChebyshevOptions<T>) -> Self {
        Self {
            op,
            options,
            phase: Phase::Uninitialized,
            metrics: PhaseMetrics::default(),
            condest: None,
            num_rows: 0,
            nnz: 0,
        }
    }

    /// Replace the configuration. The context has to be initialized again.
    pub fn set_options(&mut self, options: ChebyshevOptions<T>) {
        self.options = options;
        self.invalidate();
    }

    /// Apply one named parameter. The context has to be initialized again.
    pub fn set_parameter(&mut self, name: &str, value: ParameterValue<T>) -> Result<(), KError> {
        self.options.set_parameter(name, value)?;
        self.invalidate();
        Ok(())
    }

    fn invalidate(&mut self) {
        self.phase = Phase::Uninitialized;
        self.condest = None;
    }

    /// Validate the configuration and the operator shape, record structural
    /// information and reset the Compute/ApplyInverse counters.
    pub fn initialize(&mut self) -> Result<(), KError> {
        let start = Instant::now();
        self.invalidate();
        self.options.validate()?;
        let (nrows, ncols) = (self.op.nrows(), self.op.ncols());
        if nrows != ncols {
            return Err(KError::NotSquare { nrows, ncols });
        }
        self.num_rows = nrows;
        self.nnz = self.op.nnz();
        self.metrics.reset_compute_and_apply();
        self.metrics.record_initialize(start.elapsed());
        self.phase = Phase::Initialized;
        debug!("chebyshev initialize: {} rows, {} nonzeros", self.num_rows, self.nnz);
        Ok(())
    }

    /// Build the inverse diagonal and the spectral interval. Re-running it
    /// rebuilds both from the current operator values.
    ///
    /// On failure the context is left Initialized.
    pub fn compute(&mut self) -> Result<(), KError> {
        if matches!(self.phase, Phase::Uninitialized) {
            return Err(KError::NotInitialized);
        }
        let start = Instant::now();
        self.phase = Phase::Initialized;
        self.condest = None;

        let data = self.build()?;
        let mut flops = self.num_rows as f64;
        if let Some(est) = &data.estimate {
            flops += est.iterations as f64 * (2.0 * self.nnz as f64 + 5.0 * self.num_rows as f64);
        }
        self.metrics.record_compute(start.elapsed(), flops);
        self.phase = Phase::Computed(Box::new(data));

        if self.options.flags.contains(ChebyshevFlags::COMPUTE_CONDEST) {
            if let Err(e) = self.condest(CondestType::Cheap) {
                warn!("condition estimate skipped: {e}");
            }
        }
        Ok(())
    }

    fn build(&self) -> Result<ComputedData<T>, KError> {
        let opts = &self.options;
        let inv_diag = InverseDiagonal::from_operator(self.op, opts.min_diagonal_value)?;
        if inv_diag.len() != self.num_rows {
            return Err(KError::ShapeMismatch { what: "diagonal", expected: self.num_rows, found: inv_diag.len() });
        }

        let (bounds, estimate) = match opts.lambda_max {
            Some(lambda_max) => {
                let bounds = SpectralBounds::new(lambda_max, opts.eig_ratio)?.with_lambda_min(opts.lambda_min);
                (bounds, None)
            }
            None => {
                let est = match opts.estimator {
                    EigenEstimator::PowerMethod => {
                        let po = PowerMethodOptions::new(opts.eigen_max_iters, opts.eigen_tol).with_seed(opts.seed);
                        power_method(self.op, &inv_diag, &po)?
                    }
                    EigenEstimator::Cg => {
                        let co = CgEstimateOptions::new(opts.eigen_max_iters, opts.eigen_tol).with_seed(opts.seed);
                        cg_estimate(self.op, &inv_diag, &co)?
                    }
                };
                if !est.converged {
                    debug!("eigenvalue estimate did not converge in {} iterations", est.iterations);
                }
                let lambda_max = est.lambda_max * opts.boost_factor;
                let bounds = SpectralBounds::new(lambda_max, opts.eig_ratio)?
                    .with_lambda_min(opts.lambda_min.or(est.lambda_min));
                (bounds, Some(est))
            }
        };
        debug!(
            "chebyshev compute: degree {}, interval [{:?}, {:?}], {} floored diagonal entries",
            opts.degree,
            bounds.lower().to_f64(),
            bounds.lambda_max.to_f64(),
            inv_diag.num_floored()
        );
        let identity = estimate.is_none() && bounds.is_identity();
        Ok(ComputedData {
            inv_diag,
            iterator: ChebyshevIterator::new(bounds, opts.degree),
            estimate,
            identity,
        })
    }

    fn computed(&self) -> Result<&ComputedData<T>, KError> {
        match &self.phase {
            Phase::Computed(data) => Ok(data),
            _ => Err(KError::NotComputed),
        }
    }

    fn check_len(&self, what: &'static str, len: usize) -> Result<(), KError> {
        if len != self.num_rows {
            return Err(KError::ShapeMismatch { what, expected: self.num_rows, found: len });
        }
        Ok(())
    }

    /// x ≈ A⁻¹ b by `degree` Chebyshev steps.
    ///
    /// `x` is the starting guess unless ZeroStartingSolution is set. Nothing in
    /// the context changes; fold the returned stats in with
    /// [`record_apply`](Self::record_apply) to keep the counters.
    #[allow(clippy::ptr_arg)]
    pub fn apply_inverse(&self, b: &[T], x: &mut Vec<T>) -> Result<ApplyStats, KError> {
        self.apply_inverse_from(b, x, self.options.zero_starting_solution())
    }

    #[allow(clippy::ptr_arg)]
    fn apply_inverse_from(&self, b: &[T], x: &mut Vec<T>, zero_start: bool) -> Result<ApplyStats, KError> {
        let data = self.computed()?;
        self.check_len("right-hand side", b.len())?;
        self.check_len("solution vector", x.len())?;
        let start = Instant::now();
        if data.identity {
            x.copy_from_slice(b);
            return Ok(ApplyStats { elapsed: start.elapsed(), flops: 0.0 });
        }
        data.iterator.apply(
            self.op,
            data.inv_diag.as_slice(),
            b,
            x,
            zero_start,
            self.options.use_transpose(),
        )?;
        Ok(ApplyStats {
            elapsed: start.elapsed(),
            flops: data.iterator.flops(self.num_rows, self.nnz),
        })
    }

    /// y = A x, or Aᵀ x in transpose mode.
    #[allow(clippy::ptr_arg)]
    pub fn apply(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        if matches!(self.phase, Phase::Uninitialized) {
            return Err(KError::NotInitialized);
        }
        self.check_len("input vector", x.len())?;
        self.check_len("output vector", y.len())?;
        if self.options.use_transpose() {
            self.op.mattransvec(x, y);
        } else {
            self.op.matvec(x, y);
        }
        Ok(())
    }

    /// Estimate the condition number of the preconditioned operator.
    ///
    /// The value is cached until the next Compute or Initialize; a cached
    /// value is returned regardless of `kind`.
    pub fn condest(&mut self, kind: CondestType<T>) -> Result<T, KError> {
        if let Some(c) = self.condest {
            return Ok(c);
        }
        self.computed()?;
        let n = self.num_rows;
        let value = match kind {
            CondestType::Cheap => {
                let ones = vec![T::one(); n];
                let mut z = vec![T::zero(); n];
                self.apply_inverse_from(&ones, &mut z, true)?;
                z.iter().fold(T::zero(), |m, &v| m.max(v.abs()))
            }
            CondestType::Krylov { max_iters, tol } => {
                let ones = vec![T::one(); n];
                let est = krylov_bounds(self.op, &*self, &ones, max_iters, tol)?;
                match est.lambda_min {
                    Some(lmin) if lmin > T::zero() => est.lambda_max / lmin,
                    _ => {
                        return Err(KError::DegenerateSpectrum(
                            "preconditioned operator has a non-positive Ritz value".into(),
                        ));
                    }
                }
            }
        };
        debug!("chebyshev condest: {:?}", value.to_f64());
        self.condest = Some(value);
        Ok(value)
    }

    /// Last computed condition estimate, if any.
    pub fn condest_value(&self) -> Option<T> {
        self.condest
    }

    pub fn state(&self) -> LifecycleState {
        match self.phase {
            Phase::Uninitialized => LifecycleState::Uninitialized,
            Phase::Initialized => LifecycleState::Initialized,
            Phase::Computed(_) => LifecycleState::Computed,
        }
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.phase, Phase::Uninitialized)
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.phase, Phase::Computed(_))
    }

    pub fn metrics(&self) -> &PhaseMetrics {
        &self.metrics
    }

    /// Add the cost of one [`apply_inverse`](Self::apply_inverse) call to the counters.
    pub fn record_apply(&mut self, stats: &ApplyStats) {
        self.metrics.record_apply(stats);
    }

    pub fn options(&self) -> &ChebyshevOptions<T> {
        &self.options
    }

    pub fn operator(&self) -> &'a M {
        self.op
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn nnz(&self) -> usize {
        self.nnz
    }

    pub fn degree(&self) -> usize {
        self.options.degree
    }

    /// LambdaMax in use after Compute (estimated and boosted, or configured).
    pub fn lambda_max(&self) -> Option<T> {
        self.computed().ok().map(|d| d.iterator.bounds().lambda_max)
    }

    /// LambdaMin as configured or as found by the CG estimator.
    pub fn lambda_min(&self) -> Option<T> {
        self.computed().ok().and_then(|d| d.iterator.bounds().lambda_min)
    }

    pub fn inverse_diagonal(&self) -> Option<&InverseDiagonal<T>> {
        self.computed().ok().map(|d| &d.inv_diag)
    }

    /// Output of the eigenvalue estimator from the last Compute, if it ran.
    pub fn eigen_estimate(&self) -> Option<&EigenEstimate<T>> {
        self.computed().ok().and_then(|d| d.estimate.as_ref())
    }

    /// One-line description of the configured polynomial.
    pub fn label(&self) -> String {
        let fmt_opt = |v: Option<T>| match v.and_then(|v| v.to_f64()) {
            Some(v) => format!("{v:.4e}"),
            None => "-".to_string(),
        };
        let lmax = self.lambda_max().or(self.options.lambda_max);
        format!(
            "Chebyshev(degree={}, lambda_max={}, eig_ratio={})",
            self.options.degree,
            fmt_opt(lmax),
            fmt_opt(Some(self.options.eig_ratio))
        )
    }
}

impl<M, T> fmt::Display for ChebyshevContext<'_, M, T>
where
    M: LinearOperator<T>,
    T: Float + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label())?;
        writeln!(f, "state: {:?}, rows: {}, nonzeros: {}", self.state(), self.num_rows, self.nnz)?;
        if let Some(c) = self.condest.and_then(|c| c.to_f64()) {
            writeln!(f, "condition estimate: {c:.4e}")?;
        }
        write!(f, "{}", self.metrics)
    }
}

/// The context as M⁻¹ inside an outer Krylov solver. Every application starts
/// from zero so the preconditioner stays a fixed linear operator.
impl<M, T> Preconditioner<M, Vec<T>> for ChebyshevContext<'_, M, T>
where
    M: LinearOperator<T>,
    T: Float + Send + Sync,
{
    fn apply(&self, r: &Vec<T>, z: &mut Vec<T>) -> Result<(), KError> {
        self.apply_inverse_from(r, z, true).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use faer::Mat;

    fn diag(d: &[f64]) -> Mat<f64> {
        Mat::from_fn(d.len(), d.len(), |i, j| if i == j { d[i] } else { 0.0 })
    }

    #[test]
    fn phases_must_run_in_order() {
        let a = diag(&[2.0, 4.0]);
        let mut ctx = ChebyshevContext::new(&a, ChebyshevOptions::default().with_lambda_max(4.0));
        let mut x = vec![0.0; 2];
        assert_eq!(ctx.state(), LifecycleState::Uninitialized);
        assert_eq!(ctx.compute(), Err(KError::NotInitialized));
        assert_eq!(ctx.apply_inverse(&[1.0, 1.0], &mut x), Err(KError::NotComputed));
        ctx.initialize().unwrap();
        assert_eq!(ctx.apply_inverse(&[1.0, 1.0], &mut x), Err(KError::NotComputed));
        ctx.compute().unwrap();
        assert_eq!(ctx.state(), LifecycleState::Computed);
        assert!(ctx.apply_inverse(&[1.0, 1.0], &mut x).is_ok());
        ctx.initialize().unwrap();
        assert!(ctx.inverse_diagonal().is_none());
        assert_eq!(ctx.state(), LifecycleState::Initialized);
    }

    #[test]
    fn non_square_operator_is_rejected() {
        let a = Mat::<f64>::zeros(2, 3);
        let mut ctx = ChebyshevContext::new(&a, ChebyshevOptions::default());
        assert_eq!(ctx.initialize(), Err(KError::NotSquare { nrows: 2, ncols: 3 }));
        assert_eq!(ctx.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn failed_compute_stays_initialized() {
        let a = diag(&[0.0, 0.0]);
        let mut ctx = ChebyshevContext::new(&a, ChebyshevOptions::default());
        ctx.initialize().unwrap();
        assert!(matches!(ctx.compute(), Err(KError::DegenerateSpectrum(_))));
        assert_eq!(ctx.state(), LifecycleState::Initialized);
        assert_eq!(ctx.metrics().num_compute, 0);
    }

    #[test]
    fn zero_estimator_budget_is_a_configuration_error() {
        let a = diag(&[2.0, 4.0]);
        let mut opts = ChebyshevOptions::default();
        opts.eigen_max_iters = 0;
        let mut ctx = ChebyshevContext::new(&a, opts);
        assert!(matches!(ctx.initialize(), Err(KError::InvalidOption { .. })));
        assert_eq!(ctx.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn configured_identity_copies_rhs() {
        let a = diag(&[3.0, 5.0, 7.0]);
        let opts = ChebyshevOptions::default().with_lambda_max(1.0).with_lambda_min(1.0).with_degree(4);
        let mut ctx = ChebyshevContext::new(&a, opts);
        ctx.initialize().unwrap();
        ctx.compute().unwrap();
        let mut x = vec![0.0; 3];
        ctx.apply_inverse(&[1.0, -2.0, 3.0], &mut x).unwrap();
        assert_eq!(x, vec![1.0, -2.0, 3.0]);
    }

    #[test]
    fn boost_applies_to_estimate_only() {
        let a = diag(&[2.0, 4.0]);
        let opts = ChebyshevOptions::default().with_boost_factor(1.1);
        let mut ctx = ChebyshevContext::new(&a, opts);
        ctx.initialize().unwrap();
        ctx.compute().unwrap();
        assert_relative_eq!(ctx.lambda_max().unwrap(), 1.1, epsilon = 1e-12);

        ctx.set_options(ChebyshevOptions::default().with_boost_factor(1.1).with_lambda_max(4.0));
        ctx.initialize().unwrap();
        ctx.compute().unwrap();
        assert_eq!(ctx.lambda_max(), Some(4.0));
        assert!(ctx.eigen_estimate().is_none());
    }

    #[test]
    fn forward_apply_uses_operator() {
        let a = Mat::from_fn(2, 2, |i, j| [[1.0, 2.0], [3.0, 4.0]][i][j]);
        let mut ctx = ChebyshevContext::new(&a, ChebyshevOptions::default());
        ctx.initialize().unwrap();
        let mut y = vec![0.0; 2];
        ctx.apply(&vec![1.0, 1.0], &mut y).unwrap();
        assert_eq!(y, vec![3.0, 7.0]);
        ctx.set_options(ChebyshevOptions::default().with_transpose(true));
        ctx.initialize().unwrap();
        ctx.apply(&vec![1.0, 1.0], &mut y).unwrap();
        assert_eq!(y, vec![4.0, 6.0]);
    }

    #[test]
    fn label_mentions_degree() {
        let a = diag(&[1.0]);
        let ctx = ChebyshevContext::new(&a, ChebyshevOptions::default().with_degree(3));
        assert!(ctx.label().contains("degree=3"));
        assert!(ctx.to_string().contains("Uninitialized"));
    }
}
