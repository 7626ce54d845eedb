//! Chebyshev semi-iterative smoother.
//!
//! For a target interval `[β, α]` with `β = α / κ`, the iterate
//! `x_{k+1} = x_k + c_k z_k + d_k (x_k − x_{k−1})`, `z_k = D⁻¹ (b − A x_k)`,
//! is the minimax polynomial iteration of Saad, *Iterative Methods for Sparse
//! Linear Systems*, Alg. 12.1, applied to the Jacobi-scaled operator:
//!
//! ```text
//! θ = (α + β)/2,  δ = (α − β)/2,  σ = θ/δ
//! ρ₀ = 1/σ,       ρ_{k+1} = 1 / (2σ − ρ_k)
//! c₀ = 1/θ,       c_k = 2ρ_{k+1}/δ,   d_k = ρ_{k+1} ρ_k
//! ```
//!
//! The residual polynomial after `m` steps is `T_m((θ − λ)/δ) / T_m(σ)`, whose
//! magnitude on `[β, α]` is bounded by `2 ((√κ − 1)/(√κ + 1))^m`.

use num_traits::Float;

use crate::core::traits::{MatTransVec, MatVec};
use crate::error::KError;

/// The spectral interval `[lambda_max / eig_ratio, lambda_max]` targeted by the polynomial.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralBounds<T> {
    /// Advisory only; never enters the recurrence.
    pub lambda_min: Option<T>,
    pub lambda_max: T,
    pub eig_ratio: T,
}

impl<T: Float> SpectralBounds<T> {
    /// Checked constructor: `lambda_max` must be positive and `eig_ratio > 1`.
    pub fn new(lambda_max: T, eig_ratio: T) -> Result<Self, KError> {
        if !lambda_max.is_finite() || lambda_max <= T::zero() {
            return Err(KError::DegenerateSpectrum(format!(
                "lambda_max = {:?} leaves no positive interval (zero or indefinite operator)",
                lambda_max.to_f64()
            )));
        }
        if !eig_ratio.is_finite() || eig_ratio <= T::one() {
            return Err(KError::InvalidOption {
                name: crate::config::options::PARAM_EIG_RATIO,
                reason: format!("interval collapses for eig_ratio = {:?}", eig_ratio.to_f64()),
            });
        }
        Ok(Self { lambda_min: None, lambda_max, eig_ratio })
    }

    pub fn with_lambda_min(mut self, lambda_min: Option<T>) -> Self {
        self.lambda_min = lambda_min;
        self
    }

    /// Effective lower end β of the interval.
    pub fn lower(&self) -> T {
        self.lambda_max / self.eig_ratio
    }

    /// Center θ of the interval.
    pub fn center(&self) -> T {
        (self.lambda_max + self.lower()) / two()
    }

    /// Half-width δ of the interval.
    pub fn half_width(&self) -> T {
        (self.lambda_max - self.lower()) / two()
    }

    /// True when both configured bounds say the scaled operator is the identity.
    pub fn is_identity(&self) -> bool {
        self.lambda_min == Some(T::one()) && self.lambda_max == T::one()
    }
}

fn two<T: Float>() -> T {
    T::one() + T::one()
}

/// Fixed-degree Chebyshev iteration over a validated interval.
#[derive(Clone, Debug)]
pub struct ChebyshevIterator<T> {
    bounds: SpectralBounds<T>,
    degree: usize,
    theta: T,
    delta: T,
    sigma: T,
}

impl<T: Float> ChebyshevIterator<T> {
    pub fn new(bounds: SpectralBounds<T>, degree: usize) -> Self {
        let theta = bounds.center();
        let delta = bounds.half_width();
        Self { bounds, degree, theta, delta, sigma: theta / delta }
    }

    pub fn bounds(&self) -> &SpectralBounds<T> {
        &self.bounds
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Recurrence center θ.
    pub fn theta(&self) -> T {
        self.theta
    }

    /// The `(c_k, d_k)` pairs used by [`apply`](Self::apply), `k = 0..degree`.
    /// `d_0` is zero since there is no previous iterate.
    pub fn coefficients(&self) -> Vec<(T, T)> {
        let mut coeffs = Vec::with_capacity(self.degree);
        if self.degree == 0 {
            return coeffs;
        }
        coeffs.push((T::one() / self.theta, T::zero()));
        let mut rho = T::one() / self.sigma;
        for _ in 1..self.degree {
            let rho_next = T::one() / (two::<T>() * self.sigma - rho);
            coeffs.push((two::<T>() * rho_next / self.delta, rho_next * rho));
            rho = rho_next;
        }
        coeffs
    }

    /// `2 ((√κ − 1)/(√κ + 1))^degree`, capped at 1: the guaranteed residual
    /// reduction when the spectrum of D⁻¹A lies inside the interval.
    pub fn residual_bound(&self) -> T {
        let sk = self.bounds.eig_ratio.sqrt();
        let q = (sk - T::one()) / (sk + T::one());
        let exp = i32::try_from(self.degree).unwrap_or(i32::MAX);
        (two::<T>() * q.powi(exp)).min(T::one())
    }

    /// Estimated flops of one [`apply`](Self::apply) on an operator with `nnz`
    /// nonzeros and `n` rows.
    pub fn flops(&self, n: usize, nnz: usize) -> f64 {
        let steps = self.degree as f64;
        steps * (2.0 * nnz as f64 + 6.0 * n as f64)
    }

    /// Approximate x = A⁻¹ b with `degree` recurrence steps.
    ///
    /// On entry `x` holds x₀ unless `zero_start` is set, in which case it is
    /// overwritten with zeros first. With `transpose`, Aᵀ replaces A.
    /// `degree == 0` leaves x₀ in place.
    #[allow(clippy::ptr_arg)]
    pub fn apply<M>(
        &self,
        a: &M,
        inv_diag: &[T],
        b: &[T],
        x: &mut Vec<T>,
        zero_start: bool,
        transpose: bool,
    ) -> Result<(), KError>
    where
        M: MatVec<Vec<T>> + MatTransVec<Vec<T>>,
    {
        let n = b.len();
        if inv_diag.len() != n {
            return Err(KError::ShapeMismatch { what: "inverse diagonal", expected: n, found: inv_diag.len() });
        }
        if x.len() != n {
            return Err(KError::ShapeMismatch { what: "solution vector", expected: n, found: x.len() });
        }
        if zero_start {
            x.iter_mut().for_each(|xi| *xi = T::zero());
        }
        if self.degree == 0 {
            return Ok(());
        }

        let mut ax = vec![T::zero(); n];
        // w = (x_{k+1} − x_k), first step: w = D⁻¹ r₀ / θ
        let mut w = if zero_start {
            b.to_vec()
        } else {
            residual(a, x, b, &mut ax, transpose)
        };
        let inv_theta = T::one() / self.theta;
        for (wi, &di) in w.iter_mut().zip(inv_diag) {
            *wi = *wi * di * inv_theta;
        }
        axpy(x, &w);

        let mut rho = T::one() / self.sigma;
        for _ in 1..self.degree {
            let r = residual(a, x, b, &mut ax, transpose);
            let rho_next = T::one() / (two::<T>() * self.sigma - rho);
            let d = rho_next * rho;
            let c = two::<T>() * rho_next / self.delta;
            for ((wi, &ri), &di) in w.iter_mut().zip(&r).zip(inv_diag) {
                *wi = d * *wi + c * di * ri;
            }
            axpy(x, &w);
            rho = rho_next;
        }
        Ok(())
    }
}

/// r = b − op(A)·x, using `ax` as scratch.
#[allow(clippy::ptr_arg)]
fn residual<M, T>(a: &M, x: &Vec<T>, b: &[T], ax: &mut Vec<T>, transpose: bool) -> Vec<T>
where
    M: MatVec<Vec<T>> + MatTransVec<Vec<T>>,
    T: Float,
{
    if transpose {
        a.mattransvec(x, ax);
    } else {
        a.matvec(x, ax);
    }
    b.iter().zip(ax.iter()).map(|(&bi, &axi)| bi - axi).collect()
}

fn axpy<T: Float>(x: &mut [T], w: &[T]) {
    for (xi, &wi) in x.iter_mut().zip(w) {
        *xi = *xi + wi;
    }
}
