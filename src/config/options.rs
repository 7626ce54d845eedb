//! API options for the Chebyshev preconditioner.
//!
//! This module provides the `ChebyshevOptions` struct, which holds every knob of
//! the Chebyshev smoother as a plain value. Options can be set field by field, with
//! the `with_*` builders, or from a flat list of named parameters (the
//! `"chebyshev: ..."` names used by the ML/Ifpack family of smoothers).

use bitflags::bitflags;
use num_traits::Float;

use crate::error::KError;

bitflags! {
    /// Behavioural switches for one Compute/ApplyInverse cycle.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ChebyshevFlags: u32 {
        /// Start every ApplyInverse from x₀ = 0 instead of the caller's vector.
        const ZERO_STARTING_SOLUTION = 0b0000_0001;
        /// Apply Aᵀ in place of A throughout the recurrence.
        const USE_TRANSPOSE          = 0b0000_0010;
        /// Compute the cheap condition estimate at the end of Compute.
        const COMPUTE_CONDEST        = 0b0000_0100;
    }
}

impl Default for ChebyshevFlags {
    fn default() -> Self {
        ChebyshevFlags::ZERO_STARTING_SOLUTION
    }
}

/// Strategy used by Compute to estimate the spectrum when LambdaMax is not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EigenEstimator {
    /// Power iteration on D⁻¹A; yields LambdaMax only.
    #[default]
    PowerMethod,
    /// Lanczos coefficients harvested from a short PCG run; yields both bounds.
    Cg,
}

/// A single value of the flat parameter mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue<T> {
    Real(T),
    Int(i64),
    Bool(bool),
    Str(String),
}

pub const PARAM_EIG_RATIO: &str = "chebyshev: ratio eigenvalue";
pub const PARAM_LAMBDA_MIN: &str = "chebyshev: min eigenvalue";
pub const PARAM_LAMBDA_MAX: &str = "chebyshev: max eigenvalue";
pub const PARAM_DEGREE: &str = "chebyshev: degree";
pub const PARAM_MIN_DIAGONAL: &str = "chebyshev: min diagonal value";
pub const PARAM_ZERO_START: &str = "chebyshev: zero starting solution";
pub const PARAM_USE_TRANSPOSE: &str = "chebyshev: use transpose";
pub const PARAM_COMPUTE_CONDEST: &str = "chebyshev: compute condest";
pub const PARAM_EIGEN_MAX_ITERS: &str = "chebyshev: eigenvalue max iterations";
pub const PARAM_EIGEN_TOL: &str = "chebyshev: eigenvalue tolerance";
pub const PARAM_ESTIMATOR: &str = "chebyshev: eigenvalue estimator";
pub const PARAM_BOOST: &str = "chebyshev: boost factor";
pub const PARAM_SEED: &str = "chebyshev: random seed";

/// Chebyshev preconditioner parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChebyshevOptions<T> {
    /// Ratio κ such that `[lambda_max / eig_ratio, lambda_max]` is the target interval.
    pub eig_ratio: T,
    /// Advisory smallest eigenvalue; only used to detect an identity operator.
    pub lambda_min: Option<T>,
    /// Largest eigenvalue of D⁻¹A. Estimated during Compute when `None`.
    pub lambda_max: Option<T>,
    /// Number of recurrence steps per ApplyInverse.
    pub degree: usize,
    /// Diagonal entries smaller than this in magnitude are not inverted directly.
    pub min_diagonal_value: T,
    pub flags: ChebyshevFlags,
    /// Iteration budget of the eigenvalue estimator.
    pub eigen_max_iters: usize,
    /// Relative stopping tolerance of the eigenvalue estimator.
    pub eigen_tol: T,
    pub estimator: EigenEstimator,
    /// Multiplier (≥ 1) applied to an estimated LambdaMax. The default of 1.1
    /// keeps the interval above the Rayleigh quotient, which approaches the
    /// top of the spectrum from below.
    pub boost_factor: T,
    /// Seed of the estimator's starting vector.
    pub seed: u64,
}

fn cast<T: Float>(v: f64) -> T {
    T::from(v).unwrap_or_else(T::epsilon)
}

impl<T: Float> Default for ChebyshevOptions<T> {
    fn default() -> Self {
        Self {
            eig_ratio: cast(30.0),
            lambda_min: None,
            lambda_max: None,
            degree: 1,
            min_diagonal_value: cast(1e-12),
            flags: ChebyshevFlags::default(),
            eigen_max_iters: 10,
            eigen_tol: cast(1e-6),
            estimator: EigenEstimator::default(),
            boost_factor: cast(1.1),
            seed: 0x5eed_cafe,
        }
    }
}

impl<T: Float> ChebyshevOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }
    pub fn with_eig_ratio(mut self, eig_ratio: T) -> Self {
        self.eig_ratio = eig_ratio;
        self
    }
    pub fn with_lambda_max(mut self, lambda_max: T) -> Self {
        self.lambda_max = Some(lambda_max);
        self
    }
    pub fn with_lambda_min(mut self, lambda_min: T) -> Self {
        self.lambda_min = Some(lambda_min);
        self
    }
    pub fn with_min_diagonal_value(mut self, floor: T) -> Self {
        self.min_diagonal_value = floor;
        self
    }
    pub fn with_zero_starting_solution(mut self, flag: bool) -> Self {
        self.flags.set(ChebyshevFlags::ZERO_STARTING_SOLUTION, flag);
        self
    }
    pub fn with_transpose(mut self, flag: bool) -> Self {
        self.flags.set(ChebyshevFlags::USE_TRANSPOSE, flag);
        self
    }
    pub fn with_condest(mut self, flag: bool) -> Self {
        self.flags.set(ChebyshevFlags::COMPUTE_CONDEST, flag);
        self
    }
    pub fn with_estimator(mut self, estimator: EigenEstimator, max_iters: usize) -> Self {
        self.estimator = estimator;
        self.eigen_max_iters = max_iters;
        self
    }
    pub fn with_boost_factor(mut self, boost: T) -> Self {
        self.boost_factor = boost;
        self
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn zero_starting_solution(&self) -> bool {
        self.flags.contains(ChebyshevFlags::ZERO_STARTING_SOLUTION)
    }
    pub fn use_transpose(&self) -> bool {
        self.flags.contains(ChebyshevFlags::USE_TRANSPOSE)
    }

    /// Reject values that would make the target interval empty or the
    /// recurrence divide by zero.
    pub fn validate(&self) -> Result<(), KError> {
        if !self.eig_ratio.is_finite() || self.eig_ratio <= T::one() {
            return Err(KError::InvalidOption {
                name: PARAM_EIG_RATIO,
                reason: "must be finite and strictly greater than 1".into(),
            });
        }
        if let Some(lmax) = self.lambda_max {
            if !lmax.is_finite() || lmax <= T::zero() {
                return Err(KError::InvalidOption {
                    name: PARAM_LAMBDA_MAX,
                    reason: "must be finite and strictly positive".into(),
                });
            }
        }
        if let Some(lmin) = self.lambda_min {
            if !lmin.is_finite() {
                return Err(KError::InvalidOption {
                    name: PARAM_LAMBDA_MIN,
                    reason: "must be finite".into(),
                });
            }
        }
        if !self.min_diagonal_value.is_finite() || self.min_diagonal_value <= T::zero() {
            return Err(KError::InvalidOption {
                name: PARAM_MIN_DIAGONAL,
                reason: "must be finite and strictly positive".into(),
            });
        }
        if !self.eigen_tol.is_finite() || self.eigen_tol < T::zero() {
            return Err(KError::InvalidOption {
                name: PARAM_EIGEN_TOL,
                reason: "must be finite and non-negative".into(),
            });
        }
        if self.lambda_max.is_none() && self.eigen_max_iters == 0 {
            return Err(KError::InvalidOption {
                name: PARAM_EIGEN_MAX_ITERS,
                reason: "must be positive when the max eigenvalue is estimated".into(),
            });
        }
        if !self.boost_factor.is_finite() || self.boost_factor < T::one() {
            return Err(KError::InvalidOption {
                name: PARAM_BOOST,
                reason: "must be finite and at least 1".into(),
            });
        }
        Ok(())
    }

    /// Apply one entry of the flat parameter mapping.
    ///
    /// Integer values are accepted where a real is expected. Values are stored
    /// as given; range checks happen in [`validate`](Self::validate).
    pub fn set_parameter(&mut self, name: &str, value: ParameterValue<T>) -> Result<(), KError> {
        match name {
            PARAM_EIG_RATIO => self.eig_ratio = real(name, value)?,
            PARAM_LAMBDA_MIN => self.lambda_min = Some(real(name, value)?),
            PARAM_LAMBDA_MAX => self.lambda_max = Some(real(name, value)?),
            PARAM_DEGREE => self.degree = count(name, PARAM_DEGREE, value)?,
            PARAM_MIN_DIAGONAL => self.min_diagonal_value = real(name, value)?,
            PARAM_ZERO_START => {
                let flag = boolean(name, value)?;
                self.flags.set(ChebyshevFlags::ZERO_STARTING_SOLUTION, flag);
            }
            PARAM_USE_TRANSPOSE => {
                let flag = boolean(name, value)?;
                self.flags.set(ChebyshevFlags::USE_TRANSPOSE, flag);
            }
            PARAM_COMPUTE_CONDEST => {
                let flag = boolean(name, value)?;
                self.flags.set(ChebyshevFlags::COMPUTE_CONDEST, flag);
            }
            PARAM_EIGEN_MAX_ITERS => self.eigen_max_iters = count(name, PARAM_EIGEN_MAX_ITERS, value)?,
            PARAM_EIGEN_TOL => self.eigen_tol = real(name, value)?,
            PARAM_ESTIMATOR => {
                self.estimator = match value {
                    ParameterValue::Str(s) => match s.to_ascii_lowercase().as_str() {
                        "power" | "power method" => EigenEstimator::PowerMethod,
                        "cg" | "lanczos" => EigenEstimator::Cg,
                        other => {
                            return Err(KError::InvalidOption {
                                name: PARAM_ESTIMATOR,
                                reason: format!("unknown estimator `{other}`"),
                            });
                        }
                    },
                    _ => return Err(type_error(name, "string")),
                }
            }
            PARAM_BOOST => self.boost_factor = real(name, value)?,
            PARAM_SEED => self.seed = count(name, PARAM_SEED, value)? as u64,
            _ => return Err(KError::UnknownParameter(name.to_string())),
        }
        Ok(())
    }

    /// Build options from defaults plus a list of named parameters, then validate.
    pub fn from_parameters<'n, I>(params: I) -> Result<Self, KError>
    where
        I: IntoIterator<Item = (&'n str, ParameterValue<T>)>,
    {
        let mut opts = Self::default();
        for (name, value) in params {
            opts.set_parameter(name, value)?;
        }
        opts.validate()?;
        Ok(opts)
    }
}

fn type_error(name: &str, expected: &'static str) -> KError {
    KError::ParameterType { name: name.to_string(), expected }
}

fn real<T: Float>(name: &str, value: ParameterValue<T>) -> Result<T, KError> {
    match value {
        ParameterValue::Real(v) => Ok(v),
        ParameterValue::Int(i) => T::from(i).ok_or_else(|| type_error(name, "real")),
        _ => Err(type_error(name, "real")),
    }
}

fn count<T>(name: &str, key: &'static str, value: ParameterValue<T>) -> Result<usize, KError> {
    match value {
        ParameterValue::Int(i) if i < 0 => Err(KError::InvalidOption {
            name: key,
            reason: format!("must be non-negative, got {i}"),
        }),
        ParameterValue::Int(i) => Ok(i as usize),
        _ => Err(type_error(name, "integer")),
    }
}

fn boolean<T>(name: &str, value: ParameterValue<T>) -> Result<bool, KError> {
    match value {
        ParameterValue::Bool(b) => Ok(b),
        _ => Err(type_error(name, "boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let o = ChebyshevOptions::<f64>::default();
        assert_eq!(o.eig_ratio, 30.0);
        assert_eq!(o.degree, 1);
        assert!(o.lambda_max.is_none() && o.lambda_min.is_none());
        assert!(o.zero_starting_solution());
        assert!(!o.use_transpose());
        assert_eq!(o.boost_factor, 1.1);
        assert!(o.validate().is_ok());
    }

    #[test]
    fn parameters_are_applied_by_name() {
        let o = ChebyshevOptions::<f64>::from_parameters([
            (PARAM_EIG_RATIO, ParameterValue::Real(2.0)),
            (PARAM_DEGREE, ParameterValue::Int(4)),
            (PARAM_LAMBDA_MAX, ParameterValue::Int(4)),
            (PARAM_ZERO_START, ParameterValue::Bool(false)),
            (PARAM_ESTIMATOR, ParameterValue::Str("CG".into())),
        ])
        .unwrap();
        assert_eq!(o.eig_ratio, 2.0);
        assert_eq!(o.degree, 4);
        assert_eq!(o.lambda_max, Some(4.0));
        assert!(!o.zero_starting_solution());
        assert_eq!(o.estimator, EigenEstimator::Cg);
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let mut o = ChebyshevOptions::<f64>::default();
        assert_eq!(
            o.set_parameter("chebyshev: colour", ParameterValue::Bool(true)),
            Err(KError::UnknownParameter("chebyshev: colour".into()))
        );
        assert!(matches!(
            o.set_parameter(PARAM_DEGREE, ParameterValue::Int(-1)),
            Err(KError::InvalidOption { name: PARAM_DEGREE, .. })
        ));
        assert!(matches!(
            o.set_parameter(PARAM_ZERO_START, ParameterValue::Real(1.0)),
            Err(KError::ParameterType { .. })
        ));
    }

    #[test]
    fn validate_rejects_collapsed_interval_and_zero_lambda_max() {
        let o = ChebyshevOptions::<f64>::default().with_eig_ratio(1.0);
        assert!(matches!(o.validate(), Err(KError::InvalidOption { name: PARAM_EIG_RATIO, .. })));
        let o = ChebyshevOptions::<f64>::default().with_lambda_max(0.0);
        assert!(matches!(o.validate(), Err(KError::InvalidOption { name: PARAM_LAMBDA_MAX, .. })));
        let o = ChebyshevOptions::<f64>::default().with_min_diagonal_value(0.0);
        assert!(o.validate().is_err());
        let o = ChebyshevOptions::<f64>::default().with_boost_factor(0.5);
        assert!(o.validate().is_err());
    }

    #[test]
    fn estimation_needs_an_iteration_budget() {
        let mut o = ChebyshevOptions::<f64>::default();
        o.eigen_max_iters = 0;
        assert!(matches!(o.validate(), Err(KError::InvalidOption { name: PARAM_EIGEN_MAX_ITERS, .. })));
        // A configured LambdaMax skips the estimator entirely.
        assert!(o.with_lambda_max(2.0).validate().is_ok());
        let zero_budget = ChebyshevOptions::<f64>::from_parameters([(PARAM_EIGEN_MAX_ITERS, ParameterValue::Int(0))]);
        assert!(matches!(zero_budget, Err(KError::InvalidOption { name: PARAM_EIGEN_MAX_ITERS, .. })));
    }
}
