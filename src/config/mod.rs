//! Configuration for the Chebyshev preconditioner.

pub mod options;

pub use options::{ChebyshevFlags, ChebyshevOptions, EigenEstimator, ParameterValue};
