//! kryst-cheby: a Chebyshev polynomial preconditioner over Faer
//!
//! The crate smooths or preconditions `A x = b` with a fixed-degree Chebyshev
//! polynomial in the Jacobi-scaled operator D⁻¹A. It provides the floored
//! inverse diagonal, power-method and CG/Lanczos eigenvalue estimators, the
//! three-term recurrence, and a lifecycle context that plugs into the PCG
//! solver through the [`Preconditioner`] trait.

pub mod config;
pub mod context;
pub mod core;
pub mod eigen;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use crate::core::*;
pub use eigen::*;
pub use error::*;
pub use matrix::*;
pub use preconditioner::*;
pub use solver::*;
pub use utils::*;

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
