//! Lifecycle contexts wiring operators, estimators and kernels together.
//!
//! - [`pc_context`]: [`ChebyshevContext`], the Initialize → Compute →
//!   ApplyInverse driver of the Chebyshev preconditioner.

pub mod pc_context;

pub use pc_context::{ChebyshevContext, CondestType, LifecycleState};
