//! Solver bookkeeping: stopping criteria and lifecycle telemetry.

pub mod convergence;
pub mod metrics;

pub use metrics::{ApplyStats, PhaseMetrics};
