//! Advisory telemetry for the preconditioner lifecycle.
//!
//! Initialize and Compute take `&mut self`, so the context records their cost
//! itself. ApplyInverse is logically read-only: it *returns* an [`ApplyStats`]
//! and the caller decides whether to fold it into a [`PhaseMetrics`].

use std::fmt;
use std::time::Duration;

/// Cost of one ApplyInverse call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ApplyStats {
    pub elapsed: Duration,
    /// Estimated floating-point operations.
    pub flops: f64,
}

/// Call counts, accumulated wall-clock time and flop estimates per phase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhaseMetrics {
    pub num_initialize: usize,
    pub num_compute: usize,
    pub num_apply_inverse: usize,
    pub initialize_time: Duration,
    pub compute_time: Duration,
    pub apply_inverse_time: Duration,
    pub compute_flops: f64,
    pub apply_inverse_flops: f64,
}

impl PhaseMetrics {
    pub fn record_initialize(&mut self, elapsed: Duration) {
        self.num_initialize += 1;
        self.initialize_time += elapsed;
    }

    pub fn record_compute(&mut self, elapsed: Duration, flops: f64) {
        self.num_compute += 1;
        self.compute_time += elapsed;
        self.compute_flops += flops;
    }

    pub fn record_apply(&mut self, stats: &ApplyStats) {
        self.num_apply_inverse += 1;
        self.apply_inverse_time += stats.elapsed;
        self.apply_inverse_flops += stats.flops;
    }

    /// Forget everything except the Initialize history.
    pub fn reset_compute_and_apply(&mut self) {
        *self = PhaseMetrics {
            num_initialize: self.num_initialize,
            initialize_time: self.initialize_time,
            ..PhaseMetrics::default()
        };
    }
}

impl fmt::Display for PhaseMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Phase           ncalls    time (s)       flops")?;
        writeln!(f, "Initialize  {:>10}  {:>10.3e}  {:>10}", self.num_initialize, self.initialize_time.as_secs_f64(), "-")?;
        writeln!(f, "Compute     {:>10}  {:>10.3e}  {:>10.3e}", self.num_compute, self.compute_time.as_secs_f64(), self.compute_flops)?;
        write!(f, "ApplyInverse{:>10}  {:>10.3e}  {:>10.3e}", self.num_apply_inverse, self.apply_inverse_time.as_secs_f64(), self.apply_inverse_flops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_initialize_history() {
        let mut m = PhaseMetrics::default();
        m.record_initialize(Duration::from_millis(2));
        m.record_compute(Duration::from_millis(3), 10.0);
        m.record_apply(&ApplyStats { elapsed: Duration::from_millis(1), flops: 4.0 });
        m.record_apply(&ApplyStats { elapsed: Duration::from_millis(1), flops: 4.0 });
        assert_eq!(m.num_apply_inverse, 2);
        assert_eq!(m.apply_inverse_flops, 8.0);
        m.reset_compute_and_apply();
        assert_eq!(m.num_initialize, 1);
        assert_eq!(m.num_compute, 0);
        assert_eq!(m.num_apply_inverse, 0);
        assert_eq!(m.initialize_time, Duration::from_millis(2));
    }
}
