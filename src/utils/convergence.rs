//! Convergence tracking & tolerance checks for iterative solvers.

/// Stopping criteria & stats.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
}

impl<T: Copy + num_traits::Float> Convergence<T> {
    /// Returns (should_stop, stats) given current `res_norm` and iteration `i`.
    ///
    /// Reaching `max_iters` stops the iteration but does not count as converged.
    /// A zero initial residual is converged at once.
    pub fn check(
        &self,
        res_norm: T,
        res0_norm: T,
        i: usize,
    ) -> (bool, SolveStats<T>) {
        let converged = if res0_norm == T::zero() {
            true
        } else {
            res_norm / res0_norm <= self.tol
        };
        (
            converged || i >= self.max_iters,
            SolveStats {
                iterations: i,
                final_residual: res_norm,
                converged,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exhaustion_is_not_convergence() {
        let conv = Convergence { tol: 1e-8, max_iters: 3 };
        let (stop, stats) = conv.check(0.5, 1.0, 3);
        assert!(stop);
        assert!(!stats.converged);
        let (stop, stats) = conv.check(1e-9, 1.0, 1);
        assert!(stop && stats.converged);
        let (stop, _) = conv.check(0.5, 1.0, 1);
        assert!(!stop);
    }
}
