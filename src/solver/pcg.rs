//! Preconditioned Conjugate Gradient (PCG) per Saad §9.2
//!
//! Besides solving, PCG can record the step lengths αₖ and direction updates
//! βₖ it produces. These are the Lanczos coefficients of the preconditioned
//! operator M⁻¹A (Saad §6.7.3), from which [`crate::eigen::lanczos`] builds
//! spectral bounds.

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{Convergence, SolveStats};

/// αₖ and βₖ of a PCG run, in iteration order.
#[derive(Clone, Debug, PartialEq)]
pub struct LanczosCoefficients<T> {
    pub alphas: Vec<T>,
    pub betas: Vec<T>,
}

impl<T> Default for LanczosCoefficients<T> {
    fn default() -> Self {
        Self { alphas: Vec::new(), betas: Vec::new() }
    }
}

pub struct PcgSolver<T> {
    pub conv: Convergence<T>,
    pub residual_history: Vec<T>,
    /// `Some` when coefficient recording is enabled; reset at every solve.
    pub lanczos: Option<LanczosCoefficients<T>>,
}

impl<T: Copy + num_traits::Float> PcgSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence { tol, max_iters },
            residual_history: Vec::new(),
            lanczos: None,
        }
    }
    pub fn with_lanczos(mut self, flag: bool) -> Self {
        self.lanczos = if flag { Some(LanczosCoefficients::default()) } else { None };
        self
    }
}

impl<M, V, T> LinearSolver<M, V> for PcgSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float,
{
    type Error = KError;
    type Scalar = T;

    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let n = b.as_ref().len();
        let ip = ();
        if let Some(l) = self.lanczos.as_mut() {
            l.alphas.clear();
            l.betas.clear();
        }
        let mut r = {
            let mut tmp = V::from(vec![T::zero(); n]);
            a.matvec(x, &mut tmp);
            let r_vec = tmp.as_ref().iter().zip(b.as_ref()).map(|(&ax, &bi)| bi - ax).collect::<Vec<_>>();
            V::from(r_vec)
        };
        let mut z = V::from(vec![T::zero(); n]);
        if let Some(pc) = pc {
            pc.apply(&r, &mut z)?;
        } else {
            z.clone_from(&r);
        }
        let mut p = z.clone();
        let mut rz = ip.dot(&r, &z);
        let res0 = ip.norm(&r);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, converged: res0 == T::zero() };
        self.residual_history.push(res0);
        if stats.converged {
            return Ok(stats);
        }
        let mut ap = V::from(vec![T::zero(); n]);
        for i in 0..self.conv.max_iters {
            a.matvec(&p, &mut ap);
            let p_dot_ap = ip.dot(&p, &ap);
            // Indefinite-matrix detection
            if p_dot_ap <= T::zero() {
                return Err(KError::IndefiniteMatrix);
            }
            let alpha = rz / p_dot_ap;
            if let Some(l) = self.lanczos.as_mut() {
                l.alphas.push(alpha);
            }
            for (xj, pj) in x.as_mut().iter_mut().zip(p.as_ref()) {
                *xj = *xj + alpha * *pj;
            }
            for (rj, apj) in r.as_mut().iter_mut().zip(ap.as_ref()) {
                *rj = *rj - alpha * *apj;
            }
            if let Some(pc) = pc {
                pc.apply(&r, &mut z)?;
            } else {
                z.clone_from(&r);
            }
            let rz_new = ip.dot(&r, &z);
            let res_norm = ip.norm(&r);
            self.residual_history.push(res_norm);
            let (stop, s) = self.conv.check(res_norm, res0, i + 1);
            stats = s;
            if stop {
                return Ok(stats);
            }
            let beta = rz_new / rz;
            // Indefinite-preconditioner detection
            if beta < T::zero() {
                return Err(KError::IndefinitePreconditioner);
            }
            if let Some(l) = self.lanczos.as_mut() {
                l.betas.push(beta);
            }
            for (pj, zj) in p.as_mut().iter_mut().zip(z.as_ref()) {
                *pj = *zj + beta * *pj;
            }
            rz = rz_new;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preconditioner::InverseDiagonal;
    use faer::Mat;

    #[test]
    fn pcg_solves_simple_spd() {
        // SPD system: [[4,1],[1,3]] x = [1,2]
        let a = Mat::from_fn(2, 2, |i, j| [[4.0, 1.0], [1.0, 3.0]][i][j]);
        let b = vec![1.0, 2.0];
        let mut x = vec![0.0, 0.0];
        let mut solver = PcgSolver::new(1e-10, 20);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        let expected: [f64; 2] = [0.09090909090909091, 0.6363636363636364];
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < 1e-8, "xi = {}, expected = {}", xi, ei);
        }
        assert!(stats.converged, "PCG did not converge");
        assert_eq!(solver.residual_history.len(), stats.iterations + 1);
    }

    #[test]
    fn records_lanczos_coefficients() {
        let a = Mat::from_fn(4, 4, |i, j| if i == j { 4.0 } else if i.abs_diff(j) == 1 { -1.0 } else { 0.0 });
        let pc = InverseDiagonal::from_operator(&a, 1e-12).unwrap();
        let b = vec![1.0, -2.0, 0.5, 3.0];
        let mut x = vec![0.0; 4];
        let mut solver = PcgSolver::new(1e-14, 10).with_lanczos(true);
        solver.solve(&a, Some(&pc), &b, &mut x).unwrap();
        let l = solver.lanczos.as_ref().unwrap();
        assert!(!l.alphas.is_empty());
        assert_eq!(l.betas.len() + 1, l.alphas.len());
        assert!(l.alphas.iter().all(|&al| al > 0.0));
    }

    #[test]
    fn indefinite_matrix_is_detected() {
        let a = Mat::from_fn(2, 2, |i, j| if i == j { [1.0, -1.0][i] } else { 0.0 });
        let b = vec![0.0, 1.0];
        let mut x = vec![0.0; 2];
        let mut solver = PcgSolver::new(1e-10, 10);
        assert_eq!(solver.solve(&a, None, &b, &mut x), Err(KError::IndefiniteMatrix));
    }

    #[test]
    fn lanczos_recording_starts_empty_and_resets_per_solve() {
        let solver = PcgSolver::<f64>::new(1e-10, 5).with_lanczos(true);
        assert_eq!(solver.lanczos, Some(LanczosCoefficients::default()));

        let a = Mat::from_fn(2, 2, |i, j| if i == j { [2.0, 3.0][i] } else { 0.0 });
        let mut solver = solver;
        for _ in 0..2 {
            let mut x = vec![0.0; 2];
            solver.solve(&a, None, &vec![1.0, 1.0], &mut x).unwrap();
            let l = solver.lanczos.as_ref().unwrap();
            assert_eq!(l.alphas.len(), 2);
            assert_eq!(l.betas.len(), 1);
        }
    }
}
