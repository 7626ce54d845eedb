// Floored inverse of the operator diagonal (point Jacobi scaling).

use log::warn;
use num_traits::Float;

use crate::core::traits::DiagonalExtract;
use crate::error::KError;
use crate::preconditioner::Preconditioner;

/// D⁻¹ with a minimum-magnitude floor:
/// `inv[i] = sign(d_i) / max(|d_i|, floor)` with `sign(0) = +1`.
#[derive(Clone, Debug, PartialEq)]
pub struct InverseDiagonal<T> {
    inv_diag: Vec<T>,
    floor: T,
    floored: usize,
}

impl<T: Float> InverseDiagonal<T> {
    /// Invert `diag` entry by entry. `floor` must be positive.
    pub fn from_diagonal(diag: &[T], floor: T) -> Result<Self, KError> {
        if !(floor > T::zero()) || !floor.is_finite() {
            return Err(KError::InvalidOption {
                name: crate::config::options::PARAM_MIN_DIAGONAL,
                reason: "must be finite and strictly positive".into(),
            });
        }
        let mut floored = 0;
        let inv_diag = diag
            .iter()
            .map(|&d| {
                let sign = if d < T::zero() { -T::one() } else { T::one() };
                let mag = d.abs();
                if mag < floor || mag.is_nan() {
                    floored += 1;
                    sign / floor
                } else {
                    sign / mag
                }
            })
            .collect();
        if floored > 0 {
            warn!("{floored} of {} diagonal entries fell below the floor and were clamped", diag.len());
        }
        Ok(Self { inv_diag, floor, floored })
    }

    /// Extract the diagonal of `a` and invert it.
    pub fn from_operator<M: DiagonalExtract<T>>(a: &M, floor: T) -> Result<Self, KError> {
        Self::from_diagonal(&a.diagonal(), floor)
    }

    /// A scaling of all ones; turns the scaled estimators into unscaled ones.
    pub fn ones(n: usize) -> Self {
        Self { inv_diag: vec![T::one(); n], floor: T::epsilon(), floored: 0 }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.inv_diag
    }

    pub fn len(&self) -> usize {
        self.inv_diag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inv_diag.is_empty()
    }

    pub fn floor(&self) -> T {
        self.floor
    }

    /// Number of entries that were replaced by `±1/floor`.
    pub fn num_floored(&self) -> usize {
        self.floored
    }

    /// z = D⁻¹ ⊙ r
    pub fn scale(&self, r: &[T], z: &mut [T]) {
        debug_assert_eq!(r.len(), self.inv_diag.len());
        for ((zi, &ri), &di) in z.iter_mut().zip(r).zip(&self.inv_diag) {
            *zi = di * ri;
        }
    }

    /// v ← D⁻¹ ⊙ v
    pub fn scale_in_place(&self, v: &mut [T]) {
        for (vi, &di) in v.iter_mut().zip(&self.inv_diag) {
            *vi = di * *vi;
        }
    }
}

/// Point Jacobi: M⁻¹ = D⁻¹.
impl<M, T> Preconditioner<M, Vec<T>> for InverseDiagonal<T>
where
    M: DiagonalExtract<T>,
    T: Float,
{
    fn setup(&mut self, a: &M) -> Result<(), KError> {
        let d = a.diagonal();
        if d.len() != self.inv_diag.len() && !self.inv_diag.is_empty() {
            return Err(KError::ShapeMismatch { what: "diagonal", expected: self.inv_diag.len(), found: d.len() });
        }
        *self = Self::from_diagonal(&d, self.floor)?;
        Ok(())
    }

    fn apply(&self, r: &Vec<T>, z: &mut Vec<T>) -> Result<(), KError> {
        if r.len() != self.inv_diag.len() {
            return Err(KError::ShapeMismatch { what: "right-hand side", expected: self.inv_diag.len(), found: r.len() });
        }
        self.scale(r, z);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_positive_diagonal_is_inverted_exactly() {
        let inv = InverseDiagonal::from_diagonal(&[4.0f64; 5], 1e-9).unwrap();
        assert_eq!(inv.as_slice(), &[0.25; 5]);
        assert_eq!(inv.num_floored(), 0);
    }

    #[test]
    fn small_entries_are_floored_with_sign() {
        let floor = 1e-3;
        let inv = InverseDiagonal::from_diagonal(&[2.0f64, 1e-6, -1e-6, 0.0, -4.0], floor).unwrap();
        assert_eq!(inv.as_slice(), &[0.5, 1.0 / floor, -1.0 / floor, 1.0 / floor, -0.25]);
        assert_eq!(inv.num_floored(), 3);
    }

    #[test]
    fn non_positive_floor_is_rejected() {
        assert!(InverseDiagonal::from_diagonal(&[1.0f64], 0.0).is_err());
        assert!(InverseDiagonal::from_diagonal(&[1.0f64], -1.0).is_err());
    }

    #[test]
    fn scale_is_hadamard_product() {
        let inv = InverseDiagonal::from_diagonal(&[2.0f64, 4.0], 1e-9).unwrap();
        let mut z = vec![0.0; 2];
        inv.scale(&[1.0, 1.0], &mut z);
        assert_eq!(z, vec![0.5, 0.25]);
    }
}
