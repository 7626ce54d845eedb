//! Matrix module: concrete operators for the Chebyshev kernel.
//!
//! Dense `faer::Mat` operators are covered in [`crate::core::wrappers`]; this
//! module adds a CSR format for sparse operators.

pub mod sparse;
pub use sparse::CsrMatrix;
