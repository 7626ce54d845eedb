//! Operator capability traits and their implementations for faer and `Vec`.

pub mod traits;
pub mod wrappers;

pub use traits::{DiagonalExtract, InnerProduct, LinearOperator, MatShape, MatTransVec, MatVec};
