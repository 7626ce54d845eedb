use thiserror::Error;

// Unified error type for kryst-cheby

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KError {
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("parameter `{name}` expects a {expected} value")]
    ParameterType { name: String, expected: &'static str },
    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch { what: &'static str, expected: usize, found: usize },
    #[error("operator is not square ({nrows} x {ncols})")]
    NotSquare { nrows: usize, ncols: usize },
    #[error("degenerate spectrum: {0}")]
    DegenerateSpectrum(String),
    #[error("Krylov breakdown: {0}")]
    Breakdown(String),
    #[error("tridiagonal eigensolve failed: {0}")]
    EigenSolve(String),
    #[error("indefinite matrix detected (p^T A p <= 0)")]
    IndefiniteMatrix,
    #[error("indefinite preconditioner detected (beta < 0)")]
    IndefinitePreconditioner,
    #[error("preconditioner has not been initialized")]
    NotInitialized,
    #[error("preconditioner has not been computed")]
    NotComputed,
}
