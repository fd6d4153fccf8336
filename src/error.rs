//! Error types for the SIMP core.

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by mesh construction, the linear solver, and the
/// optimizer-facing constraint/objective layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid mesh dimensions or penalization exponent, detected at
    /// construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The assembled stiffness matrix could not be factored.
    #[error("singular system: {0}")]
    SingularSystem(String),

    /// A vector argument's length disagrees with the mesh's state or design
    /// size. Indicates a caller bug; never recovered.
    #[error("dimension mismatch: expected length {expected}, got {found}")]
    DimensionMismatch {
        /// Length the mesh expects for this operand.
        expected: usize,
        /// Length the caller supplied.
        found: usize,
    },

    /// I/O errors from density output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
