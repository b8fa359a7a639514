//! Error types for the verbena crate.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, VerbenaError>;

/// Error type for all dictionary operations.
///
/// Absence of a term (or a term whose version is below a requested minimum)
/// is never an error; those outcomes are reported through return values.
#[derive(Error, Debug)]
pub enum VerbenaError {
    /// I/O failure reading from or writing to storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decoded bytes violate the on-disk format invariants. The backing
    /// data is immutable, so there is no retry; the reader is unusable.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// An operation was invoked in a state that does not permit it.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The caller supplied an argument the API cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by the underlying term index automaton.
    #[error("term index error: {0}")]
    Index(#[from] fst::Error),
}

impl VerbenaError {
    /// Create a corruption error.
    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        VerbenaError::Corrupt(message.into())
    }

    /// Create an illegal state error.
    pub fn illegal_state<S: Into<String>>(message: S) -> Self {
        VerbenaError::IllegalState(message.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        VerbenaError::InvalidArgument(message.into())
    }
}
