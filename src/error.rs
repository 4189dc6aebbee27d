//! Error kinds for the breeding simulation core.
//!
//! A closed taxonomy (invalid argument, not found, shape mismatch, missing
//! prerequisite, I/O, resource exhaustion) as a `thiserror`-derived enum,
//! so that no operation can leave a partial result in the caller's hands:
//! every fallible function in this crate returns a [`SimResult`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),

    /// Raised by a [`crate::interrupt::YieldCheck`] when the host asks a
    /// long-running loop to stop. Surfaces through the same `Result` path
    /// as any other failure so cancellation unwinds cleanly.
    #[error("operation cancelled by host")]
    Cancelled,
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SimError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        SimError::NotFound(msg.into())
    }

    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        SimError::ShapeMismatch(msg.into())
    }

    pub fn missing_prerequisite(msg: impl Into<String>) -> Self {
        SimError::MissingPrerequisite(msg.into())
    }
}
