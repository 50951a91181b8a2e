//! Typed errors for post operations.
//!
//! Application boundaries carry these inside `anyhow::Error`; callers that
//! need to tell a validation failure from an infrastructure failure use
//! `err.downcast_ref::<PostError>()`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Embedding provider is disabled")]
    EmbeddingsDisabled,

    #[error("Embedding provider failed: {0}")]
    Provider(String),
}

impl PostError {
    /// True for errors caused by the caller's input rather than the backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, PostError::MissingField(_))
    }
}
