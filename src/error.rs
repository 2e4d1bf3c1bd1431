//! Error types for mongo-env.
//!
//! This module defines all error types using `thiserror` for ergonomic error
//! handling. Nothing in this crate retries or swallows a failure: every error
//! is surfaced to the caller immediately, and scoped overrides always restore
//! the previous connection target before an error propagates.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Configuration error: {message}")]
    Configuration { message: String, suggestion: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error(
        "Guard violation: collections on {target} already contain documents ({counts}); is this a production instance?"
    )]
    Guard { target: String, counts: String },
}

impl EnvError {
    /// Create a configuration error with a helpful suggestion.
    pub fn configuration(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a guard violation from the offending namespaces and their
    /// document counts.
    pub fn guard(target: impl Into<String>, counts: &[(String, u64)]) -> Self {
        let counts = counts
            .iter()
            .map(|(namespace, count)| format!("{namespace}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        Self::Guard {
            target: target.into(),
            counts,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Configuration { suggestion, .. } => Some(suggestion),
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Guard { .. } => None,
        }
    }

    /// True when the failure came from resolving settings keys rather than
    /// from the database itself.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// Convert driver errors to EnvError.
impl From<mongodb::error::Error> for EnvError {
    fn from(err: mongodb::error::Error) -> Self {
        EnvError::connection(
            err.to_string(),
            "Check that the target cluster is reachable and credentials are valid",
        )
    }
}

/// Result type alias for mongo-env operations.
pub type EnvResult<T> = Result<T, EnvError>;
