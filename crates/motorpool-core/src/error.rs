//! Error types for motorpool-core
//!
//! Every registry error is local and synchronous. None of them leave the
//! registry in a partially updated state.

use thiserror::Error;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No car was free at the moment of the claim
    #[error("no free cars")]
    ResourceExhausted,

    /// The referenced car does not exist in the pool
    #[error("car not found: {id}")]
    NotFound {
        /// Car ID as supplied by the caller
        id: String,
    },

    /// Release attempted by someone other than the current holder
    #[error("car {id} not owned by {holder}")]
    NotOwned {
        /// Car ID
        id: String,
        /// Identity that attempted the release
        holder: String,
    },

    /// Holder identity was empty
    #[error("holder identity must not be empty")]
    InvalidHolder,

    /// Invalid configuration
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a `NotFound` error for the given car ID.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Build an `InvalidConfig` error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code, suitable for API responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::NotOwned { .. } => "NOT_OWNED",
            Self::InvalidHolder => "INVALID_HOLDER",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
        }
    }

    /// Whether retrying the same call later can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ResourceExhausted)
    }
}
