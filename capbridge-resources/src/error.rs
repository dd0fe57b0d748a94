//! Errors produced by resource registration and resolution.

use thiserror::Error;

/// Result alias for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors produced by resource registration and resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A fixed URI or template pattern with the same text is already registered.
    #[error("resource `{uri}` is already registered")]
    DuplicateUri {
        /// The colliding URI or pattern.
        uri: String,
    },

    /// A URI pattern (or fixed URI) failed syntax validation.
    #[error("invalid resource pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// No fixed URI or template matched.
    #[error("resource `{uri}` not found")]
    NotFound {
        /// The URI that failed to resolve.
        uri: String,
    },

    /// A named template parameter was not supplied.
    #[error("missing template parameter `{name}`")]
    MissingParameter {
        /// Name of the missing parameter.
        name: String,
    },

    /// The resolver itself failed.
    #[error("resource resolver failed: {reason}")]
    Failed {
        /// Human-readable error returned by the resolver.
        reason: String,
    },
}

impl ResourceError {
    /// Creates a resolver failure from the supplied reason.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: reason.into(),
        }
    }
}
