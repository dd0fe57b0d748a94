//! Shared error definitions for capbridge primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the primitives crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or normalizing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided query identifier could not be parsed.
    #[error("invalid query id: {source}")]
    InvalidQueryId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Capability name failed validation.
    #[error("invalid capability name `{name}`: {reason}")]
    InvalidCapabilityName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A call identifier was empty.
    #[error("call id cannot be empty")]
    EmptyCallId,

    /// Call arguments could not be decoded into a structured mapping.
    #[error("invalid call arguments: {reason}")]
    InvalidArguments {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A capability input specification could not be coerced into an object
    /// schema, not even the open fallback.
    #[error("cannot normalize schema for `{name}`: {reason}")]
    SchemaNormalization {
        /// Capability whose descriptor was malformed.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl Error {
    pub(crate) fn normalization(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaNormalization {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
