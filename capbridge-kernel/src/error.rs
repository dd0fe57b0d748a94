//! Errors raised while bridging a query.

use capbridge_adapters::AdapterError;
use capbridge_primitives::QueryId;
use capbridge_resources::ResourceError;
use capbridge_tools::ToolError;
use thiserror::Error;

use crate::conversation::{ConversationEvent, ConversationState};

/// Result alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that abort a query.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The model request failed or its response was unusable.
    #[error("upstream model request failed: {0}")]
    Upstream(#[from] AdapterError),

    /// The capability backend could not enumerate its capabilities.
    #[error("capability enumeration failed: {0}")]
    Capabilities(#[source] ToolError),

    /// A capability descriptor could not be normalized.
    #[error(transparent)]
    Schema(#[from] capbridge_primitives::Error),

    /// The conversation state machine was driven out of order.
    #[error("invalid conversation transition from {from:?} via {event:?} for query {query_id}")]
    InvalidTransition {
        /// Query whose transition failed.
        query_id: QueryId,
        /// State prior to the attempted transition.
        from: ConversationState,
        /// Event that triggered the failure.
        event: ConversationEvent,
    },
}

/// Failure of a single call request. Never aborts the query; it is recorded as
/// the call's result text instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The argument payload did not decode to a mapping.
    #[error(transparent)]
    InvalidArguments(#[from] capbridge_primitives::Error),

    /// The capability backend reported a failure.
    #[error("capability `{name}` failed: {source}")]
    Capability {
        /// Name of the capability.
        name: String,
        /// Error reported by the backend.
        #[source]
        source: ToolError,
    },

    /// Resource resolution failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// `read_resource` was called without a string `uri`.
    #[error("`read_resource` requires a string `uri` argument")]
    MissingUri,

    /// `read_resource` was called with non-object `params`.
    #[error("`read_resource` params must be an object")]
    InvalidParams,

    /// The model named a function that is not offered in this mode.
    #[error("unknown function `{name}`")]
    UnknownFunction {
        /// The requested name.
        name: String,
    },
}
