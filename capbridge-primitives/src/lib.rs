//! Core shared types for capbridge.
//!
//! Everything the bridge passes between components lives here: capability
//! descriptors as a backend declares them, the canonical call schema handed to
//! the model, and the call requests/results that flow back and forth.

#![warn(missing_docs, clippy::pedantic)]

mod call;
mod capability;
mod error;
mod ids;
pub mod schema;

/// Model-issued call requests and their labelled results.
pub use call::{CallArguments, CallId, CallRequest, CallResult};
/// Capability descriptors and their heterogeneous input specifications.
pub use capability::{
    BoxError, CapabilityDescriptor, CapabilityName, InputSpec, ParameterRecord, SchemaExport,
    TypedSchema,
};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifier attached to every bridged query.
pub use ids::QueryId;
/// Canonical call schema produced by the normalizer.
pub use schema::{CanonicalCallSchema, normalize};
