//! Addressable data resources for capbridge.
//!
//! Resources are registered either under one exact URI (a fixed resource) or
//! under a URI pattern whose `{name}` segments are extracted from the
//! concrete URI at resolution time (a template resource). See
//! [`registry::ResourceRegistry`] for the resolution rules.

#![warn(missing_docs, clippy::pedantic)]

pub mod content;
pub mod error;
pub mod registry;
pub mod template;

pub use content::{ContentKind, ResourceContent};
pub use error::{ResourceError, ResourceResult};
pub use registry::{
    FixedResolver, ResourceInfo, ResourceRegistry, ResourceSnapshot, TemplateResolver,
};
pub use template::{TemplateParams, UriTemplate};
