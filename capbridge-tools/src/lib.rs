//! In-process capability backend.
//!
//! Tools are registered with a name, an optional description, and an input
//! specification in any of the shapes the normalizer accepts. The registry
//! implements [`backend::CapabilityBackend`], the seam the call bridge uses to
//! enumerate and invoke capabilities.

#![warn(missing_docs, clippy::pedantic)]

pub mod backend;
pub mod registry;

pub use backend::{CapabilityBackend, render_output};
pub use registry::{Tool, ToolError, ToolHandle, ToolMetadata, ToolRegistry, ToolResult};
