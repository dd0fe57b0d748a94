//! Bridge function-calling models to tools, resources and prompt templates.
//!
//! Depend on this crate via `cargo add capbridge`. It bundles the workspace
//! crates behind feature flags so downstream users can enable only the
//! components they need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use capbridge_primitives as primitives;

/// Two-phase call bridge (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use capbridge_kernel as kernel;

/// Model adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use capbridge_adapters as adapters;

/// In-process capability backend (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use capbridge_tools as tools;

/// Resource registry (enabled by `resources` feature).
#[cfg(feature = "resources")]
pub use capbridge_resources as resources;

/// Prompt template engine (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use capbridge_prompts as prompts;

/// Tracing subscriber setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use capbridge_telemetry as telemetry;

/// Runtime configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use capbridge_config as config;

/// Wiring from configuration to components (enabled by `setup` feature).
#[cfg(feature = "setup")]
pub mod setup;
