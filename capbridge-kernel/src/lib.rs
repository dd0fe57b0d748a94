//! Conversation driver for capbridge.
//!
//! [`bridge::CallBridge`] answers a question with a function-calling model in
//! at most two requests, routing the model's call requests either to a
//! [`capbridge_tools::CapabilityBackend`] (tool mode) or to a
//! [`capbridge_resources::ResourceRegistry`] through a single `read_resource`
//! function (resource mode).

#![warn(missing_docs, clippy::pedantic)]

pub mod bridge;
pub mod conversation;
pub mod error;
pub mod outcome;

pub use bridge::{
    BridgeMode, BridgeOptions, CallBridge, DispatchStrategy, READ_RESOURCE, read_resource_schema,
};
pub use conversation::{Conversation, ConversationEvent, ConversationState};
pub use error::{BridgeError, BridgeResult, DispatchError};
pub use outcome::{CallOutcome, CallOutcomeSink, CallRecord, CollectingSink, TracingCallSink};
