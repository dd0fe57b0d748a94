//! Model adapters used by the call bridge.
//!
//! [`traits::ModelAdapter`] is the seam between the bridge and a
//! function-calling model. [`openai`] talks to the `OpenAI` Responses API;
//! [`scripted`] replays canned turns for offline use.

#![warn(missing_docs, clippy::pedantic)]

pub mod openai;
pub mod scripted;
pub mod traits;

mod http_client;

pub use openai::{OpenAiAdapter, OpenAiConfig};
pub use scripted::{ScriptedAdapter, ScriptedTurn};
pub use traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, ConversationItem,
    InferenceChunk, InferenceRequest, ModelAdapter, ModelResponse,
};
