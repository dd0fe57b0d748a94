//! Named, parametrized prompt templates.
//!
//! A [`PromptEngine`] maps names to generators. Rendering a prompt yields one
//! of three canonical shapes (plain text, one structured message, or an
//! ordered message list), whether the generator completed immediately or
//! suspended.

#![warn(missing_docs, clippy::pedantic)]

pub mod engine;
pub mod error;
pub mod message;
pub mod template;

pub use engine::{
    Generation, MissingArgument, PromptArgs, PromptArgument, PromptDescriptor, PromptEngine,
    PromptGenerator,
};
pub use error::{GeneratorError, GeneratorResult, PromptError, PromptResult};
pub use message::{InvalidOutput, MessageRole, PromptMessage, PromptOutput};
pub use template::{PromptTemplate, TemplateBuilder, TemplateError, TemplateResult};
