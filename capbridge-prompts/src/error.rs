//! Prompt engine errors.

use thiserror::Error;

/// Boxed error returned by prompt generators. Preserved unchanged inside
/// [`PromptError::TemplateExecution`].
pub type GeneratorError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for generator bodies.
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Result alias for engine operations.
pub type PromptResult<T> = Result<T, PromptError>;

/// Errors produced by prompt registration and rendering.
#[derive(Debug, Error)]
pub enum PromptError {
    /// No prompt is registered under the requested name.
    #[error("prompt `{name}` is not registered")]
    TemplateNotFound {
        /// The requested name.
        name: String,
    },

    /// The generator failed; `source` is its original error.
    #[error("prompt `{name}` failed: {source}")]
    TemplateExecution {
        /// Name of the failing prompt.
        name: String,
        /// Error raised by the generator.
        #[source]
        source: GeneratorError,
    },

    /// A prompt with the same name is already registered.
    #[error("prompt `{name}` is already registered")]
    DuplicatePrompt {
        /// The colliding name.
        name: String,
    },

    /// The prompt name was empty.
    #[error("prompt name cannot be empty")]
    EmptyName,
}
