//! Prompt messages and the canonical output shapes of a prompt generator.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Speaker of a prompt message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions.
    System,
    /// End-user input.
    #[default]
    User,
    /// Model output.
    Assistant,
}

impl MessageRole {
    fn parse(role: &str) -> Option<Self> {
        match role {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// One structured message with a role and text content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    #[serde(default)]
    role: MessageRole,
    content: String,
}

impl PromptMessage {
    /// Creates a message with an explicit role.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Returns the speaker.
    #[must_use]
    pub const fn role(&self) -> MessageRole {
        self.role
    }

    /// Returns the text content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    fn from_value(value: Value) -> Result<Self, InvalidOutput> {
        let Value::Object(mut map) = value else {
            return Err(InvalidOutput::new(format!(
                "expected a message object, found {value}"
            )));
        };

        let role = match map.remove("role") {
            None | Some(Value::Null) => MessageRole::default(),
            Some(Value::String(role)) => MessageRole::parse(&role)
                .ok_or_else(|| InvalidOutput::new(format!("unknown message role `{role}`")))?,
            Some(other) => {
                return Err(InvalidOutput::new(format!(
                    "message role must be a string, found {other}"
                )));
            }
        };

        let content = match map.remove("content") {
            Some(Value::String(text)) => text,
            // Content blocks of the form {"type": "text", "text": "..."}.
            Some(Value::Object(block)) => match block.get("text") {
                Some(Value::String(text)) => text.clone(),
                _ => return Err(InvalidOutput::new("content block has no `text` string")),
            },
            Some(other) => {
                return Err(InvalidOutput::new(format!(
                    "message content must be text, found {other}"
                )));
            }
            None => return Err(InvalidOutput::new("message has no `content`")),
        };

        Ok(Self { role, content })
    }
}

/// Canonical result of rendering a prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum PromptOutput {
    /// Plain text; consumers treat it as a single user message.
    Text {
        /// The text.
        text: String,
    },
    /// A single structured message.
    Message {
        /// The message.
        message: PromptMessage,
    },
    /// An ordered sequence of structured messages.
    Messages {
        /// The messages, in order.
        messages: Vec<PromptMessage>,
    },
}

impl PromptOutput {
    /// Classifies an untyped generator result by its structure.
    ///
    /// Strings become text, objects carrying `content` become a single
    /// message, and arrays of strings or message objects become a message
    /// list (bare strings default to the user role).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOutput`] for any other structure.
    pub fn from_value(value: Value) -> Result<Self, InvalidOutput> {
        match value {
            Value::String(text) => Ok(Self::Text { text }),
            value @ Value::Object(_) => Ok(Self::Message {
                message: PromptMessage::from_value(value)?,
            }),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(text) => Ok(PromptMessage::user(text)),
                    other => PromptMessage::from_value(other),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|messages| Self::Messages { messages }),
            other => Err(InvalidOutput::new(format!(
                "cannot interpret {other} as prompt output"
            ))),
        }
    }

    /// Flattens the output into an ordered message list.
    #[must_use]
    pub fn into_messages(self) -> Vec<PromptMessage> {
        match self {
            Self::Text { text } => vec![PromptMessage::user(text)],
            Self::Message { message } => vec![message],
            Self::Messages { messages } => messages,
        }
    }
}

impl From<String> for PromptOutput {
    fn from(text: String) -> Self {
        Self::Text { text }
    }
}

impl From<&str> for PromptOutput {
    fn from(text: &str) -> Self {
        Self::Text {
            text: text.to_owned(),
        }
    }
}

impl From<PromptMessage> for PromptOutput {
    fn from(message: PromptMessage) -> Self {
        Self::Message { message }
    }
}

impl From<Vec<PromptMessage>> for PromptOutput {
    fn from(messages: Vec<PromptMessage>) -> Self {
        Self::Messages { messages }
    }
}

/// A generator produced a value that is none of the canonical output shapes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid prompt output: {reason}")]
pub struct InvalidOutput {
    reason: String,
}

impl InvalidOutput {
    /// Creates an error with the supplied reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
