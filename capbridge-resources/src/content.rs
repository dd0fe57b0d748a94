//! Resolved resource content.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag distinguishing textual from binary content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Binary,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Binary => "binary",
        })
    }
}

/// Content produced by a resource resolver. Text and binary payloads are
/// mutually exclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceContent {
    /// UTF-8 text payload.
    Text {
        /// The text.
        text: String,
        /// Optional MIME type.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    /// Raw byte payload.
    Binary {
        /// The bytes.
        data: Bytes,
        /// Optional MIME type.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl ResourceContent {
    /// Plain text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            mime_type: Some("text/plain".to_owned()),
        }
    }

    /// Structured data serialized as JSON text.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::Text {
            text: value.to_string(),
            mime_type: Some("application/json".to_owned()),
        }
    }

    /// Binary content.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::Binary {
            data: data.into(),
            mime_type: Some("application/octet-stream".to_owned()),
        }
    }

    /// Replaces the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        match &mut self {
            Self::Text { mime_type, .. } | Self::Binary { mime_type, .. } => {
                *mime_type = Some(mime.into());
            }
        }
        self
    }

    /// Returns the kind tag.
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        match self {
            Self::Text { .. } => ContentKind::Text,
            Self::Binary { .. } => ContentKind::Binary,
        }
    }

    /// Returns the MIME type, if any.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::Text { mime_type, .. } | Self::Binary { mime_type, .. } => mime_type.as_deref(),
        }
    }

    /// Returns the text payload for textual content.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::Binary { .. } => None,
        }
    }

    /// Returns the byte payload for binary content.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Binary { data, .. } => Some(data),
            Self::Text { .. } => None,
        }
    }

    /// Renders the content as a string suitable for a function call output.
    /// Binary payloads are hex encoded.
    #[must_use]
    pub fn into_output(self) -> String {
        match self {
            Self::Text { text, .. } => text,
            Self::Binary { data, .. } => hex::encode(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn kinds_are_exclusive() {
        let text = ResourceContent::text("Hello");
        assert_eq!(text.kind(), ContentKind::Text);
        assert_eq!(text.as_text(), Some("Hello"));
        assert!(text.as_bytes().is_none());

        let binary = ResourceContent::binary(vec![0xde, 0xad]);
        assert_eq!(binary.kind(), ContentKind::Binary);
        assert!(binary.as_text().is_none());
        assert_eq!(binary.into_output(), "dead");
    }

    #[test]
    fn json_content_is_tagged() {
        let content = ResourceContent::json(&json!({"stars": 120}));
        assert_eq!(content.mime_type(), Some("application/json"));
        let parsed: Value = serde_json::from_str(content.as_text().unwrap()).unwrap();
        assert_eq!(parsed["stars"], 120);
    }

    #[test]
    fn serializes_kind_tag() {
        let wire = serde_json::to_value(ResourceContent::text("hi").with_mime_type("text/markdown"))
            .unwrap();
        assert_eq!(wire["kind"], "text");
        assert_eq!(wire["mime_type"], "text/markdown");
    }
}
