//! Call requests issued by the model and the results paired back to them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Identifier the model assigns to a call request.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CallId(String);

impl CallId {
    /// Creates a call identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCallId`] if the identifier is blank.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::EmptyCallId);
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CallId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CallId> for String {
    fn from(value: CallId) -> Self {
        value.0
    }
}

/// Argument payload of a call request, either JSON-encoded text or an already
/// structured mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallArguments {
    /// JSON document encoded as a string.
    Encoded(String),
    /// Structured mapping.
    Structured(Map<String, Value>),
}

impl CallArguments {
    /// Normalizes the payload into a structured mapping.
    ///
    /// Blank strings and an encoded `null` are treated as "no arguments".
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArguments`] if the text is not valid JSON or does
    /// not decode to an object.
    pub fn into_map(self) -> Result<Map<String, Value>> {
        match self {
            Self::Structured(map) => Ok(map),
            Self::Encoded(text) if text.trim().is_empty() => Ok(Map::new()),
            Self::Encoded(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(Value::Null) => Ok(Map::new()),
                Ok(other) => Err(Error::InvalidArguments {
                    reason: format!("expected a JSON object, found {other}"),
                }),
                Err(err) => Err(Error::InvalidArguments {
                    reason: err.to_string(),
                }),
            },
        }
    }
}

impl From<Map<String, Value>> for CallArguments {
    fn from(value: Map<String, Value>) -> Self {
        Self::Structured(value)
    }
}

impl From<String> for CallArguments {
    fn from(value: String) -> Self {
        Self::Encoded(value)
    }
}

impl From<&str> for CallArguments {
    fn from(value: &str) -> Self {
        Self::Encoded(value.to_owned())
    }
}

/// A model-issued instruction to invoke one capability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    call_id: CallId,
    name: String,
    arguments: CallArguments,
}

impl CallRequest {
    /// Creates a call request.
    #[must_use]
    pub fn new(call_id: CallId, name: impl Into<String>, arguments: impl Into<CallArguments>) -> Self {
        Self {
            call_id,
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Identifier assigned by the model.
    #[must_use]
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// Target capability name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw argument payload, as received.
    #[must_use]
    pub fn arguments(&self) -> &CallArguments {
        &self.arguments
    }
}

/// Outcome of executing one [`CallRequest`], labelled with its identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    call_id: CallId,
    output: String,
    #[serde(skip)]
    failed: bool,
}

impl CallResult {
    /// Records a successful output.
    #[must_use]
    pub fn success(call_id: CallId, output: impl Into<String>) -> Self {
        Self {
            call_id,
            output: output.into(),
            failed: false,
        }
    }

    /// Records a failure; the error is stringified into the output slot.
    #[must_use]
    pub fn failure(call_id: CallId, error: &dyn std::error::Error) -> Self {
        Self {
            call_id,
            output: format!("error: {error}"),
            failed: true,
        }
    }

    /// Identifier of the originating call request.
    #[must_use]
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// Output text handed back to the model.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Whether the call failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn encoded_arguments_are_parsed() {
        let args = CallArguments::from(r#"{"a":3,"b":7}"#);
        let map = args.into_map().unwrap();
        assert_eq!(map.get("a"), Some(&json!(3)));
        assert_eq!(map.get("b"), Some(&json!(7)));
    }

    #[test]
    fn blank_and_null_arguments_are_empty() {
        assert!(CallArguments::from("  ").into_map().unwrap().is_empty());
        assert!(CallArguments::from("null").into_map().unwrap().is_empty());
    }

    #[test]
    fn non_object_arguments_fail() {
        let err = CallArguments::from("[1,2]").into_map().expect_err("array");
        assert!(matches!(err, Error::InvalidArguments { .. }));

        let err = CallArguments::from("{oops").into_map().expect_err("syntax");
        assert!(matches!(err, Error::InvalidArguments { .. }));
    }

    #[test]
    fn deserializes_both_argument_shapes() {
        let encoded: CallRequest = serde_json::from_value(json!({
            "call_id": "call_1",
            "name": "add",
            "arguments": "{\"a\":1}"
        }))
        .unwrap();
        assert!(matches!(encoded.arguments(), CallArguments::Encoded(_)));

        let structured: CallRequest = serde_json::from_value(json!({
            "call_id": "call_2",
            "name": "add",
            "arguments": {"a": 1}
        }))
        .unwrap();
        assert!(matches!(structured.arguments(), CallArguments::Structured(_)));
    }

    #[test]
    fn blank_call_id_rejected() {
        assert!(matches!(CallId::new(" "), Err(Error::EmptyCallId)));
    }

    #[test]
    fn failure_result_stringifies_error() {
        let err = Error::InvalidArguments {
            reason: "bad".into(),
        };
        let result = CallResult::failure(CallId::new("call_1").unwrap(), &err);
        assert!(result.is_failure());
        assert_eq!(result.output(), "error: invalid call arguments: bad");
    }
}
