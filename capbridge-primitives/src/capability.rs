//! Capability descriptors as declared by a backend.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const MAX_NAME_LEN: usize = 64;

/// Boxed error returned by schema exporters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Name of a callable capability, as the model will address it.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityName(String);

impl CapabilityName {
    /// Creates a new capability name after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapabilityName`] if the name is empty, too long,
    /// or contains characters function-calling APIs reject.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CapabilityName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CapabilityName> for String {
    fn from(value: CapabilityName) -> Self {
        value.0
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidCapabilityName {
            name: String::new(),
            reason: "name cannot be empty".into(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidCapabilityName {
            name: name.into(),
            reason: format!("name length must be <= {MAX_NAME_LEN}"),
        });
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(Error::InvalidCapabilityName {
            name: name.into(),
            reason: "name must contain ascii alphanumeric, dash, or underscore".into(),
        });
    }

    Ok(())
}

/// Implemented by typed parameter definitions that can export their own JSON
/// schema.
pub trait SchemaExport: Send + Sync {
    /// Produces the JSON schema describing the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when the schema cannot be generated.
    fn export_schema(&self) -> std::result::Result<Value, BoxError>;
}

struct JsonSchemaExport<T>(PhantomData<fn() -> T>);

impl<T: JsonSchema> SchemaExport for JsonSchemaExport<T> {
    fn export_schema(&self) -> std::result::Result<Value, BoxError> {
        let root = schemars::schema_for!(T);
        Ok(serde_json::to_value(root)?)
    }
}

/// Shared handle to a [`SchemaExport`] implementation.
#[derive(Clone)]
pub struct TypedSchema {
    label: &'static str,
    exporter: Arc<dyn SchemaExport>,
}

impl TypedSchema {
    /// Builds a typed schema backed by a `schemars` derived type.
    #[must_use]
    pub fn of<T: JsonSchema + 'static>() -> Self {
        Self {
            label: std::any::type_name::<T>(),
            exporter: Arc::new(JsonSchemaExport::<T>(PhantomData)),
        }
    }

    /// Wraps a custom exporter.
    #[must_use]
    pub fn from_exporter(label: &'static str, exporter: Arc<dyn SchemaExport>) -> Self {
        Self { label, exporter }
    }

    /// Label used in diagnostics (the Rust type name for derived schemas).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Invokes the underlying exporter.
    ///
    /// # Errors
    ///
    /// Propagates the exporter failure.
    pub fn export(&self) -> std::result::Result<Value, BoxError> {
        self.exporter.export_schema()
    }
}

impl fmt::Debug for TypedSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// One entry of a list-of-parameters input specification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRecord {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required: Option<bool>,
}

impl ParameterRecord {
    /// Creates a record with no explicit required flag.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            description: None,
            required: None,
        }
    }

    /// Sets the parameter description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the explicit required flag.
    #[must_use]
    pub const fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the parameter is required. A record without a flag counts as
    /// required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(true)
    }
}

/// Input specification of a capability, in whichever shape the backend
/// declared it.
#[derive(Clone, Debug, Default)]
pub enum InputSpec {
    /// A JSON object schema mapping.
    Schema(Map<String, Value>),
    /// A typed definition that exports its own schema.
    Typed(TypedSchema),
    /// An ordered list of parameter records.
    Parameters(Vec<ParameterRecord>),
    /// No input specification was declared.
    #[default]
    Absent,
    /// Something that is none of the above.
    Unrecognized(Value),
}

impl InputSpec {
    /// Classifies an untyped JSON payload received from a backend.
    ///
    /// Objects become [`InputSpec::Schema`], arrays become
    /// [`InputSpec::Parameters`], `null` becomes [`InputSpec::Absent`], and any
    /// other value is kept as [`InputSpec::Unrecognized`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaNormalization`] when an array element is not a
    /// parameter record with string `name` and `type` fields.
    pub fn from_value(name: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::Object(map) => Ok(Self::Schema(map)),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| {
                    serde_json::from_value::<ParameterRecord>(item).map_err(|err| {
                        Error::normalization(name, format!("parameter record #{idx}: {err}"))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Parameters),
            other => Ok(Self::Unrecognized(other)),
        }
    }
}

/// Describes a callable capability exposed by a backend, before normalization.
#[derive(Clone, Debug)]
pub struct CapabilityDescriptor {
    name: CapabilityName,
    description: Option<String>,
    input: InputSpec,
}

impl CapabilityDescriptor {
    /// Creates a descriptor with the supplied input specification.
    #[must_use]
    pub fn new(name: CapabilityName, input: InputSpec) -> Self {
        Self {
            name,
            description: None,
            input,
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Capability name.
    #[must_use]
    pub fn name(&self) -> &CapabilityName {
        &self.name
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared input specification.
    #[must_use]
    pub fn input(&self) -> &InputSpec {
        &self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn validates_names() {
        assert!(CapabilityName::new("get_addition").is_ok());
        assert!(CapabilityName::new("read-resource").is_ok());

        let err = CapabilityName::new("").expect_err("empty");
        assert!(matches!(err, Error::InvalidCapabilityName { .. }));

        let err = CapabilityName::new("has space").expect_err("space");
        assert!(matches!(err, Error::InvalidCapabilityName { .. }));

        let err = CapabilityName::new("x".repeat(65)).expect_err("too long");
        assert!(matches!(err, Error::InvalidCapabilityName { .. }));
    }

    #[test]
    fn record_without_flag_is_required() {
        assert!(ParameterRecord::new("a", "int").is_required());
        assert!(!ParameterRecord::new("a", "int").with_required(false).is_required());
    }

    #[test]
    fn classifies_untyped_inputs() {
        assert!(matches!(
            InputSpec::from_value("t", Value::Null).unwrap(),
            InputSpec::Absent
        ));
        assert!(matches!(
            InputSpec::from_value("t", json!({"type": "object"})).unwrap(),
            InputSpec::Schema(_)
        ));
        assert!(matches!(
            InputSpec::from_value("t", json!(42)).unwrap(),
            InputSpec::Unrecognized(_)
        ));

        let spec = InputSpec::from_value(
            "t",
            json!([{"name": "a", "type": "int", "required": false}, {"name": "b", "type": "int"}]),
        )
        .unwrap();
        let InputSpec::Parameters(records) = spec else {
            panic!("expected parameter records");
        };
        assert_eq!(records.len(), 2);
        assert!(!records[0].is_required());
        assert!(records[1].is_required());
    }

    #[test]
    fn malformed_record_fails_classification() {
        let err = InputSpec::from_value("t", json!([{"type": "int"}])).expect_err("no name");
        assert!(matches!(err, Error::SchemaNormalization { name, .. } if name == "t"));
    }

    #[test]
    fn name_deserialization_validates() {
        let err = serde_json::from_value::<CapabilityName>(json!("bad name"));
        assert!(err.is_err());
    }
}
