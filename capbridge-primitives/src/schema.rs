//! Normalization of capability descriptors into the canonical call schema.
//!
//! Backends describe their parameters in several shapes (a JSON schema
//! mapping, a typed definition that exports its own schema, a list of
//! parameter records, or nothing at all). [`normalize`] is the single place
//! where those shapes are reconciled; nothing downstream branches on them.
//!
//! The produced parameter object always has `type = "object"`, a `properties`
//! map, and a `required` list. When the source gave no `required` signal every
//! declared property is treated as required.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::capability::{CapabilityDescriptor, InputSpec, ParameterRecord};
use crate::error::{Error, Result};

const TYPE_KEY: &str = "type";
const PROPERTIES_KEY: &str = "properties";
const REQUIRED_KEY: &str = "required";

/// Model-consumable function-call schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCallSchema {
    name: String,
    description: String,
    parameters: Map<String, Value>,
}

impl CanonicalCallSchema {
    /// Builds a schema directly from an already well-formed parameter object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaNormalization`] if `parameters` cannot be brought
    /// into canonical form.
    pub fn from_parameters(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Map<String, Value>,
    ) -> Result<Self> {
        let name = name.into();
        let parameters = finalize(&name, parameters)?;
        Ok(Self {
            name,
            description: description.into(),
            parameters,
        })
    }

    /// Function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Function description (empty when the descriptor had none).
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The parameter object definition.
    #[must_use]
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Declared properties. Always `Some` for schemas built by this module.
    #[must_use]
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.parameters.get(PROPERTIES_KEY).and_then(Value::as_object)
    }

    /// Names of the required parameters, in declaration order.
    #[must_use]
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get(REQUIRED_KEY)
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Converts a capability descriptor into its canonical call schema.
///
/// # Errors
///
/// Returns [`Error::SchemaNormalization`] when the descriptor's input shape
/// cannot be coerced into an object schema: a typed export that fails or
/// yields a non-object, or a mapping whose `type`, `properties` or `required`
/// keys hold the wrong kind of value.
pub fn normalize(descriptor: &CapabilityDescriptor) -> Result<CanonicalCallSchema> {
    let name = descriptor.name().as_str();
    let parameters = match descriptor.input() {
        InputSpec::Schema(map) => map.clone(),
        InputSpec::Typed(typed) => {
            let exported = typed.export().map_err(|err| {
                Error::normalization(name, format!("{} schema export failed: {err}", typed.label()))
            })?;
            match exported {
                Value::Object(map) => map,
                other => {
                    return Err(Error::normalization(
                        name,
                        format!("{} exported a non-object schema: {other}", typed.label()),
                    ));
                }
            }
        }
        InputSpec::Parameters(records) => from_records(records),
        InputSpec::Absent | InputSpec::Unrecognized(_) => open_schema(),
    };

    let parameters = finalize(name, parameters)?;
    Ok(CanonicalCallSchema {
        name: name.to_owned(),
        description: descriptor.description().unwrap_or_default().to_owned(),
        parameters,
    })
}

fn open_schema() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(TYPE_KEY.into(), Value::from("object"));
    map.insert(PROPERTIES_KEY.into(), Value::Object(Map::new()));
    map.insert("additionalProperties".into(), Value::Bool(true));
    map.insert(REQUIRED_KEY.into(), Value::Array(Vec::new()));
    map
}

fn from_records(records: &[ParameterRecord]) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for record in records {
        properties.insert(
            record.name().to_owned(),
            json!({
                "type": record.kind(),
                "description": record.description().unwrap_or_default(),
            }),
        );
        if record.is_required() {
            required.push(Value::from(record.name()));
        }
    }

    let mut map = Map::new();
    map.insert(TYPE_KEY.into(), Value::from("object"));
    map.insert(PROPERTIES_KEY.into(), Value::Object(properties));
    map.insert(REQUIRED_KEY.into(), Value::Array(required));
    map
}

fn finalize(name: &str, mut schema: Map<String, Value>) -> Result<Map<String, Value>> {
    match schema.get(TYPE_KEY) {
        None => {
            schema.insert(TYPE_KEY.into(), Value::from("object"));
        }
        Some(Value::String(kind)) if kind == "object" => {}
        Some(other) => {
            return Err(Error::normalization(
                name,
                format!("parameter schema must have type \"object\", found {other}"),
            ));
        }
    }

    let property_names: Vec<Value> = match schema
        .entry(PROPERTIES_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
    {
        Value::Object(properties) => properties.keys().cloned().map(Value::from).collect(),
        other => {
            return Err(Error::normalization(
                name,
                format!("`properties` must be an object, found {other}"),
            ));
        }
    };

    match schema.get(REQUIRED_KEY) {
        None => {
            schema.insert(REQUIRED_KEY.into(), Value::Array(property_names));
        }
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => {}
        Some(other) => {
            return Err(Error::normalization(
                name,
                format!("`required` must be a list of names, found {other}"),
            ));
        }
    }

    Ok(schema)
}
