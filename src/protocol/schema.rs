//! Tool parameter schemas and their protocol form.
//!
//! A [`ParameterSchema`] is an ordered list of declared parameters. It is
//! either written out explicitly or derived once from a `schemars` schema of a
//! typed argument struct. Both paths are pure: an unknown or unsupported type
//! degrades to `string` rather than failing.

use schemars::schema::{InstanceType, RootSchema, Schema, SchemaObject, SingleOrVec};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::String,
        }
    }

    const fn from_instance_type(instance: InstanceType) -> Self {
        match instance {
            InstanceType::Integer => Self::Integer,
            InstanceType::Number => Self::Number,
            InstanceType::Boolean => Self::Boolean,
            InstanceType::Array => Self::Array,
            InstanceType::Object => Self::Object,
            InstanceType::String | InstanceType::Null => Self::String,
        }
    }
}

impl From<String> for ParamType {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParamType, required: bool) -> Self {
        let name = name.into();
        let description = default_description(&name);
        Self { name, kind, required, description }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

fn default_description(name: &str) -> String {
    format!("Parameter {name}")
}

/// Ordered parameter declarations for one tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "WireParameters")]
pub struct ParameterSchema {
    params: Vec<ParamSpec>,
}

impl ParameterSchema {
    #[must_use]
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Declare a parameter. A later declaration with the same name replaces
    /// the earlier one in place.
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        if let Some(existing) = self.params.iter_mut().find(|p| p.name == spec.name) {
            *existing = spec;
        } else {
            self.params.push(spec);
        }
        self
    }

    #[must_use]
    pub fn required(self, name: &str, kind: ParamType, description: &str) -> Self {
        self.param(ParamSpec::new(name, kind, true).with_description(description))
    }

    #[must_use]
    pub fn optional(self, name: &str, kind: ParamType, description: &str) -> Self {
        self.param(ParamSpec::new(name, kind, false).with_description(description))
    }

    /// Derive the parameter list from a JSON schema produced by `schemars`.
    #[must_use]
    pub fn from_json_schema(root: &RootSchema) -> Self {
        let Some(object) = root.schema.object.as_deref() else {
            return Self::new();
        };

        let params = object
            .properties
            .iter()
            .map(|(name, schema)| {
                let (kind, description) = match schema {
                    Schema::Object(obj) => (param_type_of(obj), description_of(obj)),
                    Schema::Bool(_) => (ParamType::String, None),
                };
                ParamSpec {
                    name: name.clone(),
                    kind,
                    required: object.required.contains(name),
                    description: description.unwrap_or_else(|| default_description(name)),
                }
            })
            .collect();
        Self { params }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Names of required parameters, in declaration order.
    #[must_use]
    pub fn required_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }
}

fn param_type_of(obj: &SchemaObject) -> ParamType {
    match &obj.instance_type {
        Some(SingleOrVec::Single(instance)) => ParamType::from_instance_type(**instance),
        Some(SingleOrVec::Vec(instances)) => {
            let mut non_null = instances.iter().filter(|t| **t != InstanceType::Null);
            match (non_null.next(), non_null.next()) {
                (Some(only), None) => ParamType::from_instance_type(*only),
                _ => ParamType::String,
            }
        }
        None => ParamType::String,
    }
}

fn description_of(obj: &SchemaObject) -> Option<String> {
    obj.metadata
        .as_ref()
        .and_then(|meta| meta.description.clone())
        .filter(|d| !d.trim().is_empty())
}

impl Serialize for ParameterSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("properties", &Properties(&self.params))?;
        map.serialize_entry("required", &self.required_names())?;
        map.end()
    }
}

struct Properties<'a>(&'a [ParamSpec]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for spec in self.0 {
            let property = WireProperty {
                kind: spec.kind,
                description: spec.description.clone(),
                required: spec.required,
            };
            map.serialize_entry(&spec.name, &property)?;
        }
        map.end()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireProperty {
    #[serde(rename = "type", default)]
    kind: ParamType,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required: bool,
}

#[derive(Debug, Deserialize)]
struct WireParameters {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
    #[serde(default)]
    required: Vec<String>,
}

impl From<WireParameters> for ParameterSchema {
    fn from(wire: WireParameters) -> Self {
        let params = wire
            .properties
            .into_iter()
            .map(|(name, value)| {
                let property: WireProperty = serde_json::from_value(value).unwrap_or_default();
                let required = property.required || wire.required.contains(&name);
                let description = if property.description.is_empty() {
                    default_description(&name)
                } else {
                    property.description
                };
                ParamSpec { name, kind: property.kind, required, description }
            })
            .collect();
        Self { params }
    }
}

/// Protocol form of one tool, as announced to the remote session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptorDict {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde_json::json;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct WeatherArgs {
        /// City to look up.
        city: String,
        #[serde(default)]
        days: u32,
        metric: Option<bool>,
        tags: Vec<String>,
        extra: serde_json::Value,
    }

    #[test]
    fn explicit_schema_serializes_in_declaration_order() {
        let schema = ParameterSchema::new()
            .required("b", ParamType::Integer, "second")
            .optional("a", ParamType::String, "first");

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "object",
                "properties": {
                    "b": { "type": "integer", "description": "second", "required": true },
                    "a": { "type": "string", "description": "first", "required": false }
                },
                "required": ["b"]
            })
        );
        let keys: Vec<_> = value["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn redeclaring_a_parameter_replaces_it() {
        let schema = ParameterSchema::new()
            .required("x", ParamType::String, "")
            .optional("x", ParamType::Number, "");
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("x").unwrap().kind, ParamType::Number);
        assert!(schema.required_names().is_empty());
    }

    #[test]
    fn derives_types_and_requiredness_from_schemars() {
        let schema = ParameterSchema::from_json_schema(&schemars::schema_for!(WeatherArgs));

        let city = schema.get("city").unwrap();
        assert_eq!(city.kind, ParamType::String);
        assert!(city.required);
        assert_eq!(city.description, "City to look up.");

        let days = schema.get("days").unwrap();
        assert_eq!(days.kind, ParamType::Integer);
        assert!(!days.required);
        assert_eq!(days.description, "Parameter days");

        let metric = schema.get("metric").unwrap();
        assert_eq!(metric.kind, ParamType::Boolean);
        assert!(!metric.required);

        assert_eq!(schema.get("tags").unwrap().kind, ParamType::Array);
        assert_eq!(schema.get("extra").unwrap().kind, ParamType::String);
        assert_eq!(schema.required_names(), vec!["city", "tags", "extra"]);
    }

    #[test]
    fn untyped_arguments_yield_empty_schema() {
        let schema = ParameterSchema::from_json_schema(&schemars::schema_for!(serde_json::Value));
        assert!(schema.is_empty());
    }

    #[test]
    fn unknown_wire_type_degrades_to_string() {
        let parsed: ParameterSchema = serde_json::from_value(json!({
            "type": "object",
            "properties": { "when": { "type": "date-time" } },
            "required": ["when"]
        }))
        .unwrap();
        let when = parsed.get("when").unwrap();
        assert_eq!(when.kind, ParamType::String);
        assert!(when.required);
        assert_eq!(when.description, "Parameter when");
    }
}
