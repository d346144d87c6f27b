// definition.rs: Action definitions and their parameter schemas.
//
// An ActionDefinition is fixed at process start. Its parameter list is the
// schema used to check a planner-proposed call before it reaches a handler,
// so handlers never see a missing or mistyped declared parameter.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON type tag for a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// Whether a JSON value has this type.
    ///
    /// `Number` accepts integers too; `Integer` rejects fractional numbers.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => write!(f, "string"),
            ParamType::Integer => write!(f, "integer"),
            ParamType::Number => write!(f, "number"),
            ParamType::Boolean => write!(f, "boolean"),
            ParamType::Object => write!(f, "object"),
            ParamType::Array => write!(f, "array"),
        }
    }
}

/// Name of the JSON type of `value`, for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared parameter of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A named action and its ordered parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Dotted name, e.g. `infra.restart`.
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ActionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Declare a required parameter (builder).
    pub fn param(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            param_type,
            required: true,
            description: String::new(),
        });
        self
    }

    /// Declare an optional parameter (builder).
    pub fn optional(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            param_type,
            required: false,
            description: String::new(),
        });
        self
    }

    /// The namespace part of the name (`infra` for `infra.restart`).
    pub fn family(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    pub fn param_spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_rejects_fractions_but_number_accepts_both() {
        assert!(ParamType::Integer.accepts(&json!(5)));
        assert!(!ParamType::Integer.accepts(&json!(5.5)));
        assert!(ParamType::Number.accepts(&json!(5)));
        assert!(ParamType::Number.accepts(&json!(5.5)));
    }

    #[test]
    fn builder_tracks_required_and_optional() {
        let def = ActionDefinition::new("infra.restart", "Restart a service")
            .param("service_id", ParamType::String)
            .optional("user_email", ParamType::String);

        let required: Vec<&str> = def.required_params().map(|p| p.name.as_str()).collect();
        assert_eq!(required, vec!["service_id"]);
        assert!(!def.param_spec("user_email").unwrap().required);
        assert_eq!(def.family(), "infra");
    }

    #[test]
    fn param_type_serializes_lowercase() {
        let json = serde_json::to_string(&ParamType::Boolean).unwrap();
        assert_eq!(json, "\"boolean\"");
    }
}
