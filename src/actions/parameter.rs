//! Parameter schema for a single action argument.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ActionArgs;

/// Expected type of an argument value.
///
/// Compatibility is representational: a boolean is accepted where an integer
/// or number is requested, an integer where a number is requested. `null` is
/// only accepted by `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl ValueKind {
    /// Whether `value` is a representation of this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ValueKind::Any => true,
            ValueKind::String => value.is_string(),
            ValueKind::Integer => value.is_i64() || value.is_boolean(),
            ValueKind::Number => value.is_number() || value.is_boolean(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Any => "any",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named argument of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Argument name, unique within its action.
    pub name: String,

    /// Whether callers must supply the argument.
    pub required: bool,

    /// Expected value type.
    pub kind: ValueKind,

    /// Human-readable documentation. Never interpreted.
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    pub fn new(
        name: impl Into<String>,
        required: bool,
        kind: ValueKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            required,
            kind,
            description: description.into(),
        }
    }

    /// Shorthand for a required parameter.
    pub fn required(name: impl Into<String>, kind: ValueKind, description: impl Into<String>) -> Self {
        Self::new(name, true, kind, description)
    }

    /// Shorthand for an optional parameter.
    pub fn optional(name: impl Into<String>, kind: ValueKind, description: impl Into<String>) -> Self {
        Self::new(name, false, kind, description)
    }

    /// Check this parameter against a caller-supplied argument mapping.
    ///
    /// Returns a failure message, or `None` if the argument is acceptable
    /// (including when an optional argument is absent).
    pub fn check(&self, args: &ActionArgs) -> Option<String> {
        match args.get(&self.name) {
            None if self.required => Some(format!("Missing required parameter: {}", self.name)),
            None => None,
            Some(value) if !self.kind.accepts(value) => Some(format!(
                "Parameter {} must be of type {}",
                self.name, self.kind
            )),
            Some(_) => None,
        }
    }
}
