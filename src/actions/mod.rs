//! # Actions
//!
//! Declarative description of what a connection can do. Every connection
//! registers a set of `ActionSpec`s in its `ActionRegistry` at construction;
//! callers address actions by name and pass arguments as a JSON mapping.
//!
//! ```text
//! ActionRegistry
//!   ├── "read-messages" → ActionSpec { channel_id: string (required),
//!   │                                  count: integer (optional) }
//!   └── "post-message"  → ActionSpec { channel_id, message }
//! ```
//!
//! The helpers below read typed values back out of a validated argument map
//! inside operations.

pub mod parameter;
pub mod registry;
pub mod spec;

pub use parameter::{ParameterSpec, ValueKind};
pub use registry::ActionRegistry;
pub use spec::ActionSpec;

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{ConnectionError, Result};

/// Caller-supplied arguments for one action invocation.
pub type ActionArgs = HashMap<String, Value>;

fn invalid(message: String) -> ConnectionError {
    ConnectionError::InvalidParameters(vec![message])
}

/// Read a required string argument.
pub fn string_arg<'a>(args: &'a ActionArgs, name: &str) -> Result<&'a str> {
    optional_string_arg(args, name)?
        .ok_or_else(|| invalid(format!("Missing required parameter: {}", name)))
}

/// Read an optional string argument.
pub fn optional_string_arg<'a>(args: &'a ActionArgs, name: &str) -> Result<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid(format!("Parameter {} must be of type string", name))),
    }
}

/// Read a required integer argument. Booleans read as 0 or 1.
pub fn integer_arg(args: &ActionArgs, name: &str) -> Result<i64> {
    optional_integer_arg(args, name)?
        .ok_or_else(|| invalid(format!("Missing required parameter: {}", name)))
}

/// Read an optional integer argument. Booleans read as 0 or 1.
pub fn optional_integer_arg(args: &ActionArgs, name: &str) -> Result<Option<i64>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(i64::from(*b))),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(format!("Parameter {} must be of type integer", name))),
    }
}

/// Read a required count argument, which must lie in `1..=max`.
pub fn count_arg(args: &ActionArgs, name: &str, max: u64) -> Result<u64> {
    let count = integer_arg(args, name)?;
    match u64::try_from(count) {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(invalid(format!(
            "Parameter {} must be between 1 and {}",
            name, max
        ))),
    }
}
