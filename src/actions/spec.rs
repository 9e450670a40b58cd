//! Action definitions: a named, described list of parameters.

use std::collections::HashSet;

use serde::Serialize;

use super::parameter::ParameterSpec;
use super::ActionArgs;
use crate::error::{ConnectionError, Result};

/// A named operation a connection can perform, with its parameter schema.
///
/// Built once when a connection registers its actions and immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSpec {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
}

impl ActionSpec {
    /// Create an action definition.
    ///
    /// Fails if a parameter name is empty or appears more than once.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParameterSpec>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConnectionError::InvalidActionSpec(
                "action name must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for param in &parameters {
            if param.name.is_empty() {
                return Err(ConnectionError::InvalidActionSpec(format!(
                    "{}: parameter name must not be empty",
                    name
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(ConnectionError::InvalidActionSpec(format!(
                    "{}: duplicate parameter {}",
                    name, param.name
                )));
            }
        }

        Ok(Self {
            name,
            description: description.into(),
            parameters,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters, in declaration order.
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Look up a declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Validate a caller-supplied argument mapping.
    ///
    /// Returns one message per violation, in declaration order. An empty
    /// vector means the arguments are accepted. Keys that are not declared
    /// parameters are ignored.
    pub fn validate(&self, args: &ActionArgs) -> Vec<String> {
        self.parameters
            .iter()
            .filter_map(|param| param.check(args))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ValueKind;
    use serde_json::json;

    fn reply_spec() -> ActionSpec {
        ActionSpec::new(
            "reply-to-message",
            "Reply to a message",
            vec![
                ParameterSpec::required("channel_id", ValueKind::String, "Channel"),
                ParameterSpec::required("message_id", ValueKind::String, "Message to reply to"),
                ParameterSpec::required("message", ValueKind::String, "Reply content"),
                ParameterSpec::optional("count", ValueKind::Integer, "Unused"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_validate_reports_all_violations_in_order() {
        let args: ActionArgs = serde_json::from_value(json!({
            "message_id": 42,
            "count": "x"
        }))
        .unwrap();

        let errors = reply_spec().validate(&args);
        assert_eq!(
            errors,
            vec![
                "Missing required parameter: channel_id".to_string(),
                "Parameter message_id must be of type string".to_string(),
                "Missing required parameter: message".to_string(),
                "Parameter count must be of type integer".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_accepts_and_ignores_extra_keys() {
        let args: ActionArgs = serde_json::from_value(json!({
            "channel_id": "C1",
            "message_id": "M1",
            "message": "hi",
            "thread_hint": {"anything": true}
        }))
        .unwrap();
        assert!(reply_spec().validate(&args).is_empty());
    }

    #[test]
    fn test_rejects_duplicate_parameter_names() {
        let err = ActionSpec::new(
            "post-message",
            "",
            vec![
                ParameterSpec::required("message", ValueKind::String, ""),
                ParameterSpec::optional("message", ValueKind::String, ""),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidActionSpec(_)));
    }

    #[test]
    fn test_rejects_empty_parameter_name() {
        let err = ActionSpec::new(
            "post-message",
            "",
            vec![ParameterSpec::required("", ValueKind::String, "")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_parameter_lookup() {
        let spec = reply_spec();
        assert_eq!(spec.parameter("message").map(|p| p.required), Some(true));
        assert!(spec.parameter("missing").is_none());
        assert_eq!(spec.parameters().len(), 4);
    }
}
