//! Connection configuration.
//!
//! Each connection receives a raw JSON mapping and validates it with
//! `Connection::validate_config`. The helpers here implement the common
//! field checks and report the first offending field.
//!
//! Agent files collect the mappings for every connection an agent uses:
//!
//! ```json
//! {
//!   "name": "ExampleAgent",
//!   "config": [
//!     { "name": "discord", "message_read_count": 10, "server_id": "1234" },
//!     { "name": "eternalai", "model": "NousResearch/Hermes-3-Llama-3.1-70B-FP8" }
//!   ]
//! }
//! ```
//!
//! YAML files with the same shape are accepted when the extension is
//! `.yaml` or `.yml`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConnectionError, Result};

/// Raw, adapter-specific configuration mapping.
pub type ConfigMap = HashMap<String, Value>;

/// Fail with the first field of `required` absent from `config`.
pub fn require_fields(config: &ConfigMap, required: &[&str]) -> Result<()> {
    match required.iter().find(|field| !config.contains_key(**field)) {
        Some(field) => Err(ConnectionError::Configuration(format!(
            "Missing required configuration field: {}",
            field
        ))),
        None => Ok(()),
    }
}

/// Read a required string field.
pub fn require_string<'a>(config: &'a ConfigMap, field: &str) -> Result<&'a str> {
    require_fields(config, &[field])?;
    config[field].as_str().ok_or_else(|| {
        ConnectionError::Configuration(format!("{} must be a string", field))
    })
}

/// Read an optional string field; when present it must be non-empty.
pub fn optional_non_empty_string<'a>(config: &'a ConfigMap, field: &str) -> Result<Option<&'a str>> {
    match config.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.as_str())),
        Some(_) => Err(ConnectionError::Configuration(format!(
            "{} must be a non-empty string",
            field
        ))),
    }
}

/// Read an optional string field, allowing empty strings.
pub fn optional_string<'a>(config: &'a ConfigMap, field: &str) -> Result<Option<&'a str>> {
    match config.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ConnectionError::Configuration(format!(
            "{} must be a string",
            field
        ))),
    }
}

/// Read a required positive integer field.
pub fn require_positive_int(config: &ConfigMap, field: &str) -> Result<u64> {
    require_fields(config, &[field])?;
    positive_int(&config[field], field)
}

/// Read an optional positive integer field.
pub fn optional_positive_int(config: &ConfigMap, field: &str) -> Result<Option<u64>> {
    match config.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => positive_int(value, field).map(Some),
    }
}

fn positive_int(value: &Value, field: &str) -> Result<u64> {
    match value.as_u64() {
        Some(n) if n > 0 => Ok(n),
        _ => Err(ConnectionError::Configuration(format!(
            "{} must be a positive integer",
            field
        ))),
    }
}

/// An agent definition: its name and the configuration of each connection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub name: String,

    /// One mapping per connection; the `name` key selects the adapter.
    #[serde(default)]
    pub config: Vec<ConfigMap>,
}

impl AgentConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load an agent file, choosing the format by extension (JSON by default).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .map_or(false, |ext| ext == "yaml" || ext == "yml");

        let agent = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };
        log::info!(
            "Loaded agent {} with {} connection config(s) from {}",
            agent.name,
            agent.config.len(),
            path.display()
        );
        Ok(agent)
    }

    /// Connection configs paired with their connection name.
    ///
    /// Entries without a string `name` are skipped with a warning.
    pub fn connection_configs(&self) -> Vec<(String, ConfigMap)> {
        self.config
            .iter()
            .filter_map(|entry| match entry.get("name").and_then(Value::as_str) {
                Some(name) => Some((name.to_string(), entry.clone())),
                None => {
                    log::warn!("Skipping connection config without a name");
                    None
                }
            })
            .collect()
    }

    /// Config for a single connection, if the agent declares it.
    pub fn connection_config(&self, name: &str) -> Option<ConfigMap> {
        self.connection_configs()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, config)| config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn config(value: Value) -> ConfigMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_require_fields_reports_first_missing() {
        let err = require_fields(&config(json!({"a": 1})), &["a", "b", "c"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required configuration field: b"
        );
    }

    #[test]
    fn test_positive_int_checks() {
        let cfg = config(json!({"ok": 10, "zero": 0, "neg": -3, "text": "5"}));
        assert_eq!(require_positive_int(&cfg, "ok").unwrap(), 10);
        for field in ["zero", "neg", "text"] {
            let err = require_positive_int(&cfg, field).unwrap_err();
            assert!(err.to_string().contains("must be a positive integer"), "{field}");
        }
        assert_eq!(optional_positive_int(&cfg, "absent").unwrap(), None);
    }

    #[test]
    fn test_string_checks() {
        let cfg = config(json!({"model": "m", "empty": "", "num": 1}));
        assert_eq!(require_string(&cfg, "model").unwrap(), "m");
        assert!(require_string(&cfg, "num").is_err());
        assert!(optional_non_empty_string(&cfg, "empty").is_err());
        assert_eq!(optional_string(&cfg, "empty").unwrap(), Some(""));
        assert_eq!(optional_non_empty_string(&cfg, "absent").unwrap(), None);
    }

    #[test]
    fn test_agent_config_json() {
        let agent = AgentConfig::from_json(
            r#"{
                "name": "Helper",
                "bio": ["ignored"],
                "config": [
                    {"name": "discord", "message_read_count": 5},
                    {"model": "orphan"},
                    {"name": "eternalai", "model": "m1"}
                ]
            }"#,
        )
        .unwrap();

        let names: Vec<String> = agent.connection_configs().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["discord", "eternalai"]);
        assert_eq!(
            agent.connection_config("eternalai").unwrap()["model"],
            json!("m1")
        );
        assert!(agent.connection_config("github").is_none());
    }

    #[test]
    fn test_agent_config_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "name: Helper\nconfig:\n  - name: github\n    default_owner: octocat\n"
        )
        .unwrap();

        let agent = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(agent.name, "Helper");
        assert_eq!(
            agent.connection_config("github").unwrap()["default_owner"],
            json!("octocat")
        );
    }
}
