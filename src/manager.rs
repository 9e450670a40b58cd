//! ConnectionManager: builds an agent's connections and routes requests to
//! them by name.
//!
//! ```text
//! AgentConfig { config: [{name: "discord", ..}, {name: "github", ..}] }
//!   │ from_agent()
//!   ▼
//! ConnectionManager
//!   ├── factories:   "discord" → DiscordConnectionFactory, ...
//!   └── connections: "discord" → RwLock<Box<dyn ActionConnection>>, ...
//!         │ perform("discord", "post-message", args)
//!         ▼
//!       Dispatcher → operation → Transport
//! ```
//!
//! All connections share one `ConnectionContext`, so an agent reads every
//! credential from the same store and sends every request through the same
//! transport.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::actions::{ActionArgs, ActionSpec};
use crate::config::{AgentConfig, ConfigMap};
use crate::connection::{ActionConnection, Capabilities, ConnectionContext};
use crate::connections::{builtin_factories, BoxedConnection, ConnectionFactory};
use crate::error::{ConnectionError, Result};
use crate::setup::SetupPrompt;

pub struct ConnectionManager {
    context: ConnectionContext,

    /// Registered factories indexed by connection name
    factories: HashMap<String, Box<dyn ConnectionFactory>>,

    /// Active connections in configuration order
    connections: Vec<(String, RwLock<BoxedConnection>)>,
}

impl ConnectionManager {
    /// Create a manager with no factories registered.
    pub fn new(context: ConnectionContext) -> Self {
        Self {
            context,
            factories: HashMap::new(),
            connections: Vec::new(),
        }
    }

    /// Create a manager with all built-in connection factories registered.
    pub fn with_defaults(context: ConnectionContext) -> Self {
        let mut manager = Self::new(context);
        for factory in builtin_factories() {
            manager.register_factory(factory);
        }
        manager
    }

    /// Build every connection an agent declares. Unknown connection names are
    /// skipped with a warning; invalid configs fail the whole load.
    pub fn from_agent(agent: &AgentConfig, context: ConnectionContext) -> Result<Self> {
        let mut manager = Self::with_defaults(context);
        for (name, config) in agent.connection_configs() {
            if !manager.factories.contains_key(&name) {
                log::warn!("Skipping unknown connection: {}", name);
                continue;
            }
            manager.add_connection(&name, config)?;
        }
        log::info!(
            "Loaded {} connection(s) for agent {}",
            manager.connections.len(),
            agent.name
        );
        Ok(manager)
    }

    /// Register a connection factory, replacing any with the same name.
    pub fn register_factory(&mut self, factory: Box<dyn ConnectionFactory>) {
        let name = factory.name().to_string();
        self.factories.insert(name, factory);
    }

    /// Create a connection from `config` and make it available under `name`.
    /// An existing connection with that name is replaced.
    pub fn add_connection(&mut self, name: &str, config: ConfigMap) -> Result<()> {
        let factory = self.factories.get(name).ok_or_else(|| {
            ConnectionError::Configuration(format!(
                "No connection factory registered for: {}",
                name
            ))
        })?;

        let connection = RwLock::new(factory.create(config, self.context.clone())?);
        match self.connections.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = connection,
            None => self.connections.push((name.to_string(), connection)),
        }

        log::debug!("Connection {} ready", name);
        Ok(())
    }

    fn connection(&self, name: &str) -> Result<&RwLock<BoxedConnection>> {
        self.connections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, connection)| connection)
            .ok_or_else(|| ConnectionError::Configuration(format!("Unknown connection: {}", name)))
    }

    /// Names of the active connections, in configuration order.
    pub fn connection_names(&self) -> Vec<String> {
        self.connections.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Actions a connection supports, in registration order.
    pub fn list_actions(&self, name: &str) -> Result<Vec<ActionSpec>> {
        let connection = self.connection(name)?.read();
        Ok(connection.actions().iter().cloned().collect())
    }

    pub fn capabilities(&self, name: &str) -> Result<Capabilities> {
        Ok(self.connection(name)?.read().capabilities())
    }

    /// Run `action_name` on the named connection.
    pub fn perform(&self, name: &str, action_name: &str, args: ActionArgs) -> Result<Value> {
        let connection = self.connection(name)?.read();
        log::debug!("Performing {} on {}", action_name, name);
        connection.perform(action_name, args)
    }

    /// Interactive credential setup for one connection.
    pub fn configure(&self, name: &str, prompt: &mut dyn SetupPrompt) -> Result<bool> {
        Ok(self.connection(name)?.read().configure(prompt))
    }

    pub fn is_configured(&self, name: &str, verbose: bool) -> Result<bool> {
        Ok(self.connection(name)?.read().is_configured(verbose))
    }

    /// Validate and install a new configuration on a live connection. On
    /// error the previous configuration stays in effect.
    pub fn reconfigure(&self, name: &str, config: ConfigMap) -> Result<()> {
        self.connection(name)?.write().reconfigure(config)
    }

    /// Current configuration of a connection.
    pub fn config(&self, name: &str) -> Result<ConfigMap> {
        Ok(self.connection(name)?.read().config().clone())
    }

    /// Names of the connections that can serve text generation.
    pub fn llm_providers(&self) -> Vec<String> {
        self.connections
            .iter()
            .filter(|(_, c)| c.read().capabilities().is_llm_provider)
            .map(|(n, _)| n.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    use crate::connections::discord::DISCORD_TOKEN;
    use crate::credentials::MemoryCredentialStore;
    use crate::transport::{Method, MockTransport};

    const AGENT: &str = r#"{
        "name": "ExampleAgent",
        "config": [
            {"name": "discord", "message_read_count": 5, "server_id": "S1"},
            {"name": "eternalai", "model": "m"},
            {"name": "farcaster", "timeline_read_count": 10},
            {"name": "github", "default_owner": "octo"}
        ]
    }"#;

    fn context(transport: Arc<MockTransport>) -> ConnectionContext {
        let store = MemoryCredentialStore::new().with(DISCORD_TOKEN, "tok");
        ConnectionContext::new(Arc::new(store), transport)
    }

    fn manager(transport: Arc<MockTransport>) -> ConnectionManager {
        let agent = AgentConfig::from_json(AGENT).unwrap();
        ConnectionManager::from_agent(&agent, context(transport)).unwrap()
    }

    fn config(value: Value) -> ConfigMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_agent_skips_unknown_connections() {
        let manager = manager(Arc::new(MockTransport::new()));
        assert_eq!(manager.connection_names(), vec!["discord", "eternalai", "github"]);
        assert_eq!(manager.llm_providers(), vec!["eternalai"]);
    }

    #[test]
    fn test_from_agent_rejects_invalid_config() {
        let agent = AgentConfig::from_json(r#"{"name": "a", "config": [{"name": "discord"}]}"#).unwrap();
        let err = ConnectionManager::from_agent(&agent, context(Arc::new(MockTransport::new())))
            .err()
            .unwrap();
        assert!(err.to_string().contains("message_read_count"));
    }

    #[test]
    fn test_list_actions_in_registration_order() {
        let manager = manager(Arc::new(MockTransport::new()));
        let names: Vec<String> = manager
            .list_actions("github")
            .unwrap()
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["get-repo-updates", "analyze-fork", "track-changes"]);
    }

    #[test]
    fn test_perform_routes_to_connection() {
        let transport = Arc::new(
            MockTransport::new().respond(Method::Get, "/guilds/S1/channels", 200, r#"[{"id": "C1"}]"#),
        );
        let manager = manager(transport.clone());

        let out = manager
            .perform("discord", "list-channels", ActionArgs::new())
            .unwrap();
        assert_eq!(out, json!([{"id": "C1"}]));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_unknown_connection_and_action() {
        let manager = manager(Arc::new(MockTransport::new()));

        let err = manager
            .perform("slack", "post-message", ActionArgs::new())
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Configuration(_)));

        let err = manager
            .perform("discord", "delete-server", ActionArgs::new())
            .unwrap_err();
        assert!(matches!(err, ConnectionError::UnknownAction(name) if name == "delete-server"));
    }

    #[test]
    fn test_reconfigure_keeps_old_config_on_error() {
        let manager = manager(Arc::new(MockTransport::new()));

        assert!(manager
            .reconfigure("discord", config(json!({"message_read_count": 0})))
            .is_err());
        assert_eq!(manager.config("discord").unwrap()["message_read_count"], json!(5));

        manager
            .reconfigure("discord", config(json!({"message_read_count": 20})))
            .unwrap();
        assert_eq!(manager.config("discord").unwrap()["message_read_count"], json!(20));
    }

    #[test]
    fn test_is_configured_per_connection() {
        let transport = Arc::new(
            MockTransport::new().respond(Method::Get, "/users/@me", 200, r#"{"username": "zbot"}"#),
        );
        let manager = manager(transport);

        assert!(manager.is_configured("discord", false).unwrap());
        assert!(!manager.is_configured("github", false).unwrap());
        assert!(manager.is_configured("nope", false).is_err());
    }

    #[test]
    fn test_add_connection_requires_factory() {
        let mut manager = ConnectionManager::new(context(Arc::new(MockTransport::new())));
        assert!(manager.add_connection("github", ConfigMap::new()).is_err());

        manager.register_factory(Box::new(crate::connections::GitHubConnectionFactory));
        manager.add_connection("github", ConfigMap::new()).unwrap();
        manager.add_connection("github", ConfigMap::new()).unwrap();
        assert_eq!(manager.connection_names(), vec!["github"]);
        assert!(!manager.capabilities("github").unwrap().is_llm_provider);
    }
}
