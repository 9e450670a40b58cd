//! Connection trait: the contract every platform adapter implements.

use std::sync::Arc;

use serde_json::Value;

use crate::actions::{ActionArgs, ActionRegistry};
use crate::config::ConfigMap;
use crate::credentials::CredentialStore;
use crate::dispatch::{Dispatcher, OperationTable};
use crate::error::Result;
use crate::setup::SetupPrompt;
use crate::transport::Transport;

/// Static facts about a connection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Whether the connection can serve text-generation requests.
    pub is_llm_provider: bool,
}

/// Collaborators shared by the connections of one agent.
#[derive(Clone)]
pub struct ConnectionContext {
    pub credentials: Arc<dyn CredentialStore>,
    pub transport: Arc<dyn Transport>,
}

impl ConnectionContext {
    pub fn new(credentials: Arc<dyn CredentialStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            credentials,
            transport,
        }
    }
}

/// A platform adapter exposing named actions.
///
/// Implementors declare their actions in `register_actions`, map each one to
/// an operation in `operations`, and hold the `Dispatcher` built from both by
/// `build_dispatcher`. The lifecycle is:
/// `validate_config()` → construction → `perform()`*, with `configure()` /
/// `is_configured()` managing credentials out of band.
pub trait Connection: Sized + Send + Sync + 'static {
    /// Connection name as used in agent configuration (e.g. "discord").
    const NAME: &'static str;

    /// Whether this connection type can serve text-generation requests.
    const IS_LLM_PROVIDER: bool = false;

    /// Validate a raw configuration mapping, returning it unchanged when
    /// accepted. Errors name the first offending field.
    fn validate_config(config: ConfigMap) -> Result<ConfigMap>;

    /// Declare every action this connection supports.
    fn register_actions(registry: &mut ActionRegistry) -> Result<()>;

    /// Operations backing the registered actions, keyed by operation id.
    fn operations() -> OperationTable<Self>;

    fn dispatcher(&self) -> &Dispatcher<Self>;

    /// The validated configuration currently in effect.
    fn config(&self) -> &ConfigMap;

    /// Validate and install a new configuration.
    fn reconfigure(&mut self, config: ConfigMap) -> Result<()>;

    /// Values for optional parameters the caller left out, drawn from config.
    ///
    /// Only keys absent from the caller's arguments are applied.
    fn default_arguments(&self, _action_name: &str) -> ActionArgs {
        ActionArgs::new()
    }

    /// Interactive credential setup. Never fails; returns whether a working
    /// credential is in place afterwards.
    fn configure(&self, prompt: &mut dyn SetupPrompt) -> bool;

    /// Whether the stored credential exists and authenticates. Absent and
    /// rejected credentials both yield `false`; with `verbose` the cause is
    /// logged.
    fn is_configured(&self, verbose: bool) -> bool;

    fn capabilities() -> Capabilities {
        Capabilities {
            is_llm_provider: Self::IS_LLM_PROVIDER,
        }
    }

    /// Build the registry and dispatcher for this connection type.
    fn build_dispatcher() -> Result<Dispatcher<Self>> {
        let mut registry = ActionRegistry::new();
        Self::register_actions(&mut registry)?;
        Dispatcher::new(registry, Self::operations())
    }

    /// Validate and route an action request.
    fn perform(&self, action_name: &str, args: ActionArgs) -> Result<Value> {
        self.dispatcher().perform(self, action_name, args)
    }
}

/// Object-safe view of a `Connection`, for holding heterogeneous connections.
pub trait ActionConnection: Send + Sync {
    fn name(&self) -> &'static str;
    fn capabilities(&self) -> Capabilities;
    fn actions(&self) -> &ActionRegistry;
    fn config(&self) -> &ConfigMap;
    fn perform(&self, action_name: &str, args: ActionArgs) -> Result<Value>;
    fn reconfigure(&mut self, config: ConfigMap) -> Result<()>;
    fn configure(&self, prompt: &mut dyn SetupPrompt) -> bool;
    fn is_configured(&self, verbose: bool) -> bool;
}

impl<C: Connection> ActionConnection for C {
    fn name(&self) -> &'static str {
        C::NAME
    }

    fn capabilities(&self) -> Capabilities {
        <C as Connection>::capabilities()
    }

    fn actions(&self) -> &ActionRegistry {
        Connection::dispatcher(self).registry()
    }

    fn config(&self) -> &ConfigMap {
        Connection::config(self)
    }

    fn perform(&self, action_name: &str, args: ActionArgs) -> Result<Value> {
        Connection::perform(self, action_name, args)
    }

    fn reconfigure(&mut self, config: ConfigMap) -> Result<()> {
        Connection::reconfigure(self, config)
    }

    fn configure(&self, prompt: &mut dyn SetupPrompt) -> bool {
        Connection::configure(self, prompt)
    }

    fn is_configured(&self, verbose: bool) -> bool {
        Connection::is_configured(self, verbose)
    }
}
