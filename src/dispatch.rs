//! Dispatcher: validates an action request and routes it to an operation.
//!
//! Every `perform` is an independent transaction:
//!
//! ```text
//! perform("read-messages", {channel_id: "C1"})
//!   → registry.lookup            (UnknownAction)
//!   → spec.validate              (InvalidParameters, all violations)
//!   → connection.default_arguments, absent keys only
//!   → operations["read_messages"] (InternalRouting)
//!   → operation(connection, args)
//! ```
//!
//! Operation identifiers are derived from action names by replacing hyphens
//! with underscores. The table is checked against the registry when the
//! dispatcher is built, so a missing operation surfaces at connection
//! construction rather than on first call.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::actions::{ActionArgs, ActionRegistry, ActionSpec};
use crate::connection::Connection;
use crate::error::{ConnectionError, Result};

/// An operation implementing one action on connection type `C`.
pub type Operation<C> = fn(&C, &ActionArgs) -> Result<Value>;

/// Translate an action name into its operation identifier.
pub fn operation_id(action_name: &str) -> String {
    action_name.replace('-', "_")
}

/// Static mapping from operation identifier to implementation.
pub struct OperationTable<C> {
    operations: HashMap<&'static str, Operation<C>>,
}

impl<C> OperationTable<C> {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Add an operation under `id` (e.g. `"read_messages"`).
    pub fn route(mut self, id: &'static str, operation: Operation<C>) -> Self {
        self.operations.insert(id, operation);
        self
    }

    pub fn get(&self, id: &str) -> Option<Operation<C>> {
        self.operations.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operations.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl<C> Default for OperationTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry plus operation table for one connection.
pub struct Dispatcher<C> {
    registry: ActionRegistry,
    operations: OperationTable<C>,
}

impl<C> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.operations.ids().collect();
        ids.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("actions", &self.registry.names())
            .field("operations", &ids)
            .finish()
    }
}

impl<C: Connection> Dispatcher<C> {
    /// Build a dispatcher, rejecting any registered action without an operation.
    pub fn new(registry: ActionRegistry, operations: OperationTable<C>) -> Result<Self> {
        let missing: Vec<&str> = registry
            .iter()
            .map(ActionSpec::name)
            .filter(|name| operations.get(&operation_id(name)).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(ConnectionError::InternalRouting(format!(
                "{}: no operation registered for action(s): {}",
                C::NAME,
                missing.join(", ")
            )));
        }

        Ok(Self {
            registry,
            operations,
        })
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Register or replace an action after construction.
    ///
    /// No coverage check happens here; an action without an operation fails
    /// with `InternalRouting` when performed.
    pub fn register(&mut self, spec: ActionSpec) {
        self.registry.register(spec);
    }

    /// Validate and route one action request.
    pub fn perform(&self, connection: &C, action_name: &str, mut args: ActionArgs) -> Result<Value> {
        let spec = self.registry.lookup(action_name)?;

        let errors = spec.validate(&args);
        if !errors.is_empty() {
            return Err(ConnectionError::InvalidParameters(errors));
        }

        for (key, value) in connection.default_arguments(action_name) {
            args.entry(key).or_insert(value);
        }

        let id = operation_id(action_name);
        let operation = self.operations.get(&id).ok_or_else(|| {
            ConnectionError::InternalRouting(format!(
                "{}: action {} is registered but operation {} is missing",
                C::NAME,
                action_name,
                id
            ))
        })?;

        log::debug!("{}: performing {} ({} argument(s))", C::NAME, action_name, args.len());
        operation(connection, &args)
    }
}
