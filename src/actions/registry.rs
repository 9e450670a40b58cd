//! Per-connection action registry.
//!
//! Maps an action name to its `ActionSpec`. Lookups are exact string matches;
//! names are never normalized. Iteration follows first-registration order so
//! help output is stable.

use std::collections::HashMap;

use super::spec::ActionSpec;
use crate::error::{ConnectionError, Result};

#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    /// Specs indexed by action name
    actions: HashMap<String, ActionSpec>,

    /// Names in first-registration order
    order: Vec<String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action, replacing any previous spec with the same name.
    pub fn register(&mut self, spec: ActionSpec) {
        let name = spec.name().to_string();
        if self.actions.insert(name.clone(), spec).is_none() {
            self.order.push(name);
        } else {
            log::debug!("Replaced action definition: {}", name);
        }
    }

    /// Resolve an action by name.
    pub fn lookup(&self, name: &str) -> Result<&ActionSpec> {
        self.actions
            .get(name)
            .ok_or_else(|| ConnectionError::UnknownAction(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered actions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionSpec> {
        self.order.iter().filter_map(|name| self.actions.get(name))
    }

    /// Registered action names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
