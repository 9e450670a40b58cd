//! Built-in platform connections.
//!
//! Each connection implements `Connection` for one platform and ships a
//! `ConnectionFactory` so the `ConnectionManager` can build it by name from
//! agent configuration. New platforms are added by implementing the trait and
//! registering the factory with the manager.

pub mod discord;
pub mod eternalai;
pub mod github;

pub use discord::{DiscordConnection, DiscordConnectionFactory};
pub use eternalai::{EternalAiConnection, EternalAiConnectionFactory};
pub use github::{GitHubConnection, GitHubConnectionFactory};

use crate::config::ConfigMap;
use crate::connection::{ActionConnection, ConnectionContext};
use crate::error::Result;

/// A constructed connection behind its object-safe facade.
pub type BoxedConnection = Box<dyn ActionConnection>;

/// Factory for creating connection instances
pub trait ConnectionFactory: Send + Sync {
    /// Connection name as used in agent configuration
    fn name(&self) -> &str;

    /// Validate `config` and build a connection around `context`.
    fn create(&self, config: ConfigMap, context: ConnectionContext) -> Result<BoxedConnection>;
}

/// Factories for every built-in connection.
pub fn builtin_factories() -> Vec<Box<dyn ConnectionFactory>> {
    vec![
        Box::new(DiscordConnectionFactory),
        Box::new(EternalAiConnectionFactory),
        Box::new(GitHubConnectionFactory),
    ]
}
