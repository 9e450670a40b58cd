//! # agent-connections
//!
//! Platform connections for autonomous agents behind one uniform action
//! interface. Every connection declares named actions with typed parameters;
//! callers invoke them by name with a JSON argument mapping, and the
//! dispatcher validates the request before any platform call is made.
//!
//! ```text
//! ConnectionManager ──perform("discord", "post-message", {..})──┐
//!                                                               ▼
//!   Connection (discord / eternalai / github)
//!     └── Dispatcher: lookup → validate → defaults → operation
//!                                                     │
//!                       CredentialStore ◄─────────────┤
//!                       Transport ◄───────────────────┘
//! ```

pub mod actions;
pub mod config;
pub mod connection;
pub mod connections;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod setup;
pub mod transport;

pub use actions::{ActionArgs, ActionRegistry, ActionSpec, ParameterSpec, ValueKind};
pub use config::{AgentConfig, ConfigMap};
pub use connection::{ActionConnection, Capabilities, Connection, ConnectionContext};
pub use credentials::{CredentialStore, EnvFileCredentialStore, MemoryCredentialStore};
pub use dispatch::Dispatcher;
pub use error::{ConnectionError, Result};
pub use manager::ConnectionManager;
pub use setup::{SetupPrompt, StdioPrompt};
pub use transport::{HttpTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
