//! `connections`: inspect, configure and drive an agent's platform
//! connections from the command line.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! connections --agent agents/example.json list
//! connections actions discord
//! connections configure github
//! connections perform discord read-messages channel_id=123 count=5
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;

use agent_connections::{
    ActionArgs, ActionSpec, AgentConfig, ConnectionContext, ConnectionManager,
    EnvFileCredentialStore, HttpTransport, StdioPrompt, ValueKind, VERSION,
};

#[derive(Parser)]
#[command(name = "connections")]
#[command(version = VERSION)]
#[command(about = "Inspect and drive an agent's platform connections", long_about = None)]
struct Cli {
    /// Agent definition file (JSON, or YAML by extension)
    #[arg(long, global = true, default_value = "agents/example.json")]
    agent: PathBuf,

    /// Credential file
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the agent's connections and whether each is configured
    #[command(alias = "ls")]
    List,

    /// Show the actions a connection supports
    Actions {
        /// Connection name
        connection: String,
    },

    /// Set up credentials for a connection interactively
    Configure {
        /// Connection name
        connection: String,
    },

    /// Perform an action
    Perform {
        /// Connection name
        connection: String,

        /// Action name
        action: String,

        /// Arguments; string parameters take the value verbatim, others are
        /// parsed as JSON (falling back to a string)
        #[arg(value_name = "KEY=VALUE")]
        args: Vec<String>,
    },
}

/// Build an argument map from `KEY=VALUE` pairs, reading each value
/// according to the kind `spec` declares for its key.
fn parse_args(pairs: &[String], spec: Option<&ActionSpec>) -> anyhow::Result<ActionArgs> {
    let mut args = ActionArgs::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("Argument {:?} is not in KEY=VALUE form", pair);
        };
        let kind = spec.and_then(|s| s.parameter(key)).map(|p| p.kind);
        let value = match kind {
            Some(ValueKind::String) => Value::String(raw.to_string()),
            _ => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        };
        args.insert(key.to_string(), value);
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let agent = AgentConfig::from_file(&cli.agent)
        .with_context(|| format!("Failed to load agent file {}", cli.agent.display()))?;
    let credentials = Arc::new(EnvFileCredentialStore::new(&cli.env_file));
    let transport = Arc::new(HttpTransport::new()?);
    let manager = ConnectionManager::from_agent(&agent, ConnectionContext::new(credentials, transport))?;

    match cli.command {
        Commands::List => {
            println!("Connections for {}:", agent.name);
            let providers = manager.llm_providers();
            for name in manager.connection_names() {
                let status = if manager.is_configured(&name, true)? {
                    "configured"
                } else {
                    "not configured"
                };
                let llm = if providers.contains(&name) { " (LLM provider)" } else { "" };
                println!("  {}{} - {}", name, llm, status);
            }
        }

        Commands::Actions { connection } => {
            println!("Actions for {}:", connection);
            for action in manager.list_actions(&connection)? {
                println!("\n  {}: {}", action.name(), action.description());
                for param in action.parameters() {
                    println!(
                        "    {} ({}, {}) {}",
                        param.name,
                        param.kind,
                        if param.required { "required" } else { "optional" },
                        param.description
                    );
                }
            }
        }

        Commands::Configure { connection } => {
            if !manager.configure(&connection, &mut StdioPrompt)? {
                bail!("Configuration of {} failed", connection);
            }
        }

        Commands::Perform {
            connection,
            action,
            args,
        } => {
            let spec = manager
                .list_actions(&connection)?
                .into_iter()
                .find(|spec| spec.name() == action);
            let args = parse_args(&args, spec.as_ref())?;
            let result = manager.perform(&connection, &action, args)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
