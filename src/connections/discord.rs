//! Discord connection: read and post channel messages through the Discord
//! REST API with a bot token.
//!
//! ## Configuration
//!
//! ```json
//! { "name": "discord", "message_read_count": 10, "server_id": "1234567890" }
//! ```
//!
//! `message_read_count` is the default `count` for `read-messages`;
//! `server_id` is the default server for `list-channels`. The bot token is
//! read from the credential store under `DISCORD_TOKEN`.

use serde_json::{json, Value};

use crate::actions::{
    count_arg, optional_string_arg, string_arg, ActionArgs, ActionRegistry, ActionSpec,
    ParameterSpec, ValueKind,
};
use crate::config::{optional_non_empty_string, require_positive_int, ConfigMap};
use crate::connection::{Connection, ConnectionContext};
use crate::dispatch::{Dispatcher, OperationTable};
use crate::error::{ConnectionError, Result};
use crate::setup::{CredentialField, GuidedSetup, SetupPrompt};
use crate::transport::TransportRequest;

use super::{BoxedConnection, ConnectionFactory};

/// Credential store key for the bot token.
pub const DISCORD_TOKEN: &str = "DISCORD_TOKEN";

const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";

/// Largest `limit` the messages endpoint accepts.
const MAX_MESSAGE_READ_COUNT: u64 = 100;

const SETUP: GuidedSetup<'static> = GuidedSetup {
    title: "Discord API",
    instructions: &[
        "\nTo get your Discord API credentials:",
        "1. Follow Discord's API documentation here: https://www.postman.com/discord-api/discord-api/collection/0d7xls9/discord-rest-api",
        "2. Copy the Discord token generated during the setup.",
    ],
    fields: &[CredentialField {
        key: DISCORD_TOKEN,
        question: "\nEnter your Discord token: ",
    }],
};

/// Typed view of a validated Discord config.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DiscordSettings {
    message_read_count: u64,
    server_id: Option<String>,
}

impl DiscordSettings {
    fn from_config(config: &ConfigMap) -> Result<Self> {
        Ok(Self {
            message_read_count: require_positive_int(config, "message_read_count")?,
            server_id: optional_non_empty_string(config, "server_id")?.map(String::from),
        })
    }
}

pub struct DiscordConnection {
    config: ConfigMap,
    settings: DiscordSettings,
    base_url: String,
    context: ConnectionContext,
    dispatcher: Dispatcher<Self>,
}

impl DiscordConnection {
    pub fn new(config: ConfigMap, context: ConnectionContext) -> Result<Self> {
        log::info!("Initializing Discord connection...");
        let config = Self::validate_config(config)?;
        let settings = DiscordSettings::from_config(&config)?;

        Ok(Self {
            config,
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            context,
            dispatcher: Self::build_dispatcher()?,
        })
    }

    /// Point the connection at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn token(&self) -> Result<String> {
        self.context.credentials.get(DISCORD_TOKEN).ok_or_else(|| {
            ConnectionError::Configuration(format!(
                "{} not found in credential store",
                DISCORD_TOKEN
            ))
        })
    }

    fn request(&self, request: TransportRequest, token: &str) -> Result<Value> {
        let request = request
            .header("Accept", "application/json")
            .header("Authorization", format!("Bot {}", token));
        self.context.transport.request(request)?.json()
    }

    fn call(&self, request: TransportRequest) -> Result<Value> {
        let token = self.token()?;
        self.request(request, &token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check that `token` authenticates; returns the bot's username.
    fn verify_token(&self, token: &str) -> Result<String> {
        let me = self.request(TransportRequest::get(self.url("/users/@me")), token)?;
        let username = me
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        log::info!("Logged in as: {}", username);
        Ok(username)
    }

    fn read_messages(&self, args: &ActionArgs) -> Result<Value> {
        let channel_id = string_arg(args, "channel_id")?;
        let count = count_arg(args, "count", MAX_MESSAGE_READ_COUNT)?;
        log::debug!("Reading {} messages from channel {}", count, channel_id);

        let messages = self.call(TransportRequest::get(
            self.url(&format!("/channels/{}/messages?limit={}", channel_id, count)),
        ))?;

        log::info!(
            "Retrieved {} messages",
            messages.as_array().map_or(0, Vec::len)
        );
        Ok(messages)
    }

    fn post_message(&self, args: &ActionArgs) -> Result<Value> {
        let channel_id = string_arg(args, "channel_id")?;
        let message = string_arg(args, "message")?;
        log::debug!("Sending a new message");

        let response = self.call(
            TransportRequest::post(self.url(&format!("/channels/{}/messages", channel_id)))
                .json(json!({ "content": message })),
        )?;

        log::info!("Message posted successfully");
        Ok(response)
    }

    fn reply_to_message(&self, args: &ActionArgs) -> Result<Value> {
        let channel_id = string_arg(args, "channel_id")?;
        let message_id = string_arg(args, "message_id")?;
        let message = string_arg(args, "message")?;
        log::debug!("Replying to message {}", message_id);

        let response = self.call(
            TransportRequest::post(self.url(&format!("/channels/{}/messages", channel_id))).json(
                json!({
                    "content": message,
                    "message_reference": {
                        "channel_id": channel_id,
                        "message_id": message_id,
                    },
                }),
            ),
        )?;

        log::info!("Reply posted successfully");
        Ok(response)
    }

    fn react_to_message(&self, args: &ActionArgs) -> Result<Value> {
        let channel_id = string_arg(args, "channel_id")?;
        let message_id = string_arg(args, "message_id")?;
        let emoji = string_arg(args, "emoji")?;

        self.call(TransportRequest::put(self.url(&format!(
            "/channels/{}/messages/{}/reactions/{}/@me",
            channel_id, message_id, emoji
        ))))?;

        log::info!("Reacted to message {} with {}", message_id, emoji);
        Ok(json!({ "reacted": true, "message_id": message_id, "emoji": emoji }))
    }

    fn list_channels(&self, args: &ActionArgs) -> Result<Value> {
        let server_id = optional_string_arg(args, "server_id")?.ok_or_else(|| {
            ConnectionError::Configuration(
                "server_id is required for list-channels; pass it or set server_id in the discord config"
                    .to_string(),
            )
        })?;

        let channels = self.call(TransportRequest::get(
            self.url(&format!("/guilds/{}/channels", server_id)),
        ))?;

        log::info!(
            "Retrieved {} channels",
            channels.as_array().map_or(0, Vec::len)
        );
        Ok(channels)
    }
}

impl Connection for DiscordConnection {
    const NAME: &'static str = "discord";

    fn validate_config(config: ConfigMap) -> Result<ConfigMap> {
        DiscordSettings::from_config(&config)?;
        Ok(config)
    }

    fn register_actions(registry: &mut ActionRegistry) -> Result<()> {
        registry.register(ActionSpec::new(
            "read-messages",
            "Get the latest messages from a channel",
            vec![
                ParameterSpec::required(
                    "channel_id",
                    ValueKind::String,
                    "The channel id to get messages from",
                ),
                ParameterSpec::optional(
                    "count",
                    ValueKind::Integer,
                    "Number of messages to retrieve (default: message_read_count)",
                ),
            ],
        )?);
        registry.register(ActionSpec::new(
            "post-message",
            "Post a new message",
            vec![
                ParameterSpec::required(
                    "channel_id",
                    ValueKind::String,
                    "The channel id for the message to be posted in",
                ),
                ParameterSpec::required("message", ValueKind::String, "Text content of the message"),
            ],
        )?);
        registry.register(ActionSpec::new(
            "reply-to-message",
            "Reply to an existing message",
            vec![
                ParameterSpec::required(
                    "channel_id",
                    ValueKind::String,
                    "The channel id of the message to reply to",
                ),
                ParameterSpec::required("message_id", ValueKind::String, "ID of the message to reply to"),
                ParameterSpec::required("message", ValueKind::String, "Reply message content"),
            ],
        )?);
        registry.register(ActionSpec::new(
            "react-to-message",
            "Add a reaction to a message",
            vec![
                ParameterSpec::required("channel_id", ValueKind::String, "The channel id of the message"),
                ParameterSpec::required("message_id", ValueKind::String, "ID of the message to react to"),
                ParameterSpec::required(
                    "emoji",
                    ValueKind::String,
                    "Unicode emoji, or name:id for a custom emoji",
                ),
            ],
        )?);
        registry.register(ActionSpec::new(
            "list-channels",
            "List the channels of a server",
            vec![ParameterSpec::optional(
                "server_id",
                ValueKind::String,
                "The server id (default: server_id from config)",
            )],
        )?);
        Ok(())
    }

    fn operations() -> OperationTable<Self> {
        OperationTable::new()
            .route("read_messages", Self::read_messages)
            .route("post_message", Self::post_message)
            .route("reply_to_message", Self::reply_to_message)
            .route("react_to_message", Self::react_to_message)
            .route("list_channels", Self::list_channels)
    }

    fn dispatcher(&self) -> &Dispatcher<Self> {
        &self.dispatcher
    }

    fn config(&self) -> &ConfigMap {
        &self.config
    }

    fn reconfigure(&mut self, config: ConfigMap) -> Result<()> {
        let config = Self::validate_config(config)?;
        self.settings = DiscordSettings::from_config(&config)?;
        self.config = config;
        Ok(())
    }

    fn default_arguments(&self, action_name: &str) -> ActionArgs {
        let mut defaults = ActionArgs::new();
        match action_name {
            "read-messages" => {
                defaults.insert("count".to_string(), json!(self.settings.message_read_count));
            }
            "list-channels" => {
                if let Some(server_id) = &self.settings.server_id {
                    defaults.insert("server_id".to_string(), json!(server_id));
                }
            }
            _ => {}
        }
        defaults
    }

    fn configure(&self, prompt: &mut dyn SetupPrompt) -> bool {
        let already = Connection::is_configured(self, false);
        SETUP.run(prompt, self.context.credentials.as_ref(), already, |values| {
            self.verify_token(&values[DISCORD_TOKEN]).map(|_| ())
        })
    }

    fn is_configured(&self, verbose: bool) -> bool {
        let Some(token) = self.context.credentials.get(DISCORD_TOKEN) else {
            if verbose {
                log::debug!("Configuration check failed: {} is not set", DISCORD_TOKEN);
            }
            return false;
        };

        match self.verify_token(&token) {
            Ok(_) => true,
            Err(e) => {
                if verbose {
                    log::debug!("Configuration check failed: {}", e);
                }
                false
            }
        }
    }
}

/// Factory for Discord connections
pub struct DiscordConnectionFactory;

impl ConnectionFactory for DiscordConnectionFactory {
    fn name(&self) -> &str {
        DiscordConnection::NAME
    }

    fn create(&self, config: ConfigMap, context: ConnectionContext) -> Result<BoxedConnection> {
        Ok(Box::new(DiscordConnection::new(config, context)?))
    }
}
