//! EternalAI connection: text generation against EternalAI's
//! OpenAI-compatible chat completions API.
//!
//! ## Configuration
//!
//! ```yaml
//! name: eternalai
//! model: "NousResearch/Hermes-3-Llama-3.1-70B-FP8"
//! chain_id: "45762"        # optional
//! ```
//!
//! The API key and base URL come from the credential store
//! (`EternalAI_API_KEY`, `EternalAI_API_URL`).

use serde_json::{json, Value};

use crate::actions::{string_arg, ActionArgs, ActionRegistry, ActionSpec, ParameterSpec, ValueKind};
use crate::config::{optional_string, require_string, ConfigMap};
use crate::connection::{Connection, ConnectionContext};
use crate::dispatch::{Dispatcher, OperationTable};
use crate::error::{ConnectionError, Result};
use crate::setup::{CredentialField, GuidedSetup, SetupPrompt};
use crate::transport::TransportRequest;

use super::{BoxedConnection, ConnectionFactory};

pub const ETERNALAI_API_KEY: &str = "EternalAI_API_KEY";
pub const ETERNALAI_API_URL: &str = "EternalAI_API_URL";

/// Chain used when neither the caller nor the config names one.
pub const DEFAULT_CHAIN_ID: &str = "45762";

/// `owned_by` values marking a fine-tuned model.
const FINE_TUNED_OWNERS: [&str; 3] = ["organization", "user", "organization-owner"];

const SETUP: GuidedSetup<'static> = GuidedSetup {
    title: "EternalAI API",
    instructions: &[
        "\nTo get your EternalAI credentials:",
        "1. Visit https://eternalai.org/api",
        "2. Generate an API Key",
        "3. Use API url as https://api.eternalai.org/v1/",
    ],
    fields: &[
        CredentialField {
            key: ETERNALAI_API_KEY,
            question: "\nEnter your EternalAI API key: ",
        },
        CredentialField {
            key: ETERNALAI_API_URL,
            question: "\nEnter your EternalAI API url: ",
        },
    ],
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct EternalAiSettings {
    model: String,
    chain_id: Option<String>,
}

impl EternalAiSettings {
    fn from_config(config: &ConfigMap) -> Result<Self> {
        Ok(Self {
            model: require_string(config, "model")?.to_string(),
            chain_id: optional_string(config, "chain_id")?
                .filter(|c| !c.is_empty())
                .map(String::from),
        })
    }
}

/// API key plus base URL (no trailing slash).
struct Credentials {
    api_key: String,
    api_url: String,
}

impl Credentials {
    fn new(api_key: &str, api_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

pub struct EternalAiConnection {
    config: ConfigMap,
    settings: EternalAiSettings,
    context: ConnectionContext,
    dispatcher: Dispatcher<Self>,
}

impl EternalAiConnection {
    pub fn new(config: ConfigMap, context: ConnectionContext) -> Result<Self> {
        let config = Self::validate_config(config)?;
        let settings = EternalAiSettings::from_config(&config)?;

        Ok(Self {
            config,
            settings,
            context,
            dispatcher: Self::build_dispatcher()?,
        })
    }

    fn credentials(&self) -> Result<Credentials> {
        let store = &self.context.credentials;
        match (store.get(ETERNALAI_API_KEY), store.get(ETERNALAI_API_URL)) {
            (Some(key), Some(url)) => Ok(Credentials::new(&key, &url)),
            _ => Err(ConnectionError::Configuration(
                "EternalAI credentials not found in credential store".to_string(),
            )),
        }
    }

    fn request(&self, credentials: &Credentials, request: TransportRequest) -> Result<Value> {
        self.context
            .transport
            .request(request.header("Authorization", format!("Bearer {}", credentials.api_key)))?
            .json()
    }

    fn fetch_models(&self, credentials: &Credentials) -> Result<Vec<Value>> {
        let listing = self.request(
            credentials,
            TransportRequest::get(format!("{}/models", credentials.api_url)),
        )?;
        Ok(listing
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    fn generate_text(&self, args: &ActionArgs) -> Result<Value> {
        let credentials = self.credentials()?;
        let prompt = string_arg(args, "prompt")?;
        let system_prompt = string_arg(args, "system_prompt")?;
        let model = string_arg(args, "model")?;
        let chain_id = match string_arg(args, "chain_id")? {
            "" => DEFAULT_CHAIN_ID,
            id => id,
        };
        log::info!("model {}", model);
        log::info!("chain_id {}", chain_id);

        let request = TransportRequest::post(format!("{}/chat/completions", credentials.api_url))
            .json(json!({
                "model": model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": prompt},
                ],
                "chain_id": chain_id,
            }));

        let response = self
            .context
            .transport
            .request(request.header("Authorization", format!("Bearer {}", credentials.api_key)))?;
        let status = response.status;
        let completion = response.json()?;

        if let Some(onchain) = completion.get("onchain_data").filter(|d| !d.is_null()) {
            log::info!(
                "response onchain data: {}",
                serde_json::to_string_pretty(onchain)?
            );
        }

        let content = completion
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.pointer("/message/content"))
            .cloned()
            .ok_or_else(|| {
                ConnectionError::platform(status, "Text generation failed: completion.choices is None")
            })?;

        Ok(content)
    }

    fn check_model(&self, args: &ActionArgs) -> Result<Value> {
        let credentials = self.credentials()?;
        let model = string_arg(args, "model")?;

        match self.request(
            &credentials,
            TransportRequest::get(format!("{}/models/{}", credentials.api_url, model)),
        ) {
            Ok(_) => Ok(Value::Bool(true)),
            Err(ConnectionError::PlatformApi { status, .. }) => {
                log::debug!("Model {} not available (HTTP {})", model, status);
                Ok(Value::Bool(false))
            }
            Err(e) => Err(e),
        }
    }

    fn list_models(&self, _args: &ActionArgs) -> Result<Value> {
        let credentials = self.credentials()?;
        let fine_tuned: Vec<Value> = self
            .fetch_models(&credentials)?
            .iter()
            .filter(|m| {
                m.get("owned_by")
                    .and_then(Value::as_str)
                    .map_or(false, |owner| FINE_TUNED_OWNERS.contains(&owner))
            })
            .filter_map(|m| m.get("id").cloned())
            .collect();

        if !fine_tuned.is_empty() {
            log::info!("FINE-TUNED MODELS:");
            for (i, id) in fine_tuned.iter().enumerate() {
                log::info!("{}. {}", i + 1, id.as_str().unwrap_or_default());
            }
        }

        Ok(Value::Array(fine_tuned))
    }
}

impl Connection for EternalAiConnection {
    const NAME: &'static str = "eternalai";
    const IS_LLM_PROVIDER: bool = true;

    fn validate_config(config: ConfigMap) -> Result<ConfigMap> {
        EternalAiSettings::from_config(&config)?;
        Ok(config)
    }

    fn register_actions(registry: &mut ActionRegistry) -> Result<()> {
        registry.register(ActionSpec::new(
            "generate-text",
            "Generate text using EternalAI models",
            vec![
                ParameterSpec::required("prompt", ValueKind::String, "The input prompt for text generation"),
                ParameterSpec::required("system_prompt", ValueKind::String, "System prompt to guide the model"),
                ParameterSpec::optional("model", ValueKind::String, "Model to use for generation"),
                ParameterSpec::optional("chain_id", ValueKind::String, "Chain to run the model on"),
            ],
        )?);
        registry.register(ActionSpec::new(
            "check-model",
            "Check if a specific model is available",
            vec![ParameterSpec::required("model", ValueKind::String, "Model name to check availability")],
        )?);
        registry.register(ActionSpec::new(
            "list-models",
            "List all available EternalAI models",
            vec![],
        )?);
        Ok(())
    }

    fn operations() -> OperationTable<Self> {
        OperationTable::new()
            .route("generate_text", Self::generate_text)
            .route("check_model", Self::check_model)
            .route("list_models", Self::list_models)
    }

    fn dispatcher(&self) -> &Dispatcher<Self> {
        &self.dispatcher
    }

    fn config(&self) -> &ConfigMap {
        &self.config
    }

    fn reconfigure(&mut self, config: ConfigMap) -> Result<()> {
        let config = Self::validate_config(config)?;
        self.settings = EternalAiSettings::from_config(&config)?;
        self.config = config;
        Ok(())
    }

    fn default_arguments(&self, action_name: &str) -> ActionArgs {
        let mut defaults = ActionArgs::new();
        if action_name == "generate-text" {
            defaults.insert("model".to_string(), json!(self.settings.model));
            defaults.insert(
                "chain_id".to_string(),
                json!(self.settings.chain_id.as_deref().unwrap_or(DEFAULT_CHAIN_ID)),
            );
        }
        defaults
    }

    fn configure(&self, prompt: &mut dyn SetupPrompt) -> bool {
        let already = Connection::is_configured(self, false);
        SETUP.run(prompt, self.context.credentials.as_ref(), already, |values| {
            let credentials = Credentials::new(&values[ETERNALAI_API_KEY], &values[ETERNALAI_API_URL]);
            self.fetch_models(&credentials).map(|_| ())
        })
    }

    fn is_configured(&self, verbose: bool) -> bool {
        let result = self
            .credentials()
            .and_then(|credentials| self.fetch_models(&credentials));

        match result {
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

/// Factory for EternalAI connections
pub struct EternalAiConnectionFactory;

impl ConnectionFactory for EternalAiConnectionFactory {
    fn name(&self) -> &str {
        EternalAiConnection::NAME
    }

    fn create(&self, config: ConfigMap, context: ConnectionContext) -> Result<BoxedConnection> {
        Ok(Box::new(EternalAiConnection::new(config, context)?))
    }
}
