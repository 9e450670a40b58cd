//! GitHub connection: read-only repository insight over the GitHub REST API.
//!
//! ## Configuration
//!
//! ```json
//! { "name": "github", "default_owner": "octocat", "commit_read_count": 10 }
//! ```
//!
//! Both fields are optional. `default_owner` fills in `owner` when a caller
//! leaves it out; `commit_read_count` (default 10) fills in `count`. The
//! access token is read from the credential store under
//! `GITHUB_ACCESS_TOKEN`.

use serde_json::{json, Value};

use crate::actions::{
    count_arg, optional_string_arg, string_arg, ActionArgs, ActionRegistry, ActionSpec,
    ParameterSpec, ValueKind,
};
use crate::config::{optional_non_empty_string, optional_positive_int, ConfigMap};
use crate::connection::{Connection, ConnectionContext};
use crate::dispatch::{Dispatcher, OperationTable};
use crate::error::{ConnectionError, Result};
use crate::setup::{CredentialField, GuidedSetup, SetupPrompt};
use crate::transport::TransportRequest;

use super::{BoxedConnection, ConnectionFactory};

pub const GITHUB_ACCESS_TOKEN: &str = "GITHUB_ACCESS_TOKEN";

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const DEFAULT_COMMIT_READ_COUNT: u64 = 10;

/// Largest `per_page` the REST API accepts.
const MAX_PER_PAGE: u64 = 100;

const SETUP: GuidedSetup<'static> = GuidedSetup {
    title: "GitHub API",
    instructions: &[
        "\nTo get your GitHub access token:",
        "1. Go to https://github.com/settings/tokens",
        "2. Generate a fine-grained token with read access to the repositories you want to follow.",
        "3. Copy the token.",
    ],
    fields: &[CredentialField {
        key: GITHUB_ACCESS_TOKEN,
        question: "\nEnter your GitHub access token: ",
    }],
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct GitHubSettings {
    default_owner: Option<String>,
    commit_read_count: u64,
}

impl GitHubSettings {
    fn from_config(config: &ConfigMap) -> Result<Self> {
        Ok(Self {
            default_owner: optional_non_empty_string(config, "default_owner")?.map(String::from),
            commit_read_count: optional_positive_int(config, "commit_read_count")?
                .unwrap_or(DEFAULT_COMMIT_READ_COUNT),
        })
    }
}

pub struct GitHubConnection {
    config: ConfigMap,
    settings: GitHubSettings,
    base_url: String,
    context: ConnectionContext,
    dispatcher: Dispatcher<Self>,
}

impl GitHubConnection {
    pub fn new(config: ConfigMap, context: ConnectionContext) -> Result<Self> {
        log::info!("Initializing GitHub connection...");
        let config = Self::validate_config(config)?;
        let settings = GitHubSettings::from_config(&config)?;

        Ok(Self {
            config,
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            context,
            dispatcher: Self::build_dispatcher()?,
        })
    }

    /// Point the connection at a GitHub Enterprise API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn token(&self) -> Result<String> {
        self.context.credentials.get(GITHUB_ACCESS_TOKEN).ok_or_else(|| {
            ConnectionError::Configuration(format!(
                "{} not found in credential store",
                GITHUB_ACCESS_TOKEN
            ))
        })
    }

    fn request(&self, path: &str, token: &str) -> Result<Value> {
        let request = TransportRequest::get(format!("{}{}", self.base_url, path))
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", token))
            .header("User-Agent", concat!("agent-connections/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", API_VERSION);
        self.context.transport.request(request)?.json()
    }

    fn get(&self, path: &str) -> Result<Value> {
        let token = self.token()?;
        self.request(path, &token)
    }

    fn verify_token(&self, token: &str) -> Result<String> {
        let user = self.request("/user", token)?;
        let login = user
            .get("login")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        log::info!("Authenticated to GitHub as {}", login);
        Ok(login)
    }

    /// `(owner, repo)` for a repository action.
    fn repository<'a>(args: &'a ActionArgs) -> Result<(&'a str, &'a str)> {
        let owner = optional_string_arg(args, "owner")?.ok_or_else(|| {
            ConnectionError::Configuration(
                "owner is required; pass it or set default_owner in the github config".to_string(),
            )
        })?;
        Ok((owner, string_arg(args, "repo")?))
    }

    fn get_repo_updates(&self, args: &ActionArgs) -> Result<Value> {
        let (owner, repo) = Self::repository(args)?;
        let count = count_arg(args, "count", MAX_PER_PAGE)?;
        log::debug!("Fetching {} commits for {}/{}", count, owner, repo);

        let commits = self.get(&format!("/repos/{}/{}/commits?per_page={}", owner, repo, count))?;
        let commits: Vec<Value> = commits
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(summarize_commit)
            .collect();

        log::info!("Retrieved {} commits for {}/{}", commits.len(), owner, repo);
        Ok(json!({
            "repository": format!("{}/{}", owner, repo),
            "commits": commits,
        }))
    }

    fn analyze_fork(&self, args: &ActionArgs) -> Result<Value> {
        let (owner, repo) = Self::repository(args)?;
        let details = self.get(&format!("/repos/{}/{}", owner, repo))?;

        let mut analysis = json!({
            "repository": format!("{}/{}", owner, repo),
            "is_fork": details["fork"].as_bool().unwrap_or(false),
            "default_branch": details["default_branch"],
            "stars": details["stargazers_count"],
            "forks": details["forks_count"],
            "open_issues": details["open_issues_count"],
        });

        let parent = match details.get("parent").filter(|p| p.is_object()) {
            Some(parent) => parent,
            None => return Ok(analysis),
        };

        let parent_name = parent["full_name"].as_str().unwrap_or_default();
        let parent_branch = parent["default_branch"].as_str().unwrap_or("main");
        let branch = details["default_branch"].as_str().unwrap_or("main");

        let comparison = self.get(&format!(
            "/repos/{}/compare/{}...{}:{}",
            parent_name, parent_branch, owner, branch
        ))?;

        analysis["parent"] = json!(parent_name);
        analysis["comparison"] = json!({
            "status": comparison["status"],
            "ahead_by": comparison["ahead_by"],
            "behind_by": comparison["behind_by"],
        });

        log::info!(
            "{}/{} is {} ahead, {} behind {}",
            owner,
            repo,
            comparison["ahead_by"],
            comparison["behind_by"],
            parent_name
        );
        Ok(analysis)
    }

    fn track_changes(&self, args: &ActionArgs) -> Result<Value> {
        let (owner, repo) = Self::repository(args)?;
        let count = count_arg(args, "count", MAX_PER_PAGE)?;

        let events = self.get(&format!("/repos/{}/{}/events?per_page={}", owner, repo, count))?;
        let events: Vec<Value> = events
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|event| {
                json!({
                    "type": event["type"],
                    "actor": event["actor"]["login"],
                    "created_at": event["created_at"],
                })
            })
            .collect();

        log::info!("Retrieved {} events for {}/{}", events.len(), owner, repo);
        Ok(json!({
            "repository": format!("{}/{}", owner, repo),
            "events": events,
        }))
    }
}

fn summarize_commit(commit: &Value) -> Value {
    let message = commit["commit"]["message"].as_str().unwrap_or_default();
    json!({
        "sha": commit["sha"],
        "author": commit["commit"]["author"]["name"],
        "date": commit["commit"]["author"]["date"],
        "message": message.lines().next().unwrap_or_default(),
    })
}

fn repository_parameters(with_count: bool) -> Vec<ParameterSpec> {
    let mut params = vec![
        ParameterSpec::optional(
            "owner",
            ValueKind::String,
            "Repository owner (default: default_owner from config)",
        ),
        ParameterSpec::required("repo", ValueKind::String, "Repository name"),
    ];
    if with_count {
        params.push(ParameterSpec::optional(
            "count",
            ValueKind::Integer,
            "Number of entries to retrieve (default: commit_read_count)",
        ));
    }
    params
}

impl Connection for GitHubConnection {
    const NAME: &'static str = "github";

    fn validate_config(config: ConfigMap) -> Result<ConfigMap> {
        GitHubSettings::from_config(&config)?;
        Ok(config)
    }

    fn register_actions(registry: &mut ActionRegistry) -> Result<()> {
        registry.register(ActionSpec::new(
            "get-repo-updates",
            "Retrieves updates for a GitHub repository",
            repository_parameters(true),
        )?);
        registry.register(ActionSpec::new(
            "analyze-fork",
            "Analyze a GitHub fork",
            repository_parameters(false),
        )?);
        registry.register(ActionSpec::new(
            "track-changes",
            "Tracks changes in a GitHub repository",
            repository_parameters(true),
        )?);
        Ok(())
    }

    fn operations() -> OperationTable<Self> {
        OperationTable::new()
            .route("get_repo_updates", Self::get_repo_updates)
            .route("analyze_fork", Self::analyze_fork)
            .route("track_changes", Self::track_changes)
    }

    fn dispatcher(&self) -> &Dispatcher<Self> {
        &self.dispatcher
    }

    fn config(&self) -> &ConfigMap {
        &self.config
    }

    fn reconfigure(&mut self, config: ConfigMap) -> Result<()> {
        let config = Self::validate_config(config)?;
        self.settings = GitHubSettings::from_config(&config)?;
        self.config = config;
        Ok(())
    }

    fn default_arguments(&self, action_name: &str) -> ActionArgs {
        let mut defaults = ActionArgs::new();
        if let Some(owner) = &self.settings.default_owner {
            defaults.insert("owner".to_string(), json!(owner));
        }
        if action_name != "analyze-fork" {
            defaults.insert("count".to_string(), json!(self.settings.commit_read_count));
        }
        defaults
    }

    fn configure(&self, prompt: &mut dyn SetupPrompt) -> bool {
        let already = Connection::is_configured(self, false);
        SETUP.run(prompt, self.context.credentials.as_ref(), already, |values| {
            self.verify_token(&values[GITHUB_ACCESS_TOKEN]).map(|_| ())
        })
    }

    fn is_configured(&self, verbose: bool) -> bool {
        match self.token().and_then(|token| self.verify_token(&token)) {
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

/// Factory for GitHub connections
pub struct GitHubConnectionFactory;

impl ConnectionFactory for GitHubConnectionFactory {
    fn name(&self) -> &str {
        GitHubConnection::NAME
    }

    fn create(&self, config: ConfigMap, context: ConnectionContext) -> Result<BoxedConnection> {
        Ok(Box::new(GitHubConnection::new(config, context)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::credentials::{CredentialStore, MemoryCredentialStore};
    use crate::setup::ScriptedPrompt;
    use crate::transport::{Method, MockTransport};

    const COMMITS: &str = r#"[
        {"sha": "a1", "commit": {"message": "Fix parser\n\nLonger body", "author": {"name": "Ada", "date": "2024-01-02T00:00:00Z"}}},
        {"sha": "b2", "commit": {"message": "Initial commit", "author": {"name": "Lin", "date": "2024-01-01T00:00:00Z"}}}
    ]"#;

    fn config(value: Value) -> ConfigMap {
        serde_json::from_value(value).unwrap()
    }

    fn args(value: Value) -> ActionArgs {
        serde_json::from_value(value).unwrap()
    }

    fn connection(transport: MockTransport, cfg: Value) -> (GitHubConnection, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let store = Arc::new(MemoryCredentialStore::new().with(GITHUB_ACCESS_TOKEN, "ghp_x"));
        let conn = GitHubConnection::new(config(cfg), ConnectionContext::new(store, transport.clone()))
            .unwrap();
        (conn, transport)
    }

    #[test]
    fn test_repo_updates_summarizes_commits() {
        let (conn, transport) = connection(
            MockTransport::new().respond(Method::Get, "/repos/octo/hello/commits", 200, COMMITS),
            json!({"default_owner": "octo"}),
        );

        let out = conn
            .perform("get-repo-updates", args(json!({"repo": "hello"})))
            .unwrap();
        assert_eq!(out["repository"], json!("octo/hello"));
        assert_eq!(out["commits"][0]["message"], json!("Fix parser"));
        assert_eq!(out["commits"][1]["author"], json!("Lin"));

        let req = transport.last_request().unwrap();
        assert!(req.url.ends_with("/repos/octo/hello/commits?per_page=10"));
        assert_eq!(req.header_value("Authorization"), Some("Bearer ghp_x"));
        assert_eq!(req.header_value("X-GitHub-Api-Version"), Some(API_VERSION));
        assert!(req.header_value("User-Agent").is_some());
    }

    #[test]
    fn test_explicit_owner_and_count_win() {
        let (conn, transport) = connection(
            MockTransport::new().respond(Method::Get, "/repos/rust-lang/rust/commits", 200, "[]"),
            json!({"default_owner": "octo", "commit_read_count": 3}),
        );

        conn.perform(
            "get-repo-updates",
            args(json!({"owner": "rust-lang", "repo": "rust", "count": 1})),
        )
        .unwrap();
        assert!(transport
            .last_request()
            .unwrap()
            .url
            .ends_with("/repos/rust-lang/rust/commits?per_page=1"));
    }

    #[test]
    fn test_count_outside_page_bounds_is_rejected() {
        let (conn, transport) = connection(MockTransport::new(), json!({"default_owner": "octo"}));

        for action in ["get-repo-updates", "track-changes"] {
            for count in [0, -5, 250] {
                let err = conn
                    .perform(action, args(json!({"repo": "hello", "count": count})))
                    .unwrap_err();
                assert!(matches!(err, ConnectionError::InvalidParameters(_)));
            }
        }
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_missing_owner_is_configuration_error() {
        let (conn, transport) = connection(MockTransport::new(), json!({}));
        let err = conn
            .perform("track-changes", args(json!({"repo": "hello"})))
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Configuration(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_analyze_fork_compares_against_parent() {
        let repo = json!({
            "fork": true,
            "default_branch": "dev",
            "stargazers_count": 4,
            "forks_count": 0,
            "open_issues_count": 1,
            "parent": {"full_name": "upstream/hello", "default_branch": "main"}
        });
        let (conn, transport) = connection(
            MockTransport::new()
                .respond(Method::Get, "/repos/octo/hello", 200, &repo.to_string())
                .respond(
                    Method::Get,
                    "/repos/upstream/hello/compare/main...octo:dev",
                    200,
                    r#"{"status": "diverged", "ahead_by": 2, "behind_by": 5}"#,
                ),
            json!({"default_owner": "octo"}),
        );

        let out = conn
            .perform("analyze-fork", args(json!({"repo": "hello"})))
            .unwrap();
        assert_eq!(out["is_fork"], json!(true));
        assert_eq!(out["parent"], json!("upstream/hello"));
        assert_eq!(out["comparison"]["ahead_by"], json!(2));
        assert_eq!(out["comparison"]["behind_by"], json!(5));
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn test_analyze_non_fork_skips_comparison() {
        let (conn, transport) = connection(
            MockTransport::new().respond(
                Method::Get,
                "/repos/octo/hello",
                200,
                r#"{"fork": false, "default_branch": "main", "stargazers_count": 9}"#,
            ),
            json!({"default_owner": "octo"}),
        );

        let out = conn
            .perform("analyze-fork", args(json!({"repo": "hello"})))
            .unwrap();
        assert_eq!(out["is_fork"], json!(false));
        assert_eq!(out["stars"], json!(9));
        assert!(out.get("comparison").is_none());
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_track_changes_summarizes_events() {
        let (conn, _) = connection(
            MockTransport::new().respond(
                Method::Get,
                "/repos/octo/hello/events",
                200,
                r#"[{"type": "PushEvent", "actor": {"login": "ada"}, "created_at": "2024-01-02T00:00:00Z"}]"#,
            ),
            json!({"default_owner": "octo"}),
        );

        let out = conn
            .perform("track-changes", args(json!({"repo": "hello"})))
            .unwrap();
        assert_eq!(out["events"][0]["type"], json!("PushEvent"));
        assert_eq!(out["events"][0]["actor"], json!("ada"));
    }

    #[test]
    fn test_not_found_passes_through() {
        let (conn, _) = connection(MockTransport::new(), json!({"default_owner": "octo"}));
        let err = conn
            .perform("analyze-fork", args(json!({"repo": "missing"})))
            .unwrap_err();
        assert!(matches!(err, ConnectionError::PlatformApi { status: 404, .. }));
    }

    #[test]
    fn test_configure_and_is_configured() {
        let transport = Arc::new(
            MockTransport::new().respond(Method::Get, "/user", 200, r#"{"login": "octo"}"#),
        );
        let store = Arc::new(MemoryCredentialStore::new());
        let conn = GitHubConnection::new(
            ConfigMap::new(),
            ConnectionContext::new(store.clone(), transport.clone()),
        )
        .unwrap();

        assert!(!Connection::is_configured(&conn, true));
        let mut prompt = ScriptedPrompt::new(["ghp_new"]);
        assert!(Connection::configure(&conn, &mut prompt));
        assert_eq!(store.get(GITHUB_ACCESS_TOKEN).as_deref(), Some("ghp_new"));
        assert!(Connection::is_configured(&conn, false));
    }

    #[test]
    fn test_enterprise_base_url() {
        let (conn, transport) = connection(
            MockTransport::new().respond(Method::Get, "/api/v3/repos/octo/hello/events", 200, "[]"),
            json!({"default_owner": "octo"}),
        );
        let conn = conn.with_base_url("https://ghe.example.com/api/v3/");

        conn.perform("track-changes", args(json!({"repo": "hello", "count": 2})))
            .unwrap();
        assert_eq!(
            transport.last_request().unwrap().url,
            "https://ghe.example.com/api/v3/repos/octo/hello/events?per_page=2"
        );
    }

    #[test]
    fn test_validate_config() {
        assert!(GitHubConnection::validate_config(ConfigMap::new()).is_ok());
        assert!(GitHubConnection::validate_config(config(json!({"default_owner": ""}))).is_err());
        assert!(GitHubConnection::validate_config(config(json!({"commit_read_count": 0}))).is_err());
        assert!(!GitHubConnection::capabilities().is_llm_provider);
    }
}
