pub mod store;

pub use store::{FileParameterStore, ParameterStore};

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::pr::QueryStrategy;
use store::ParametersByPathRequest;

pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read parameter file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse parameter file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Parameter store request failed: {0}")]
    Store(String),

    #[error("Missing required configuration key: {0}")]
    MissingKey(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Flat key-value configuration, keyed by the parameter's leaf name.
pub type ConfigBundle = HashMap<String, String>;

/// Load every parameter stored under `/<namespace>/<env>/`, following
/// continuation tokens until the store stops returning one.
///
/// Keys are the fourth `/`-delimited segment of the parameter name, so
/// `/dev_tools/dev/github_access_token` becomes `github_access_token`.
/// Store failures propagate unchanged.
#[instrument(skip(store))]
pub async fn load_params(
    store: &dyn ParameterStore,
    namespace: &str,
    env: &str,
    region: &str,
) -> Result<ConfigBundle, ConfigError> {
    let mut config = ConfigBundle::new();
    let mut request = ParametersByPathRequest {
        path: format!("/{namespace}/{env}/"),
        region: region.to_string(),
        recursive: true,
        with_decryption: true,
        next_token: None,
    };
    let mut pages = 0usize;

    loop {
        let page = store.get_parameters_by_path(&request).await?;
        pages += 1;
        debug!(page = pages, parameters = page.parameters.len(), "received parameter page");

        for param in page.parameters {
            match param.name.split('/').nth(3) {
                Some(key) if !key.is_empty() => {
                    config.insert(key.to_string(), param.value);
                }
                _ => debug!(name = %param.name, "skipping parameter without a leaf name"),
            }
        }

        match page.next_token {
            Some(token) => request.next_token = Some(token),
            None => break,
        }
    }

    debug!(pages, keys = config.len(), "parameter store exhausted");
    Ok(config)
}

/// Typed view of the configuration bundle, passed explicitly to each stage.
#[derive(Clone)]
pub struct Settings {
    pub github_access_token: String,
    pub github_organization: String,
    pub github_graphql_url: String,
    pub slack_access_token: String,
    pub slack_webhook_url: String,
    /// Repositories whose pull requests never appear in the digest.
    pub skip_repositories: HashSet<String>,
    /// Stored query strategy; the command line may override it.
    pub query_strategy: Option<QueryStrategy>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("github_access_token", &"<redacted>")
            .field("github_organization", &self.github_organization)
            .field("github_graphql_url", &self.github_graphql_url)
            .field("slack_access_token", &"<redacted>")
            .field("slack_webhook_url", &self.slack_webhook_url)
            .field("skip_repositories", &self.skip_repositories)
            .field("query_strategy", &self.query_strategy)
            .finish()
    }
}

impl Settings {
    /// Build settings from a bundle, falling back to `GITHUB_TOKEN` and
    /// `SLACK_TOKEN` from the process environment for missing tokens.
    pub fn from_bundle(bundle: &ConfigBundle) -> Result<Settings, ConfigError> {
        Self::from_bundle_with_env(bundle, |name| std::env::var(name).ok())
    }

    /// Same as [`Settings::from_bundle`] with an injectable environment lookup.
    pub fn from_bundle_with_env<F>(bundle: &ConfigBundle, env: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let github_access_token = bundle
            .get("github_access_token")
            .cloned()
            .or_else(|| env("GITHUB_TOKEN"))
            .ok_or(ConfigError::MissingKey("github_access_token"))?;

        let slack_access_token = bundle
            .get("slack_access_token")
            .or_else(|| bundle.get("slack_token"))
            .cloned()
            .or_else(|| env("SLACK_TOKEN"))
            .ok_or(ConfigError::MissingKey("slack_access_token"))?;

        let github_organization = required(bundle, "github_organization")?;
        let slack_webhook_url = required(bundle, "slack_webhook_url")?;

        let github_graphql_url = bundle
            .get("github_graphql_url")
            .cloned()
            .unwrap_or_else(|| DEFAULT_GRAPHQL_URL.to_string());

        let skip_repositories = bundle
            .get("pr_skip_repositories")
            .map(|raw| parse_skip_list(raw.as_str()))
            .unwrap_or_default();

        let query_strategy = bundle
            .get("pr_query_strategy")
            .map(|raw| {
                raw.parse::<QueryStrategy>()
                    .map_err(|reason| ConfigError::InvalidValue {
                        key: "pr_query_strategy",
                        reason,
                    })
            })
            .transpose()?;

        Ok(Settings {
            github_access_token,
            github_organization,
            github_graphql_url,
            slack_access_token,
            slack_webhook_url,
            skip_repositories,
            query_strategy,
        })
    }
}

fn required(bundle: &ConfigBundle, key: &'static str) -> Result<String, ConfigError> {
    bundle
        .get(key)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or(ConfigError::MissingKey(key))
}

/// Skip-lists are stored as comma-separated string lists.
fn parse_skip_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
