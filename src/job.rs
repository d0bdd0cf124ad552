use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

use crate::config::{self, ConfigError, ParameterStore, Settings};
use crate::digest::{self, DigestStyle};
use crate::notify::{NotifyError, Notifier};
use crate::pr::{self, PrError, QueryStrategy};

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] PrError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Execution context handed to an invocation. Only used for log correlation.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: String,
    pub started_at: DateTime<Utc>,
}

impl InvocationContext {
    pub fn now() -> Self {
        let started_at = Utc::now();
        Self {
            request_id: format!("{}-{}", std::process::id(), started_at.timestamp_millis()),
            started_at,
        }
    }
}

/// Where configuration lives and how the run behaves.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub namespace: String,
    pub env: String,
    pub region: String,
    /// Overrides the stored `pr_query_strategy`
    pub strategy: Option<QueryStrategy>,
    /// Format the digest without posting it
    pub dry_run: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            namespace: "dev_tools".to_string(),
            env: "dev".to_string(),
            region: "us-east-1".to_string(),
            strategy: None,
            dry_run: false,
        }
    }
}

/// Run one invocation: load configuration, fetch open pull requests,
/// format the digest and post it. Returns the digest, empty when there
/// was nothing to report.
///
/// The trigger `event` is opaque and only logged.
pub async fn check_open_pull_requests(
    event: &serde_json::Value,
    context: &InvocationContext,
    store: &dyn ParameterStore,
    options: &JobOptions,
) -> Result<String, JobError> {
    let span = info_span!(
        "check_open_pull_requests",
        request_id = %context.request_id,
        started_at = %context.started_at
    );
    run(event, store, options).instrument(span).await
}

async fn run(
    event: &serde_json::Value,
    store: &dyn ParameterStore,
    options: &JobOptions,
) -> Result<String, JobError> {
    debug!(%event, "received trigger event");

    info!(namespace = %options.namespace, env = %options.env, "loading configuration");
    let bundle =
        config::load_params(store, &options.namespace, &options.env, &options.region).await?;
    let settings = Settings::from_bundle(&bundle)?;

    let strategy = options
        .strategy
        .or(settings.query_strategy)
        .unwrap_or_default();

    info!(%strategy, org = %settings.github_organization, "fetching open pull requests");
    let client = reqwest::Client::new();
    let pull_requests = pr::fetch_open_pull_requests(&client, &settings, strategy).await?;

    let digest = digest::format_digest(
        &pull_requests,
        &settings.skip_repositories,
        Utc::now(),
        &DigestStyle::for_strategy(strategy),
    );

    if options.dry_run {
        info!("dry run, not posting digest");
        return Ok(digest);
    }

    let delivery = Notifier::new(client, &settings).post_digest(&digest).await?;
    info!(?delivery, "invocation complete");

    Ok(digest)
}
