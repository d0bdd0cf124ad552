mod config;
mod digest;
mod job;
mod notify;
mod pr;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// PR Digest: posts a digest of an organization's open pull requests to a
/// chat webhook. Runs once and exits; schedule it externally.
#[derive(Parser, Debug)]
#[command(name = "pr-digest", version, about)]
struct Cli {
    /// Parameter store file holding credentials, organization and webhook URL
    #[arg(long, default_value = ".pr-digest.toml")]
    parameters: PathBuf,

    /// Parameter namespace (first path segment)
    #[arg(long, default_value = "dev_tools")]
    namespace: String,

    /// Parameter environment (second path segment)
    #[arg(long, default_value = "dev")]
    env: String,

    /// Parameter store region
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Query shape; overrides the stored `pr_query_strategy`
    #[arg(long, value_enum)]
    strategy: Option<pr::QueryStrategy>,

    /// Print the digest without posting it to the webhook
    #[arg(long)]
    dry_run: bool,

    /// Opaque trigger event as JSON
    #[arg(long, default_value = "{}")]
    event: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let event: serde_json::Value = serde_json::from_str(&cli.event)?;

    debug!(path = %cli.parameters.display(), "opening parameter store");
    let store = config::FileParameterStore::load_from(&cli.parameters)?;

    let options = job::JobOptions {
        namespace: cli.namespace,
        env: cli.env,
        region: cli.region,
        strategy: cli.strategy,
        dry_run: cli.dry_run,
    };
    let context = job::InvocationContext::now();

    let digest = job::check_open_pull_requests(&event, &context, &store, &options).await?;
    info!(digest_bytes = digest.len(), "done");

    print!("{digest}");
    Ok(())
}
