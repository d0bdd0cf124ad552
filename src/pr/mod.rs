pub mod query;
pub mod types;

pub use types::{PullRequest, Review, ReviewState};

use std::fmt;
use std::str::FromStr;

use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use crate::config::Settings;
use types::{GraphQlError, GraphQlRequest, GraphQlResponse, OrganizationData, SearchData};

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API returned status {0}")]
    Status(StatusCode),

    #[error("Failed to parse GitHub API response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid createdAt timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("Invalid organization login: {0:?}")]
    InvalidOrganization(String),
}

/// Which GraphQL query shape is used to list open pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum QueryStrategy {
    /// Organization-wide `search` for open pull requests (up to 100).
    #[default]
    Search,
    /// Enumerate up to 100 repositories with up to 20 open pull requests each.
    Repositories,
}

impl fmt::Display for QueryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStrategy::Search => write!(f, "search"),
            QueryStrategy::Repositories => write!(f, "repositories"),
        }
    }
}

impl FromStr for QueryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(QueryStrategy::Search),
            "repositories" => Ok(QueryStrategy::Repositories),
            other => Err(format!(
                "unknown query strategy {other:?}, expected \"search\" or \"repositories\""
            )),
        }
    }
}

/// Fetch open pull requests for the configured organization.
///
/// A non-200 status aborts with [`PrError::Status`]. A 200 response without
/// a `data` node means there is nothing to report and yields an empty list.
#[instrument(skip(client, settings, strategy), fields(org = %settings.github_organization, strategy = %strategy))]
pub async fn fetch_open_pull_requests(
    client: &reqwest::Client,
    settings: &Settings,
    strategy: QueryStrategy,
) -> Result<Vec<PullRequest>, PrError> {
    let query = query::build_query(strategy, &settings.github_organization)?;

    debug!(url = %settings.github_graphql_url, "sending GraphQL query");
    let response = client
        .post(&settings.github_graphql_url)
        .header(USER_AGENT, "pr-digest")
        .header(AUTHORIZATION, format!("token {}", settings.github_access_token))
        .json(&GraphQlRequest { query: &query })
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        error!(status = status.as_u16(), "GitHub's API returned a non-200 status");
        return Err(PrError::Status(status));
    }

    let body = response.text().await?;
    debug!(body_bytes = body.len(), "received GraphQL response");

    match parse_response(strategy, &body)? {
        Some(pull_requests) => {
            debug!(pull_requests = pull_requests.len(), "parsed open pull requests");
            Ok(pull_requests)
        }
        None => {
            warn!("GitHub's API returned no data node, nothing to report");
            Ok(Vec::new())
        }
    }
}

/// Parse a GraphQL response body into pull requests.
///
/// Returns `Ok(None)` when the payload has no `data` node (or, for the
/// repository listing, a null organization). Missing required fields
/// inside `data` are a [`PrError::Parse`].
pub fn parse_response(
    strategy: QueryStrategy,
    body: &str,
) -> Result<Option<Vec<PullRequest>>, PrError> {
    match strategy {
        QueryStrategy::Search => {
            let envelope: GraphQlResponse<SearchData> = serde_json::from_str(body)?;
            log_errors(&envelope.errors);
            envelope
                .data
                .map(|data| {
                    data.search
                        .edges
                        .into_iter()
                        .map(|edge| PullRequest::try_from(edge.node))
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()
        }
        QueryStrategy::Repositories => {
            let envelope: GraphQlResponse<OrganizationData> = serde_json::from_str(body)?;
            log_errors(&envelope.errors);
            envelope
                .data
                .and_then(|data| data.organization)
                .map(|organization| {
                    organization
                        .repositories
                        .edges
                        .into_iter()
                        .flat_map(|repo| repo.node.pull_requests.edges)
                        .map(|edge| PullRequest::try_from(edge.node))
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()
        }
    }
}

fn log_errors(errors: &[GraphQlError]) {
    for err in errors {
        warn!(message = %err.message, "GitHub's API reported a GraphQL error");
    }
}
