use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PrError;

/// Exact timestamp layout GitHub uses for `createdAt`.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// An open pull request, flattened from either query shape.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// Repository name (without owner)
    pub repository: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Author login, `ghost` for deleted accounts
    pub author: String,
    /// Total assignees, which may exceed `assignees.len()`
    #[allow(dead_code)] // Fetched alongside the review data, not rendered in the digest
    pub assignee_count: u32,
    #[allow(dead_code)]
    pub assignees: Vec<String>,
    /// Total pending review requests, which may exceed `requested_reviewers.len()`
    pub review_request_count: u32,
    #[allow(dead_code)]
    pub requested_reviewers: Vec<RequestedReviewer>,
    /// Total submitted reviews, which may exceed `reviews.len()`
    #[allow(dead_code)]
    pub review_count: u32,
    /// Most recent reviews, capped at the query's page size
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    #[allow(dead_code)]
    pub author: Option<String>,
    pub state: ReviewState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Unknown,
}

/// Who a review was requested from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[allow(dead_code)] // Carried for callers that list reviewers; the digest only counts them
#[serde(tag = "__typename")]
pub enum RequestedReviewer {
    User { login: String },
    Team { name: String },
    #[serde(other)]
    Other,
}

/// Parse a `createdAt` value of the exact form `YYYY-MM-DDTHH:MM:SSZ`.
pub fn parse_created_at(value: &str) -> Result<DateTime<Utc>, PrError> {
    NaiveDateTime::parse_from_str(value, CREATED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| PrError::Timestamp {
            value: value.to_string(),
            source,
        })
}

// --- GraphQL wire types ---

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default)]
    pub total_count: u32,
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: Connection<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationData {
    /// Null when the login does not resolve to an organization
    pub organization: Option<OrganizationNode>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationNode {
    pub repositories: Connection<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name: String,
    pub pull_requests: Connection<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestNode {
    pub requested_reviewer: Option<RequestedReviewer>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewNode {
    pub author: Option<Actor>,
    pub state: ReviewState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub url: String,
    pub title: String,
    pub created_at: String,
    pub author: Option<Actor>,
    pub repository: RepositoryRef,
    pub assignees: Connection<Actor>,
    pub review_requests: Connection<ReviewRequestNode>,
    pub reviews: Connection<ReviewNode>,
}

impl TryFrom<PullRequestNode> for PullRequest {
    type Error = PrError;

    fn try_from(node: PullRequestNode) -> Result<Self, Self::Error> {
        Ok(PullRequest {
            repository: node.repository.name,
            title: node.title,
            url: node.url,
            created_at: parse_created_at(&node.created_at)?,
            author: node
                .author
                .map(|actor| actor.login)
                .unwrap_or_else(|| "ghost".to_string()),
            assignee_count: node.assignees.total_count,
            assignees: node
                .assignees
                .edges
                .into_iter()
                .map(|edge| edge.node.login)
                .collect(),
            review_request_count: node.review_requests.total_count,
            requested_reviewers: node
                .review_requests
                .edges
                .into_iter()
                .filter_map(|edge| edge.node.requested_reviewer)
                .collect(),
            review_count: node.reviews.total_count,
            reviews: node
                .reviews
                .edges
                .into_iter()
                .map(|edge| Review {
                    author: edge.node.author.map(|actor| actor.login),
                    state: edge.node.state,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_created_at() {
        let ts = parse_created_at("2024-03-05T14:07:09Z").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 7, 9));
    }

    #[test]
    fn test_parse_created_at_rejects_other_layouts() {
        assert!(parse_created_at("2024-03-05 14:07:09").is_err());
        assert!(parse_created_at("2024-03-05T14:07:09.123Z").is_err());
        assert!(parse_created_at("2024-03-05T14:07:09+00:00").is_err());
    }

    #[test]
    fn test_review_state_tolerates_unknown_values() {
        let states: Vec<ReviewState> =
            serde_json::from_str(r#"["APPROVED", "CHANGES_REQUESTED", "SOMETHING_NEW"]"#).unwrap();
        assert_eq!(
            states,
            vec![ReviewState::Approved, ReviewState::ChangesRequested, ReviewState::Unknown]
        );
    }

    #[test]
    fn test_requested_reviewer_variants() {
        let reviewers: Vec<RequestedReviewer> = serde_json::from_str(
            r#"[
                {"__typename": "User", "login": "alice"},
                {"__typename": "Team", "name": "platform"},
                {"__typename": "Mannequin"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            reviewers,
            vec![
                RequestedReviewer::User { login: "alice".to_string() },
                RequestedReviewer::Team { name: "platform".to_string() },
                RequestedReviewer::Other,
            ]
        );
    }

    #[test]
    fn test_node_with_deleted_author_becomes_ghost() {
        let node: PullRequestNode = serde_json::from_value(serde_json::json!({
            "url": "https://github.com/acme/api/pull/1",
            "title": "Fix",
            "createdAt": "2024-01-01T00:00:00Z",
            "author": null,
            "repository": {"name": "api"},
            "assignees": {"totalCount": 0, "edges": []},
            "reviewRequests": {"totalCount": 0, "edges": []},
            "reviews": {"totalCount": 0, "edges": []}
        }))
        .unwrap();

        let pr = PullRequest::try_from(node).unwrap();
        assert_eq!(pr.author, "ghost");
        assert_eq!(pr.repository, "api");
    }
}
