//! GraphQL query text for both query shapes.
//!
//! Nested connections are fetched with a single fixed page and never
//! followed up: pull requests with more than 20 reviews or review requests
//! under-report, and the repository listing stops at 100 repositories with
//! 20 open pull requests each.

use super::{PrError, QueryStrategy};

pub const SEARCH_PAGE_SIZE: u32 = 100;
pub const REPOSITORY_PAGE_SIZE: u32 = 100;
pub const PULL_REQUESTS_PER_REPOSITORY: u32 = 20;
pub const REVIEW_PAGE_SIZE: u32 = 20;
pub const ASSIGNEE_PAGE_SIZE: u32 = 10;

fn pull_request_fields() -> String {
    format!(
        r#"url
title
createdAt
author {{
  login
}}
repository {{
  name
}}
assignees(first: {ASSIGNEE_PAGE_SIZE}) {{
  totalCount
  edges {{
    node {{
      login
    }}
  }}
}}
reviewRequests(first: {REVIEW_PAGE_SIZE}) {{
  totalCount
  edges {{
    node {{
      requestedReviewer {{
        __typename
        ... on User {{
          login
        }}
        ... on Team {{
          name
        }}
      }}
    }}
  }}
}}
reviews(first: {REVIEW_PAGE_SIZE}) {{
  totalCount
  edges {{
    node {{
      author {{
        login
      }}
      state
    }}
  }}
}}"#
    )
}

/// Organization logins are interpolated into the query text, so only
/// characters GitHub allows in a login are accepted.
fn validate_organization(organization: &str) -> Result<(), PrError> {
    let valid = !organization.is_empty()
        && organization
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PrError::InvalidOrganization(organization.to_string()))
    }
}

/// Build the query text for `strategy` against `organization`.
pub fn build_query(strategy: QueryStrategy, organization: &str) -> Result<String, PrError> {
    validate_organization(organization)?;
    let fields = pull_request_fields();

    let query = match strategy {
        QueryStrategy::Search => format!(
            r#"{{
  search(query: "org:{organization} is:pr state:open", type: ISSUE, first: {SEARCH_PAGE_SIZE}) {{
    edges {{
      node {{
        ... on PullRequest {{
{fields}
        }}
      }}
    }}
  }}
}}"#
        ),
        QueryStrategy::Repositories => format!(
            r#"{{
  organization(login: "{organization}") {{
    repositories(first: {REPOSITORY_PAGE_SIZE}) {{
      edges {{
        node {{
          name
          pullRequests(first: {PULL_REQUESTS_PER_REPOSITORY}, states: OPEN) {{
            edges {{
              node {{
{fields}
              }}
            }}
          }}
        }}
      }}
    }}
  }}
}}"#
        ),
    };

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_targets_organization() {
        let query = build_query(QueryStrategy::Search, "acme").unwrap();
        assert!(query.contains(r#"search(query: "org:acme is:pr state:open", type: ISSUE, first: 100)"#));
        assert!(query.contains("... on PullRequest"));
        assert!(query.contains("reviews(first: 20)"));
        assert!(query.contains("reviewRequests(first: 20)"));
        assert!(query.contains("assignees(first: 10)"));
        assert!(!query.contains("organization("));
    }

    #[test]
    fn test_repositories_query_nests_pull_requests() {
        let query = build_query(QueryStrategy::Repositories, "acme-corp").unwrap();
        assert!(query.contains(r#"organization(login: "acme-corp")"#));
        assert!(query.contains("repositories(first: 100)"));
        assert!(query.contains("pullRequests(first: 20, states: OPEN)"));
        assert!(!query.contains("search("));
    }

    #[test]
    fn test_braces_are_balanced() {
        for strategy in [QueryStrategy::Search, QueryStrategy::Repositories] {
            let query = build_query(strategy, "acme").unwrap();
            let open = query.matches('{').count();
            let close = query.matches('}').count();
            assert_eq!(open, close, "unbalanced braces for {strategy}");
        }
    }

    #[test]
    fn test_rejects_organization_that_could_escape_query() {
        assert!(matches!(
            build_query(QueryStrategy::Search, r#"acme" is:pr"#),
            Err(PrError::InvalidOrganization(_))
        ));
        assert!(build_query(QueryStrategy::Search, "").is_err());
    }
}
