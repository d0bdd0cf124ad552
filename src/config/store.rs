use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::ConfigError;

/// One `GetParametersByPath`-style call against a hierarchical store.
#[derive(Debug, Clone)]
pub struct ParametersByPathRequest {
    /// Path prefix, always ending in `/` (e.g. `/dev_tools/dev/`)
    pub path: String,
    pub region: String,
    /// Include parameters nested below the immediate children of `path`
    pub recursive: bool,
    pub with_decryption: bool,
    /// Continuation token from the previous page, if any
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Full hierarchical name (e.g. `/dev_tools/dev/github_access_token`)
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParameterPage {
    pub parameters: Vec<Parameter>,
    /// Absent when the store has no further pages.
    pub next_token: Option<String>,
}

/// A hierarchical key-value parameter store that serves results in pages.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameters_by_path(
        &self,
        request: &ParametersByPathRequest,
    ) -> Result<ParameterPage, ConfigError>;
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
struct StoredParameter {
    name: String,
    value: String,
    /// Region the parameter lives in; unset means every region.
    #[serde(default)]
    region: Option<String>,
}

/// Parameter store backed by a local TOML file.
///
/// ```toml
/// page_size = 10
///
/// [[parameters]]
/// name = "/dev_tools/dev/github_organization"
/// value = "acme"
/// ```
///
/// Values are kept in plaintext, so `with_decryption` has nothing to do.
/// Pages are served in file order with numeric continuation tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct FileParameterStore {
    #[serde(default = "default_page_size")]
    page_size: usize,

    #[serde(default)]
    parameters: Vec<StoredParameter>,
}

impl FileParameterStore {
    pub fn load_from(path: &Path) -> Result<FileParameterStore, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<FileParameterStore, ConfigError> {
        let store: FileParameterStore = toml::from_str(contents)?;
        if store.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(store)
    }

    fn matches(&self, param: &StoredParameter, request: &ParametersByPathRequest) -> bool {
        let Some(rest) = param.name.strip_prefix(&request.path) else {
            return false;
        };
        if rest.is_empty() || (!request.recursive && rest.contains('/')) {
            return false;
        }
        param
            .region
            .as_deref()
            .map_or(true, |region| region == request.region)
    }
}

#[async_trait]
impl ParameterStore for FileParameterStore {
    async fn get_parameters_by_path(
        &self,
        request: &ParametersByPathRequest,
    ) -> Result<ParameterPage, ConfigError> {
        let matching: Vec<&StoredParameter> = self
            .parameters
            .iter()
            .filter(|param| self.matches(param, request))
            .collect();

        let start = match request.next_token.as_deref() {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .ok()
                .filter(|offset| *offset <= matching.len())
                .ok_or_else(|| ConfigError::Store(format!("invalid continuation token: {token}")))?,
        };
        let end = (start + self.page_size).min(matching.len());

        debug!(path = %request.path, start, end, total = matching.len(), "serving parameter page");

        Ok(ParameterPage {
            parameters: matching[start..end]
                .iter()
                .map(|param| Parameter {
                    name: param.name.clone(),
                    value: param.value.clone(),
                })
                .collect(),
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_params;

    const SAMPLE: &str = r#"
page_size = 2

[[parameters]]
name = "/dev_tools/dev/github_access_token"
value = "gh"

[[parameters]]
name = "/dev_tools/dev/github_organization"
value = "acme"

[[parameters]]
name = "/dev_tools/prod/github_organization"
value = "acme-prod"

[[parameters]]
name = "/dev_tools/dev/slack_access_token"
value = "sl"

[[parameters]]
name = "/dev_tools/dev/slack_webhook_url"
value = "https://hooks.example.com"
region = "eu-west-1"

[[parameters]]
name = "/dev_tools/dev/pr_skip_repositories"
value = "infra,docs"
"#;

    fn request(next_token: Option<&str>) -> ParametersByPathRequest {
        ParametersByPathRequest {
            path: "/dev_tools/dev/".to_string(),
            region: "us-east-1".to_string(),
            recursive: true,
            with_decryption: true,
            next_token: next_token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_first_page_has_continuation_token() {
        let store = FileParameterStore::from_toml_str(SAMPLE).unwrap();
        let page = store.get_parameters_by_path(&request(None)).await.unwrap();

        assert_eq!(page.parameters.len(), 2);
        assert_eq!(page.parameters[0].name, "/dev_tools/dev/github_access_token");
        assert_eq!(page.next_token.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_last_page_has_no_token() {
        let store = FileParameterStore::from_toml_str(SAMPLE).unwrap();
        let page = store.get_parameters_by_path(&request(Some("2"))).await.unwrap();

        // prod and eu-west-1 entries are filtered out, leaving four matches.
        assert_eq!(page.parameters.len(), 2);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_invalid_token_is_store_error() {
        let store = FileParameterStore::from_toml_str(SAMPLE).unwrap();
        let err = store
            .get_parameters_by_path(&request(Some("banana")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Store(_)));
    }

    #[tokio::test]
    async fn test_non_recursive_skips_nested_names() {
        let store = FileParameterStore::from_toml_str(
            r#"
[[parameters]]
name = "/ns/dev/top"
value = "1"

[[parameters]]
name = "/ns/dev/nested/leaf"
value = "2"
"#,
        )
        .unwrap();
        let mut req = request(None);
        req.path = "/ns/dev/".to_string();
        req.recursive = false;

        let page = store.get_parameters_by_path(&req).await.unwrap();
        assert_eq!(page.parameters.len(), 1);
        assert_eq!(page.parameters[0].value, "1");
    }

    #[tokio::test]
    async fn test_load_params_walks_file_pages() {
        let store = FileParameterStore::from_toml_str(SAMPLE).unwrap();
        let bundle = load_params(&store, "dev_tools", "dev", "us-east-1").await.unwrap();

        assert_eq!(bundle.len(), 4);
        assert_eq!(bundle["github_organization"], "acme");
        assert_eq!(bundle["pr_skip_repositories"], "infra,docs");
        assert!(!bundle.contains_key("slack_webhook_url"));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = FileParameterStore::from_toml_str("page_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "page_size", .. }));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = FileParameterStore::load_from(Path::new("/nonexistent/.pr-digest.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_)));
    }
}
