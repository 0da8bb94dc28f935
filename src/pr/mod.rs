pub mod diff;
pub mod github;
pub mod types;

pub use types::{Commit, NewPullRequest, PrState, PullRequest, RepoRef};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Pull request #{0} not found")]
    NotFound(u64),

    #[error("Invalid repository: {0}")]
    InvalidRepository(String),

    #[error("GitHub token is not a valid header value")]
    InvalidHeader,
}

/// The remote operations the release updater needs from the hosting service.
///
/// Every call is a single request/response; implementations must not retry.
#[async_trait]
pub trait PullRequestService: Send + Sync {
    /// Open pull requests from `head` into `base`, newest first.
    async fn list_open_pull_requests(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<PullRequest>, ServiceError>;

    /// Fetch one pull request. Fails with `ServiceError::NotFound` if it does not exist.
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, ServiceError>;

    async fn create_pull_request(
        &self,
        request: &NewPullRequest,
    ) -> Result<PullRequest, ServiceError>;

    async fn add_label(&self, number: u64, label: &str) -> Result<(), ServiceError>;

    /// Commits on the pull request, oldest first.
    async fn list_commits(&self, number: u64) -> Result<Vec<Commit>, ServiceError>;

    /// Replace the pull request description.
    async fn edit_body(&self, number: u64, body: &str) -> Result<(), ServiceError>;

    /// Post a comment on the pull request's conversation thread.
    async fn create_comment(&self, number: u64, body: &str) -> Result<(), ServiceError>;
}

/// Parse a repository identifier into owner and name.
///
/// Accepts `owner/name` (the form of `GITHUB_REPOSITORY`) or a
/// `https://github.com/owner/name` URL, with or without a `.git` suffix.
pub fn parse_repository(value: &str) -> Result<RepoRef, ServiceError> {
    let value = value.trim();
    let invalid = || ServiceError::InvalidRepository(value.to_string());

    let segments: Vec<String> = if value.contains("://") {
        let parsed = reqwest::Url::parse(value).map_err(|_| invalid())?;
        if parsed.host_str() != Some("github.com") {
            return Err(invalid());
        }
        parsed
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        value.split('/').map(str::to_string).collect()
    };

    if segments.len() != 2 || segments.iter().any(|s| s.is_empty()) {
        return Err(invalid());
    }

    let owner = segments[0].clone();
    let name = segments[1].trim_end_matches(".git").to_string();
    if name.is_empty() {
        return Err(invalid());
    }

    Ok(RepoRef { owner, name })
}
