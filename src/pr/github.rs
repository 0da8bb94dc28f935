use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::types::{Commit, NewPullRequest, PrState, PullRequest, RepoRef};
use super::{PullRequestService, ServiceError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const COMMITS_PER_PAGE: usize = 100;

#[derive(Deserialize)]
struct BranchResponse {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Deserialize)]
struct LabelResponse {
    name: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    #[serde(default)]
    draft: bool,
    base: BranchResponse,
    head: BranchResponse,
    #[serde(default)]
    labels: Vec<LabelResponse>,
}

impl From<PullResponse> for PullRequest {
    fn from(response: PullResponse) -> Self {
        PullRequest {
            number: response.number,
            title: response.title,
            body: response.body,
            base: response.base.name,
            head: response.head.name,
            state: if response.state == "open" {
                PrState::Open
            } else {
                PrState::Closed
            },
            draft: response.draft,
            labels: response.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

/// `PullRequestService` backed by the GitHub REST API.
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GitHubClient {
    pub fn new(api_base: &str, token: &str, repo: RepoRef) -> Result<Self, ServiceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("release-pr-updater"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| ServiceError::InvalidHeader)?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.repo.owner, self.repo.name, path
        )
    }

    /// GitHub's `head` filter wants `owner:branch`.
    fn qualified_head(&self, head: &str) -> String {
        if head.contains(':') {
            head.to_string()
        } else {
            format!("{}:{}", self.repo.owner, head)
        }
    }

    async fn send_json<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, ServiceError> {
        let value = request.send().await?.error_for_status()?.json::<T>().await?;
        Ok(value)
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<(), ServiceError> {
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl PullRequestService for GitHubClient {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn list_open_pull_requests(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<PullRequest>, ServiceError> {
        let head = self.qualified_head(head);
        let request = self.http.get(self.repo_url("pulls")).query(&[
            ("state", "open"),
            ("base", base),
            ("head", head.as_str()),
            ("sort", "created"),
            ("direction", "desc"),
        ]);
        let pulls: Vec<PullResponse> = Self::send_json(request).await?;
        debug!(count = pulls.len(), "listed open pull requests");
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, ServiceError> {
        let response = self
            .http
            .get(self.repo_url(&format!("pulls/{}", number)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(number));
        }
        let pull = response.error_for_status()?.json::<PullResponse>().await?;
        debug!(title = %pull.title, "fetched pull request");
        Ok(pull.into())
    }

    #[instrument(skip(self, request), fields(repo = %self.repo, base = %request.base, head = %request.head))]
    async fn create_pull_request(
        &self,
        request: &NewPullRequest,
    ) -> Result<PullRequest, ServiceError> {
        let payload = NewPullRequest {
            head: self.qualified_head(&request.head),
            ..request.clone()
        };
        let pull: PullResponse =
            Self::send_json(self.http.post(self.repo_url("pulls")).json(&payload)).await?;
        debug!(number = pull.number, "created pull request");
        Ok(pull.into())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn add_label(&self, number: u64, label: &str) -> Result<(), ServiceError> {
        let payload = json!({ "labels": [label] });
        Self::send(
            self.http
                .post(self.repo_url(&format!("issues/{}/labels", number)))
                .json(&payload),
        )
        .await
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn list_commits(&self, number: u64) -> Result<Vec<Commit>, ServiceError> {
        let url = self.repo_url(&format!("pulls/{}/commits", number));
        let per_page = COMMITS_PER_PAGE.to_string();
        let mut page = 1_u32;
        let mut commits = Vec::new();
        loop {
            let page_value = page.to_string();
            let request = self.http.get(&url).query(&[
                ("per_page", per_page.as_str()),
                ("page", page_value.as_str()),
            ]);
            let chunk: Vec<CommitResponse> = Self::send_json(request).await?;
            let chunk_len = chunk.len();
            commits.extend(chunk.into_iter().map(|c| Commit {
                sha: c.sha,
                message: c.commit.message,
            }));
            if chunk_len < COMMITS_PER_PAGE {
                break;
            }
            page = page.saturating_add(1);
        }
        debug!(count = commits.len(), "listed commits");
        Ok(commits)
    }

    #[instrument(skip(self, body), fields(repo = %self.repo, body_bytes = body.len()))]
    async fn edit_body(&self, number: u64, body: &str) -> Result<(), ServiceError> {
        let payload = json!({ "body": body });
        Self::send(
            self.http
                .patch(self.repo_url(&format!("pulls/{}", number)))
                .json(&payload),
        )
        .await
    }

    #[instrument(skip(self, body), fields(repo = %self.repo, body_bytes = body.len()))]
    async fn create_comment(&self, number: u64, body: &str) -> Result<(), ServiceError> {
        let payload = json!({ "body": body });
        Self::send(
            self.http
                .post(self.repo_url(&format!("issues/{}/comments", number)))
                .json(&payload),
        )
        .await
    }
}
