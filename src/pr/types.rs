use serde::Serialize;

/// A pull request as seen by the release tooling.
/// Built from the GitHub REST response in github.rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number (e.g., 42)
    pub number: u64,
    /// PR title
    pub title: String,
    /// Markdown description. GitHub returns null for an empty body.
    pub body: Option<String>,
    /// Branch the PR merges into
    pub base: String,
    /// Branch the PR merges from
    pub head: String,
    pub state: PrState,
    pub draft: bool,
    /// Label names currently attached
    pub labels: Vec<String>,
}

impl PullRequest {
    /// The current body, with an unset body treated as empty text.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    Open,
    Closed,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
        }
    }
}

/// A commit on the release pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    /// Full message: subject line, blank line, body
    pub message: String,
}

impl Commit {
    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Payload for opening a new pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub base: String,
    pub head: String,
    pub draft: bool,
}

/// Owner and name of a GitHub repository.
/// Extracted by parse_repository() in pr/mod.rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
