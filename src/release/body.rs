use regex::Regex;
use tracing::{debug, info, instrument};

use super::{fill_slot, ReleaseError};
use crate::pr::{Commit, PullRequest, PullRequestService};

/// Subject prefix of the merge commits GitHub creates for merged pull requests.
pub const MERGE_MARKER: &str = "Merge pull request";

const REFERENCE_PATTERN: &str = r"#(\d+)";

/// A pull request merged into the head branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPullRequest {
    pub number: u64,
    pub title: String,
}

/// A regenerated release body and the pull requests listed in it.
#[derive(Debug, Clone)]
pub struct ReleaseBody {
    pub text: String,
    pub merged: Vec<MergedPullRequest>,
}

/// Build the new release body from the merge commits on `pr`.
///
/// Each merge commit yields `- #<number>: <title>`, in commit order, with the
/// title looked up from the referenced pull request. With a `check_marker`,
/// every entry is followed by a checklist line: the n-th line of the current
/// body containing the marker, or an unchecked box when there is none.
///
/// Returns `None` when there is nothing to list. A merge commit whose subject
/// carries no `#<number>` reference aborts the build.
#[instrument(skip(service, pr, template), fields(pr = pr.number))]
pub async fn build_body(
    service: &dyn PullRequestService,
    pr: &PullRequest,
    template: &str,
    check_marker: Option<&str>,
) -> Result<Option<ReleaseBody>, ReleaseError> {
    let commits = service.list_commits(pr.number).await?;
    let merges: Vec<&Commit> = commits
        .iter()
        .filter(|commit| commit.subject().starts_with(MERGE_MARKER))
        .collect();
    info!(commits = commits.len(), merge_commits = merges.len(), "scanned commits");

    let check_marker = check_marker.filter(|marker| !marker.is_empty());
    let prior_checks = check_marker
        .map(|marker| checklist_lines(pr.body_text(), marker))
        .unwrap_or_default();

    let pattern = Regex::new(REFERENCE_PATTERN)?;
    let mut merged = Vec::with_capacity(merges.len());
    let mut blocks = Vec::with_capacity(merges.len());
    for (index, commit) in merges.into_iter().enumerate() {
        let number = reference_number(&pattern, commit)?;
        let title = service.get_pull_request(number).await?.title;
        debug!(number, title = %title, "merged pull request");

        let mut block = format!("- #{}: {}", number, title);
        if let Some(marker) = check_marker {
            block.push('\n');
            match prior_checks.get(index) {
                Some(line) => block.push_str(line),
                None => block.push_str(&default_check_line(marker)),
            }
        }
        blocks.push(block);
        merged.push(MergedPullRequest { number, title });
    }

    let summary = blocks.join("\n");
    if summary.is_empty() {
        return Ok(None);
    }

    Ok(Some(ReleaseBody {
        text: fill_slot(template, "summary", &summary),
        merged,
    }))
}

/// Pull request number referenced by a merge commit's subject line.
fn reference_number(pattern: &Regex, commit: &Commit) -> Result<u64, ReleaseError> {
    let subject = commit.subject();
    let mismatch = || ReleaseError::PatternMismatch {
        sha: commit.sha.clone(),
        subject: subject.to_string(),
    };
    let captures = pattern.captures(subject).ok_or_else(mismatch)?;
    captures[1].parse::<u64>().map_err(|_| mismatch())
}

/// Lines of `body` containing `marker`, in order.
fn checklist_lines(body: &str, marker: &str) -> Vec<String> {
    body.lines()
        .filter(|line| line.contains(marker))
        .map(str::to_string)
        .collect()
}

fn default_check_line(marker: &str) -> String {
    format!("  - [ ] {}", marker)
}
