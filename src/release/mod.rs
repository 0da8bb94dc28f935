pub mod body;
pub mod locator;
pub mod publish;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::pr::{PrState, PullRequestService, ServiceError};
use crate::report::types::RunSummary;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Merge commit {sha} has no pull request reference: {subject:?}")]
    PatternMismatch { sha: String, subject: String },

    #[error("Failed to generate new PR body: no merged pull requests found in #{0}")]
    EmptyBody(u64),

    #[error("Invalid reference pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Replace every `{slot}` placeholder in `template` with `value`.
pub fn fill_slot(template: &str, slot: &str, value: &str) -> String {
    fill_slots(template, &[(slot, value)])
}

/// Replace several `{slot}` placeholders in one pass over `template`.
/// Substituted values are never scanned for placeholders.
pub fn fill_slots(template: &str, slots: &[(&str, &str)]) -> String {
    let placeholders: Vec<(String, &str)> = slots
        .iter()
        .map(|(slot, value)| (format!("{{{}}}", slot), *value))
        .collect();

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match placeholders
            .iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder.as_str()))
        {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Bring the release pull request up to date: locate or create it, label it,
/// regenerate its body from the merged pull requests and post the diff.
///
/// Fails before any write to the body when no merged pull requests are found.
/// Side effects already applied (a created PR, a label) are not undone.
#[instrument(skip_all, fields(repo = %config.repository, base = %config.base_branch, head = %config.head_branch))]
pub async fn run(
    service: &dyn PullRequestService,
    config: &Config,
) -> Result<RunSummary, ReleaseError> {
    info!("locating release pull request");
    let located = locator::locate_or_create(
        service,
        &config.base_branch,
        &config.head_branch,
        config.release_pr_number,
        &config.new_pr_title,
    )
    .await?;
    let pr = located.pull_request;
    info!(
        number = pr.number,
        title = %pr.title,
        created = located.created,
        draft = pr.draft,
        "release pull request"
    );
    debug!(base = %pr.base, head = %pr.head, labels = ?pr.labels, "release pull request branches");
    if pr.state != PrState::Open {
        warn!(number = pr.number, state = %pr.state, "release pull request is not open");
    }

    locator::apply_label(service, &pr, config.label.as_deref()).await?;

    info!("building release body");
    let generated = body::build_body(
        service,
        &pr,
        &config.body_template,
        config.check_marker.as_deref(),
    )
    .await?
    .ok_or(ReleaseError::EmptyBody(pr.number))?;

    info!(entries = generated.merged.len(), "publishing release body");
    let diff = publish::publish(service, &pr, &generated.text, &config.comment_template).await?;

    Ok(RunSummary {
        pr_number: pr.number,
        pr_title: pr.title,
        created: located.created,
        label: config.label.clone(),
        entries: generated.merged,
        body: generated.text,
        diff,
    })
}
