use std::collections::HashSet;
use tracing::{debug, info, instrument};

use super::{fill_slots, ReleaseError};
use crate::pr::diff::{unified_diff, UnifiedDiff, DEFAULT_CONTEXT};
use crate::pr::{PullRequest, PullRequestService};

/// Replace the pull request body with `new_body` and comment with the diff.
///
/// The body is replaced first; if the comment then fails, the new body stays.
#[instrument(skip_all, fields(pr = pr.number))]
pub async fn publish(
    service: &dyn PullRequestService,
    pr: &PullRequest,
    new_body: &str,
    comment_template: &str,
) -> Result<UnifiedDiff, ReleaseError> {
    let old_body = pr.body_text();
    let diff = unified_diff(old_body, new_body, DEFAULT_CONTEXT);
    debug!(additions = diff.additions, deletions = diff.deletions, "computed body diff");

    service.edit_body(pr.number, new_body).await?;
    info!("pull request body updated");

    let new_line = first_new_line(old_body, new_body).unwrap_or_default();
    let comment = render_comment(comment_template, &diff.render(), new_line);
    service.create_comment(pr.number, &comment).await?;
    info!("posted diff comment");

    Ok(diff)
}

/// Fill the `{diff}` and `{new_line}` slots of a comment template.
pub fn render_comment(template: &str, diff: &str, new_line: &str) -> String {
    fill_slots(template, &[("diff", diff), ("new_line", new_line)])
}

/// First non-blank line of `new` that appears nowhere in `old`.
pub fn first_new_line<'a>(old: &str, new: &'a str) -> Option<&'a str> {
    let old_lines: HashSet<&str> = old.lines().collect();
    new.lines()
        .find(|line| !old_lines.contains(line) && !line.trim().is_empty())
}
