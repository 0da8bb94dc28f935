use crate::pr::diff::UnifiedDiff;
use crate::release::body::MergedPullRequest;

/// Outcome of one successful release PR update.
#[derive(Debug)]
pub struct RunSummary {
    /// Release PR number
    pub pr_number: u64,
    /// Release PR title
    pub pr_title: String,
    /// Whether this run opened the release PR
    pub created: bool,
    /// Label applied, if one is configured
    pub label: Option<String>,
    /// Pull requests listed in the new body, in commit order
    pub entries: Vec<MergedPullRequest>,
    /// The body written to the release PR
    pub body: String,
    /// Changes from the previous body
    pub diff: UnifiedDiff,
}

impl RunSummary {
    pub fn changed(&self) -> bool {
        !self.diff.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::diff::unified_diff;

    #[test]
    fn test_changed_follows_diff() {
        let mut summary = RunSummary {
            pr_number: 7,
            pr_title: "[release]".to_string(),
            created: false,
            label: None,
            entries: vec![],
            body: "same".to_string(),
            diff: unified_diff("same", "same", 3),
        };
        assert!(!summary.changed());

        summary.diff = unified_diff("old", "same", 3);
        assert!(summary.changed());
    }
}
