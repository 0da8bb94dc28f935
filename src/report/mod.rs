pub mod types;

pub use types::RunSummary;

use colored::Colorize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write summary file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Output the run summary to the terminal (default) or append it as
/// Markdown to a file such as `$GITHUB_STEP_SUMMARY`.
#[instrument(skip(summary), fields(pr = summary.pr_number, changed = summary.changed()))]
pub fn output(summary: &RunSummary, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing summary to terminal");
            print_terminal_summary(summary);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing summary to file");
            write_markdown_summary(summary, path)
        }
    }
}

fn print_terminal_summary(summary: &RunSummary) {
    print!("{}", render_terminal_summary(summary));
}

/// Release PR #7: "[release]" (created)
/// Label: release | Entries: 2 | +3 -1
///
/// ═══ Body ═══
/// ...
///
/// ═══ Diff ═══
/// ...
fn render_terminal_summary(summary: &RunSummary) -> String {
    let mut out = String::from("\n");
    let created = if summary.created {
        " (created)".yellow().to_string()
    } else {
        String::new()
    };
    out.push_str(&format!(
        "Release PR #{}: \"{}\"{}\n",
        summary.pr_number, summary.pr_title, created
    ));
    out.push_str(&format!(
        "Label: {} | Entries: {} | {} {}\n\n",
        summary.label.as_deref().unwrap_or("-"),
        summary.entries.len(),
        format!("+{}", summary.diff.additions).green(),
        format!("-{}", summary.diff.deletions).red()
    ));

    out.push_str("═══ Body ═══\n");
    out.push_str(&summary.body);
    out.push_str("\n\n");

    out.push_str("═══ Diff ═══\n");
    if !summary.changed() {
        out.push_str("  No changes.\n");
    } else {
        for line in summary.diff.render().lines() {
            out.push_str(&format!("{}\n", colorize_diff_line(line)));
        }
    }
    out.push('\n');
    out
}

/// Append the summary as Markdown to `path`.
fn write_markdown_summary(summary: &RunSummary, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!(
        "# Release PR #{}: \"{}\"\n\n",
        summary.pr_number, summary.pr_title
    ));
    if summary.created {
        md.push_str("Opened as a new draft pull request.\n\n");
    }
    md.push_str(&format!(
        "**Label:** {} | **Entries:** {} | **+{} -{}**\n\n",
        summary.label.as_deref().unwrap_or("none"),
        summary.entries.len(),
        summary.diff.additions,
        summary.diff.deletions
    ));

    md.push_str("## Merged pull requests\n\n");
    for entry in &summary.entries {
        md.push_str(&format!("- #{}: {}\n", entry.number, entry.title));
    }
    md.push('\n');

    md.push_str("## Diff\n\n");
    if summary.changed() {
        md.push_str(&format!("```diff\n{}\n```\n", summary.diff.render()));
    } else {
        md.push_str("No changes.\n");
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(md.as_bytes())?;
    Ok(())
}

fn colorize_diff_line(line: &str) -> colored::ColoredString {
    if line.starts_with("@@") {
        line.cyan()
    } else if line.starts_with('+') {
        line.green()
    } else if line.starts_with('-') {
        line.red()
    } else {
        line.normal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::diff::unified_diff;
    use crate::release::body::MergedPullRequest;

    fn sample_summary() -> RunSummary {
        let body = "## Changes\n\n- #42: Fix login bug\n- #57: Add retry logic";
        RunSummary {
            pr_number: 7,
            pr_title: "[release]".to_string(),
            created: true,
            label: Some("release".to_string()),
            entries: vec![
                MergedPullRequest { number: 42, title: "Fix login bug".to_string() },
                MergedPullRequest { number: 57, title: "Add retry logic".to_string() },
            ],
            body: body.to_string(),
            diff: unified_diff("", body, 3),
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("release-pr-updater-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_write_markdown_summary() {
        let path = temp_path("summary.md");
        std::fs::remove_file(&path).ok();
        write_markdown_summary(&sample_summary(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Release PR #7"));
        assert!(content.contains("Opened as a new draft pull request."));
        assert!(content.contains("**Label:** release"));
        assert!(content.contains("- #57: Add retry logic"));
        assert!(content.contains("```diff\n--- old\n+++ new"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_markdown_summary_appends() {
        let path = temp_path("append.md");
        std::fs::write(&path, "previous step\n").unwrap();
        output(&sample_summary(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("previous step\n# Release PR #7"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_terminal_summary_lists_body_and_diff() {
        let summary = sample_summary();
        let text = render_terminal_summary(&summary);
        assert!(text.contains("Release PR #7: \"[release]\""));
        assert!(text.contains("(created)"));
        assert!(text.contains("Label: release | Entries: 2 | "));
        assert!(text.contains("═══ Body ═══\n## Changes\n\n- #42: Fix login bug\n- #57: Add retry logic\n"));
        assert!(text.contains("--- old"));
        assert!(text.contains("+- #57: Add retry logic"));
        assert!(!text.contains("No changes."));

        output(&summary, None).unwrap();
    }

    #[test]
    fn test_terminal_summary_without_changes() {
        let mut summary = sample_summary();
        summary.created = false;
        summary.label = None;
        summary.diff = unified_diff(&summary.body, &summary.body, 3);

        let text = render_terminal_summary(&summary);
        assert!(!text.contains("(created)"));
        assert!(text.contains("Label: - | Entries: 2 | "));
        assert!(text.contains("═══ Diff ═══\n  No changes.\n"));
        assert!(!text.contains("--- old"));
    }

    #[test]
    fn test_colorize_diff_line_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(colorize_diff_line("+added").to_string(), "+added");
        assert_eq!(colorize_diff_line(" context").to_string(), " context");
    }
}
