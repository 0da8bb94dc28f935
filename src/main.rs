mod config;
mod pr;
mod release;
mod report;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Settings};
use crate::pr::github::GitHubClient;

/// Release PR Updater: keeps the release pull request's description in
/// sync with the pull requests merged into its head branch, and comments
/// with the diff of every change.
///
/// Every option can also be given through the environment variable shown.
#[derive(Parser, Debug)]
#[command(name = "release-pr-updater", version, about)]
struct Cli {
    /// TOML file with default settings [default: .release-pr.toml, if present]
    #[arg(long, env = "RELEASE_PR_CONFIG")]
    config: Option<PathBuf>,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Branch the release PR merges into [default: release]
    #[arg(long, env = "BASE_BRANCH")]
    base_branch: Option<String>,

    /// Branch the release PR merges from [default: master]
    #[arg(long, env = "HEAD_BRANCH")]
    head_branch: Option<String>,

    /// Update this PR instead of searching for one
    #[arg(long, env = "RELEASE_PR_NUMBER")]
    release_pr_number: Option<String>,

    /// Body template with a {summary} slot
    #[arg(long, env = "BODY_TEMPLATE")]
    body_template: Option<String>,

    /// Comment template with a {diff} slot and an optional {new_line} slot
    #[arg(long, env = "COMMENT_TEMPLATE")]
    comment_template: Option<String>,

    /// Label to attach to the release PR
    #[arg(long, env = "RELEASE_PR_LABEL")]
    label: Option<String>,

    /// Title of a newly created release PR
    #[arg(long, env = "NEW_RELEASE_PR_TITLE")]
    new_pr_title: Option<String>,

    /// Text identifying checklist lines to keep between updates
    #[arg(long, env = "CHECK_MARKER")]
    check_marker: Option<String>,

    /// Append a Markdown summary to this file (e.g. $GITHUB_STEP_SUMMARY)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            token: self.token.clone(),
            repository: self.repository.clone(),
            api_url: self.api_url.clone(),
            base_branch: self.base_branch.clone(),
            head_branch: self.head_branch.clone(),
            release_pr_number: self.release_pr_number.clone(),
            body_template: self.body_template.clone(),
            comment_template: self.comment_template.clone(),
            label: self.label.clone(),
            new_pr_title: self.new_pr_title.clone(),
            check_marker: self.check_marker.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "release PR update failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("loading configuration");
    let config = Config::load(cli.settings(), cli.config.as_deref())?;

    let _main_span = info_span!("release_pr", repo = %config.repository).entered();
    debug!(
        base = %config.base_branch,
        head = %config.head_branch,
        release_pr_number = ?config.release_pr_number,
        label = ?config.label,
        "resolved configuration"
    );

    let client = GitHubClient::new(&config.api_url, &config.token, config.repository.clone())?;
    let summary = release::run(&client, &config).await?;
    info!(pr = summary.pr_number, changed = summary.changed(), "release PR updated");

    report::output(&summary, cli.output.as_deref())?;
    Ok(())
}
