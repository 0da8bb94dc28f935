use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::pr::github::DEFAULT_API_URL;
use crate::pr::{parse_repository, RepoRef};

pub const DEFAULT_CONFIG_PATH: &str = ".release-pr.toml";
pub const DEFAULT_BASE_BRANCH: &str = "release";
pub const DEFAULT_HEAD_BRANCH: &str = "master";
pub const DEFAULT_NEW_PR_TITLE: &str = "[リリース]";
pub const DEFAULT_BODY_TEMPLATE: &str = "## Changes\n\n{summary}";
pub const DEFAULT_COMMENT_TEMPLATE: &str = "PR body is updated!
<details><summary>diff</summary>
<p>

```diff
{diff}
```

</p>
</details>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid repository: {0}")]
    InvalidRepository(String),

    #[error("Invalid release PR number: {0}")]
    InvalidNumber(String),
}

/// Settings as written in the optional TOML file, or supplied on the
/// command line / environment. Every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub token: Option<String>,
    pub repository: Option<String>,
    pub api_url: Option<String>,
    pub base_branch: Option<String>,
    pub head_branch: Option<String>,
    /// Kept as text so an empty CI input reads as unset.
    pub release_pr_number: Option<String>,
    pub body_template: Option<String>,
    pub comment_template: Option<String>,
    pub label: Option<String>,
    pub new_pr_title: Option<String>,
    pub check_marker: Option<String>,
}

impl Settings {
    /// Load from a specific TOML file.
    pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let settings = toml::from_str(&contents)?;
        Ok(settings)
    }

    /// Layer `self` over `lower`: values set here win.
    pub fn overlay(self, lower: Settings) -> Settings {
        Settings {
            token: present(self.token).or(lower.token),
            repository: present(self.repository).or(lower.repository),
            api_url: present(self.api_url).or(lower.api_url),
            base_branch: present(self.base_branch).or(lower.base_branch),
            head_branch: present(self.head_branch).or(lower.head_branch),
            release_pr_number: present(self.release_pr_number).or(lower.release_pr_number),
            body_template: present(self.body_template).or(lower.body_template),
            comment_template: present(self.comment_template).or(lower.comment_template),
            label: present(self.label).or(lower.label),
            new_pr_title: present(self.new_pr_title).or(lower.new_pr_title),
            check_marker: present(self.check_marker).or(lower.check_marker),
        }
    }
}

/// Treat empty and whitespace-only values as unset.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub API token
    pub token: String,
    pub repository: RepoRef,
    /// REST API base URL (GitHub Enterprise uses a different one)
    pub api_url: String,
    /// Branch the release PR merges into
    pub base_branch: String,
    /// Branch the release PR merges from
    pub head_branch: String,
    /// Operate on this PR instead of searching for one
    pub release_pr_number: Option<u64>,
    /// Markdown with a `{summary}` slot
    pub body_template: String,
    /// Markdown with a `{diff}` slot and an optional `{new_line}` slot
    pub comment_template: String,
    pub label: Option<String>,
    /// Title for a release PR created by this tool
    pub new_pr_title: String,
    /// Substring identifying checklist lines kept across regenerations
    pub check_marker: Option<String>,
}

impl Config {
    /// Resolve configuration from command-line/env settings and the config file.
    ///
    /// A missing file at the default location is fine; a missing file that
    /// was named explicitly is an error.
    pub fn load(overrides: Settings, path: Option<&Path>) -> Result<Config, ConfigError> {
        Self::load_with_default(overrides, path, Path::new(DEFAULT_CONFIG_PATH))
    }

    fn load_with_default(
        overrides: Settings,
        path: Option<&Path>,
        default_path: &Path,
    ) -> Result<Config, ConfigError> {
        let file = match path {
            Some(path) => Settings::load_from(path)?,
            None => {
                if default_path.exists() {
                    Settings::load_from(default_path)?
                } else {
                    Settings::default()
                }
            }
        };
        Self::resolve(overrides.overlay(file))
    }

    /// Validate merged settings, applying defaults for optional values.
    pub fn resolve(settings: Settings) -> Result<Config, ConfigError> {
        let settings = settings.overlay(Settings::default());

        let token = settings.token.ok_or(ConfigError::Missing("token"))?;
        let repository = settings
            .repository
            .ok_or(ConfigError::Missing("repository"))?;
        let repository = parse_repository(&repository)
            .map_err(|_| ConfigError::InvalidRepository(repository.clone()))?;

        let release_pr_number = settings
            .release_pr_number
            .map(|raw| parse_number(&raw))
            .transpose()?;

        let body_template = settings
            .body_template
            .unwrap_or_else(|| DEFAULT_BODY_TEMPLATE.to_string());
        if !body_template.contains("{summary}") {
            warn!("body template has no {{summary}} slot; generated list will be dropped");
        }
        let comment_template = settings
            .comment_template
            .unwrap_or_else(|| DEFAULT_COMMENT_TEMPLATE.to_string());
        if !comment_template.contains("{diff}") {
            warn!("comment template has no {{diff}} slot");
        }

        Ok(Config {
            token: token.trim().to_string(),
            repository,
            api_url: settings
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            base_branch: settings
                .base_branch
                .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string()),
            head_branch: settings
                .head_branch
                .unwrap_or_else(|| DEFAULT_HEAD_BRANCH.to_string()),
            release_pr_number,
            body_template,
            comment_template,
            label: settings.label,
            new_pr_title: settings
                .new_pr_title
                .unwrap_or_else(|| DEFAULT_NEW_PR_TITLE.to_string()),
            check_marker: settings.check_marker,
        })
    }
}

fn parse_number(raw: &str) -> Result<u64, ConfigError> {
    let trimmed = raw.trim().trim_start_matches('#');
    match trimmed.parse::<u64>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(ConfigError::InvalidNumber(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> Settings {
        Settings {
            token: Some("ghp_token".to_string()),
            repository: Some("org/repo".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::resolve(required()).unwrap();
        assert_eq!(config.token, "ghp_token");
        assert_eq!(config.repository.owner, "org");
        assert_eq!(config.repository.name, "repo");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.base_branch, "release");
        assert_eq!(config.head_branch, "master");
        assert_eq!(config.new_pr_title, DEFAULT_NEW_PR_TITLE);
        assert_eq!(config.body_template, DEFAULT_BODY_TEMPLATE);
        assert!(config.comment_template.contains("{diff}"));
        assert!(config.release_pr_number.is_none());
        assert!(config.label.is_none());
        assert!(config.check_marker.is_none());
    }

    #[test]
    fn test_missing_token() {
        let settings = Settings {
            token: None,
            ..required()
        };
        let err = Config::resolve(settings).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("token")));
    }

    #[test]
    fn test_blank_repository_is_missing() {
        let settings = Settings {
            repository: Some("   ".to_string()),
            ..required()
        };
        let err = Config::resolve(settings).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("repository")));
    }

    #[test]
    fn test_invalid_repository() {
        let settings = Settings {
            repository: Some("not a repo".to_string()),
            ..required()
        };
        let err = Config::resolve(settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepository(_)));
    }

    #[test]
    fn test_release_pr_number() {
        let settings = Settings {
            release_pr_number: Some("#123".to_string()),
            ..required()
        };
        assert_eq!(Config::resolve(settings).unwrap().release_pr_number, Some(123));

        let settings = Settings {
            release_pr_number: Some("".to_string()),
            ..required()
        };
        assert_eq!(Config::resolve(settings).unwrap().release_pr_number, None);

        for bad in ["abc", "0", "-4"] {
            let settings = Settings {
                release_pr_number: Some(bad.to_string()),
                ..required()
            };
            assert!(matches!(
                Config::resolve(settings),
                Err(ConfigError::InvalidNumber(_))
            ));
        }
    }

    #[test]
    fn test_overlay_prefers_upper_non_empty_values() {
        let file = Settings {
            base_branch: Some("main-release".to_string()),
            head_branch: Some("develop".to_string()),
            label: Some("release".to_string()),
            ..required()
        };
        let cli = Settings {
            head_branch: Some("main".to_string()),
            label: Some("".to_string()),
            ..Settings::default()
        };
        let config = Config::resolve(cli.overlay(file)).unwrap();
        assert_eq!(config.base_branch, "main-release");
        assert_eq!(config.head_branch, "main");
        assert_eq!(config.label.as_deref(), Some("release"));
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
repository = "org/repo"
base_branch = "production"
label = "release"
check_marker = "QA done"
body_template = """
## Release

{summary}
"""
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.base_branch.as_deref(), Some("production"));
        assert_eq!(settings.check_marker.as_deref(), Some("QA done"));
        assert_eq!(
            settings.body_template.as_deref(),
            Some("## Release\n\n{summary}\n")
        );
    }

    #[test]
    fn test_unknown_toml_key_is_rejected() {
        let result: Result<Settings, _> = toml::from_str("colour = \"blue\"");
        assert!(result.is_err());
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("release-pr-updater-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_load_from_explicit_file() {
        let path = temp_path("config.toml");
        std::fs::write(&path, "token = \"from-file\"\nrepository = \"org/repo\"\n").unwrap();

        let cli = Settings {
            token: Some("from-cli".to_string()),
            ..Settings::default()
        };
        let config = Config::load(cli, Some(&path)).unwrap();
        assert_eq!(config.token, "from-cli");
        assert_eq!(config.repository.to_string(), "org/repo");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_from_missing_explicit_file() {
        let path = temp_path("no-such-file.toml");
        let err = Config::load(required(), Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_)));
    }

    #[test]
    fn test_missing_default_file_is_not_an_error() {
        let default_path = temp_path("absent-default.toml");
        assert!(!default_path.exists());

        let config = Config::load_with_default(required(), None, &default_path).unwrap();
        assert_eq!(config.repository.to_string(), "org/repo");
        assert_eq!(config.base_branch, DEFAULT_BASE_BRANCH);
    }

    #[test]
    fn test_default_file_is_read_when_present() {
        let default_path = temp_path("present-default.toml");
        std::fs::write(&default_path, "base_branch = \"production\"\n").unwrap();

        let config = Config::load_with_default(required(), None, &default_path).unwrap();
        assert_eq!(config.base_branch, "production");

        std::fs::remove_file(&default_path).ok();
    }

    #[test]
    fn test_templates_without_slots_are_accepted() {
        let settings = Settings {
            body_template: Some("## Changes".to_string()),
            comment_template: Some("PR body is updated!".to_string()),
            ..required()
        };
        let config = Config::resolve(settings).unwrap();
        assert_eq!(config.body_template, "## Changes");
        assert_eq!(config.comment_template, "PR body is updated!");
    }
}
