//! Configuration management for Demogen
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (DEMOGEN_*)
//! 3. Config file (~/.config/demogen/config.toml, or --config)
//! 4. Default values

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Demo project names handed out in order, first unused wins
pub const DEFAULT_PROJECT_NAMES: &[&str] = &[
    "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet", "kilo",
    "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango", "uniform",
    "victor", "whiskey", "xray", "yankee", "zulu",
];

fn default_base_branch() -> String {
    "main".to_string()
}

/// One repository the driver creates demo branches in
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Short name, used as the branch prefix and in commit messages
    pub name: String,

    /// Remote URL to clone from and push to
    pub url: String,

    /// Branch the demo branch forks from
    #[serde(default = "default_base_branch")]
    pub base_branch: String,

    /// Glob, relative to the working copy, whose matches count as used names.
    /// Without one the script gets an empty name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_pattern: Option<String>,

    /// Generator script, relative to the working copy
    pub script: PathBuf,

    /// Program used to run the script (e.g. "bash"); the script is executed directly if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    /// Working copy directory relative to the workspace (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Kill the generator script after this long
    #[serde(
        default,
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub script_timeout: Option<Duration>,
}

impl RepositoryConfig {
    /// Create a repository entry with defaults for the optional fields
    pub fn new(name: impl Into<String>, url: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            base_branch: default_base_branch(),
            search_pattern: None,
            script: script.into(),
            interpreter: None,
            path: None,
            script_timeout: None,
        }
    }

    /// Directory name of the working copy inside the workspace
    pub fn relative_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.name))
    }
}

/// Identity used for generated commits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Author and committer name for generated commits
    pub author_name: String,

    /// Author and committer email for generated commits
    pub author_email: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            author_name: "demogen".to_string(),
            author_email: "demogen@localhost".to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// File holding the `YYYYMMDD <count>` branch counter
    pub counter_file: PathBuf,

    /// Directory working copies are cloned into
    pub workspace: PathBuf,

    /// Candidate demo project names, in allocation order
    pub project_names: Vec<String>,

    /// Git settings
    pub git: GitConfig,

    /// Repositories to process, in order
    pub repositories: Vec<RepositoryConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            counter_file: PathBuf::from("branch_counter.txt"),
            workspace: PathBuf::from("."),
            project_names: DEFAULT_PROJECT_NAMES.iter().map(|s| s.to_string()).collect(),
            git: GitConfig::default(),
            repositories: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/demogen/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("demogen").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - DEMOGEN_COUNTER_FILE: Path to the branch counter file
    /// - DEMOGEN_WORKSPACE: Directory working copies are cloned into
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(counter_file) = std::env::var("DEMOGEN_COUNTER_FILE") {
            self.counter_file = PathBuf::from(counter_file);
        }

        if let Ok(workspace) = std::env::var("DEMOGEN_WORKSPACE") {
            self.workspace = PathBuf::from(workspace);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, counter_file: Option<PathBuf>) -> Self {
        if let Some(path) = counter_file {
            self.counter_file = path;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        config_path: Option<&Path>,
        counter_file: Option<PathBuf>,
    ) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        let config = base
            .with_env_overrides()
            .with_cli_overrides(counter_file);
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the driver cannot run
    pub fn validate(&self) -> Result<()> {
        if self.project_names.is_empty() {
            return Err(Error::Config("project_names must not be empty".to_string()));
        }

        if self.project_names.iter().any(|n| n.trim().is_empty()) {
            return Err(Error::Config(
                "project_names must not contain empty names".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for repo in &self.repositories {
            if repo.name.trim().is_empty() {
                return Err(Error::Config("Repository name must not be empty".to_string()));
            }

            if repo.url.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Repository '{}' has an empty url",
                    repo.name
                )));
            }

            check_relative("name", &repo.name, Path::new(&repo.name))?;
            if let Some(path) = &repo.path {
                let label = format!("path of '{}'", repo.name);
                check_relative(&label, &path.to_string_lossy(), path)?;
            }

            if !seen.insert(repo.name.as_str()) {
                return Err(Error::Config(format!(
                    "Repository '{}' is configured more than once",
                    repo.name
                )));
            }
        }

        Ok(())
    }

    /// Where the working copy for a repository lives
    pub fn working_copy_path(&self, repo: &RepositoryConfig) -> PathBuf {
        self.workspace.join(repo.relative_path())
    }

    /// Find a repository by name
    pub fn repository(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|r| r.name == name)
    }
}

/// Working copies are removed recursively, so their location must stay
/// strictly below the workspace
fn check_relative(label: &str, raw: &str, path: &Path) -> Result<()> {
    let unsafe_segment = raw
        .split(['/', '\\'])
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    let plain = path
        .components()
        .all(|c| matches!(c, Component::Normal(_)));

    if path.is_absolute() || unsafe_segment || !plain {
        return Err(Error::Config(format!(
            "Repository {} '{}' must be a relative path without '.', '..' or empty segments",
            label, raw
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.counter_file, PathBuf::from("branch_counter.txt"));
        assert_eq!(config.project_names.len(), 25);
        assert_eq!(config.project_names[0], "bravo");
        assert_eq!(config.project_names[24], "zulu");
        assert_eq!(config.git.author_name, "demogen");
        assert!(config.repositories.is_empty());
    }

    #[test]
    fn test_cli_overrides() {
        let config =
            Config::default().with_cli_overrides(Some(PathBuf::from("/var/lib/demogen/counter")));

        assert_eq!(config.counter_file, PathBuf::from("/var/lib/demogen/counter"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
counter_file = "/tmp/counter.txt"
workspace = "/tmp/work"

[git]
author_name = "Demo Bot"
author_email = "bot@example.com"

[[repositories]]
name = "boilerplate-helm-charts"
url = "git@github.com:example/boilerplate-helm-charts.git"
search_pattern = "archiver/values/demo/*"
script = "buildDemoProject.sh"
interpreter = "bash"
script_timeout = "10m"

[[repositories]]
name = "db-config"
url = "https://github.com/example/db-config.git"
base_branch = "develop"
script = "update.sh"
path = "db"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.counter_file, PathBuf::from("/tmp/counter.txt"));
        assert_eq!(config.git.author_name, "Demo Bot");
        assert_eq!(config.git.author_email, "bot@example.com");
        assert_eq!(config.repositories.len(), 2);

        let charts = &config.repositories[0];
        assert_eq!(charts.base_branch, "main");
        assert_eq!(charts.search_pattern.as_deref(), Some("archiver/values/demo/*"));
        assert_eq!(charts.interpreter.as_deref(), Some("bash"));
        assert_eq!(charts.script_timeout, Some(Duration::from_secs(600)));
        assert_eq!(
            config.working_copy_path(charts),
            PathBuf::from("/tmp/work/boilerplate-helm-charts")
        );

        let db = config.repository("db-config").unwrap();
        assert_eq!(db.base_branch, "develop");
        assert!(db.search_pattern.is_none());
        assert!(db.script_timeout.is_none());
        assert_eq!(config.working_copy_path(db), PathBuf::from("/tmp/work/db"));
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
project_names = ["alpha", "omega"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        // everything else should use defaults
        assert_eq!(config.project_names, vec!["alpha", "omega"]);
        assert_eq!(config.workspace, PathBuf::from("."));
        assert_eq!(config.git, GitConfig::default());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = Config::default();
        config.repositories = vec![
            RepositoryConfig::new("charts", "/srv/charts.git", "build.sh"),
            RepositoryConfig::new("charts", "/srv/other.git", "build.sh"),
        ];

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_rejects_paths_outside_workspace() {
        for path in ["/", "/srv/charts", "..", ".", "../charts", "a/../../b", "a//b", "a/./b", "a/"] {
            let mut repo = RepositoryConfig::new("charts", "/srv/charts.git", "build.sh");
            repo.path = Some(PathBuf::from(path));
            let config = Config {
                repositories: vec![repo],
                ..Config::default()
            };
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "accepted path {:?}",
                path
            );
        }

        for name in ["..", ".", "../charts", "/charts", "a//b"] {
            let config = Config {
                repositories: vec![RepositoryConfig::new(name, "/srv/charts.git", "build.sh")],
                ..Config::default()
            };
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "accepted name {:?}",
                name
            );
        }

        let mut repo = RepositoryConfig::new("charts", "/srv/charts.git", "build.sh");
        repo.path = Some(PathBuf::from("teams/charts"));
        let config = Config {
            repositories: vec![repo],
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_pool() {
        let config = Config {
            project_names: Vec::new(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Config {
            project_names: vec!["bravo".to_string(), " ".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let mut config = Config::default();
        config.repositories = vec![RepositoryConfig::new("charts", "", "build.sh")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[[repositories]]\nname = \"charts\"\nurl = \"/srv/charts.git\"\nscript = \"build.sh\"\n",
        )
        .unwrap();

        let config = Config::load_with_overrides(Some(&path), Some(dir.path().join("counter")))
            .unwrap();
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.counter_file, dir.path().join("counter"));
    }

    #[test]
    fn test_load_from_file_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "repositories = 3").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: Config = toml::from_str(include_str!("../../demogen.example.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(
            config.repositories[1].script_timeout,
            Some(Duration::from_secs(15 * 60))
        );
    }
}
