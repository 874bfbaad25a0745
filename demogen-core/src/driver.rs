//! Repository driver
//!
//! Processes each configured repository in order:
//!
//! 1. Acquire a working copy (clone, or reuse an existing one as-is)
//! 2. Check out the base branch
//! 3. Advance the daily counter and check out `{repo}-{date}-{counter}`
//! 4. Allocate an unused demo project name, if a search pattern is set
//! 5. Run the generator script with that name
//! 6. Stop if the script changed nothing
//! 7. Stage, commit and push the changes
//! 8. Remove the working copy
//!
//! The first error aborts the whole run. The working copy is removed on
//! every exit path unless the driver was told to keep working copies.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, RepositoryConfig};
use crate::counter::BranchCounter;
use crate::credentials::Credentials;
use crate::git::{branch_name, GitRepo};
use crate::names::find_unused_name;
use crate::script::ScriptRunner;
use crate::{Error, Result};

/// What happened to one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepositoryOutcome {
    /// Changes were committed and pushed
    Committed {
        /// Branch that was pushed
        branch: String,
        /// Demo project name passed to the script, if one was allocated
        name: Option<String>,
        /// SHA of the new commit
        commit: String,
    },
    /// The generator script left the working copy clean
    NoChanges {
        /// Branch that was checked out
        branch: String,
    },
    /// Generation was skipped
    Skipped {
        /// Branch that was checked out
        branch: String,
        /// Why generation was skipped
        reason: String,
    },
}

impl RepositoryOutcome {
    /// Branch the outcome refers to
    pub fn branch(&self) -> &str {
        match self {
            Self::Committed { branch, .. }
            | Self::NoChanges { branch }
            | Self::Skipped { branch, .. } => branch,
        }
    }
}

/// Outcome for a named repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReport {
    /// Repository name from the config
    pub repository: String,
    /// What happened
    #[serde(flatten)]
    pub outcome: RepositoryOutcome,
}

/// Summary of a full run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Day used for the counter and branch names
    pub date: NaiveDate,
    /// One entry per processed repository, in config order
    pub repositories: Vec<RepositoryReport>,
}

impl RunReport {
    /// Number of repositories that got a pushed commit
    pub fn committed(&self) -> usize {
        self.repositories
            .iter()
            .filter(|r| matches!(r.outcome, RepositoryOutcome::Committed { .. }))
            .count()
    }

    /// Number of repositories that were skipped
    pub fn skipped(&self) -> usize {
        self.repositories
            .iter()
            .filter(|r| matches!(r.outcome, RepositoryOutcome::Skipped { .. }))
            .count()
    }
}

/// Commit message for generated changes
pub fn commit_message(repo_name: &str, project_name: Option<&str>) -> String {
    match project_name {
        Some(name) => format!("Automated: {} -> project: {}", repo_name, name),
        None => format!("Automated: {}", repo_name),
    }
}

/// An acquired working copy, removed from disk when dropped
struct WorkingCopy {
    git: Option<GitRepo>,
    path: PathBuf,
    keep: bool,
}

impl WorkingCopy {
    fn new(git: GitRepo, path: PathBuf, keep: bool) -> Self {
        Self {
            git: Some(git),
            path,
            keep,
        }
    }

    fn repo(&self) -> Result<&GitRepo> {
        self.git
            .as_ref()
            .ok_or_else(|| Error::Other("working copy already released".to_string()))
    }
}

impl Drop for WorkingCopy {
    fn drop(&mut self) {
        // Close the repository before touching the directory
        drop(self.git.take());

        if self.keep {
            info!(path = %self.path.display(), "Keeping working copy");
            return;
        }

        if !self.path.exists() {
            return;
        }

        info!(path = %self.path.display(), "Cleaning up working copy");
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove working copy");
        }
    }
}

/// Drives demo branch creation across the configured repositories
#[derive(Debug)]
pub struct Driver {
    config: Config,
    credentials: Credentials,
    counter: BranchCounter,
    date: NaiveDate,
    keep_working_copies: bool,
}

impl Driver {
    /// Create a driver for today's date
    pub fn new(config: Config, credentials: Credentials) -> Self {
        let counter = BranchCounter::new(&config.counter_file);
        Self {
            config,
            credentials,
            counter,
            date: Local::now().date_naive(),
            keep_working_copies: false,
        }
    }

    /// Use a fixed date for the counter and branch names
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Leave working copies on disk after processing
    pub fn keep_working_copies(mut self, keep: bool) -> Self {
        self.keep_working_copies = keep;
        self
    }

    /// Process every configured repository
    pub async fn run_all(&self) -> Result<RunReport> {
        self.run(&[]).await
    }

    /// Process the named repositories, or all of them if `only` is empty
    pub async fn run(&self, only: &[String]) -> Result<RunReport> {
        let selected = self.select(only)?;

        if selected.is_empty() {
            warn!("No repositories configured");
        }

        let mut repositories = Vec::with_capacity(selected.len());
        for repo in selected {
            let outcome = self.process(repo).await?;
            repositories.push(RepositoryReport {
                repository: repo.name.clone(),
                outcome,
            });
        }

        info!(count = repositories.len(), "Processing completed for all repositories");

        Ok(RunReport {
            date: self.date,
            repositories,
        })
    }

    fn select(&self, only: &[String]) -> Result<Vec<&RepositoryConfig>> {
        if only.is_empty() {
            return Ok(self.config.repositories.iter().collect());
        }

        if let Some(unknown) = only.iter().find(|n| self.config.repository(n).is_none()) {
            return Err(Error::Config(format!(
                "Unknown repository '{}'",
                unknown
            )));
        }

        Ok(self
            .config
            .repositories
            .iter()
            .filter(|r| only.contains(&r.name))
            .collect())
    }

    /// Run all steps for a single repository
    pub async fn process(&self, repo: &RepositoryConfig) -> Result<RepositoryOutcome> {
        let path = self.config.working_copy_path(repo);

        // Only a successfully acquired copy is ours to remove
        let working_copy = WorkingCopy::new(
            self.acquire(repo, &path)?,
            path,
            self.keep_working_copies,
        );
        let git = working_copy.repo()?;

        info!(repo = %repo.name, branch = %repo.base_branch, "Checking out the base branch");
        git.checkout_branch(&repo.base_branch)?;

        let count = self.counter.advance(self.date)?;
        let branch = branch_name(&repo.name, self.date, count);
        if git.checkout_or_create_branch(&branch)? {
            info!(repo = %repo.name, branch = %branch, "Created and checked out new branch");
        } else {
            info!(repo = %repo.name, branch = %branch, "Branch already exists, checked out");
        }

        let root = git.root().canonicalize()?;

        let name = match &repo.search_pattern {
            Some(pattern) => {
                info!(repo = %repo.name, pattern = %pattern, "Checking for unused project names");
                match find_unused_name(&root, pattern, &self.config.project_names)? {
                    Some(name) => Some(name),
                    None => {
                        warn!(repo = %repo.name, "No unused project names found, skipping");
                        return Ok(RepositoryOutcome::Skipped {
                            branch,
                            reason: "no unused project names".to_string(),
                        });
                    }
                }
            }
            None => None,
        };

        self.generate(repo, &root, name.as_deref()).await?;

        info!(repo = %repo.name, "Checking for changes");
        if !git.is_dirty()? {
            info!(repo = %repo.name, "No changes to commit");
            return Ok(RepositoryOutcome::NoChanges { branch });
        }

        info!(repo = %repo.name, "Staging changes");
        git.stage_all()?;

        let message = commit_message(&repo.name, name.as_deref());
        info!(repo = %repo.name, message = %message, "Committing changes");
        let commit = git.commit(
            &message,
            &self.config.git.author_name,
            &self.config.git.author_email,
        )?;

        info!(repo = %repo.name, branch = %branch, "Pushing changes");
        git.push_branch(&branch, &self.credentials)?;

        Ok(RepositoryOutcome::Committed {
            branch,
            name,
            commit: commit.to_string(),
        })
    }

    fn acquire(&self, repo: &RepositoryConfig, path: &Path) -> Result<GitRepo> {
        if path.exists() {
            info!(repo = %repo.name, path = %path.display(), "Repository already cloned");
            GitRepo::open(path)
        } else {
            info!(repo = %repo.name, url = %repo.url, "Cloning repository");
            GitRepo::clone_remote(&repo.url, path, &self.credentials)
        }
    }

    async fn generate(&self, repo: &RepositoryConfig, root: &Path, name: Option<&str>) -> Result<()> {
        let script = root.join(&repo.script);
        let argument = name.unwrap_or("");

        info!(
            repo = %repo.name,
            script = %script.display(),
            argument = %argument,
            "Running generator script"
        );

        ScriptRunner::new()
            .with_timeout(repo.script_timeout)
            .run_script(repo.interpreter.as_deref(), &script, argument, root)
            .await?;

        Ok(())
    }
}
