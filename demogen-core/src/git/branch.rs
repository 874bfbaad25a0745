//! Branch naming, checkout and creation

use chrono::NaiveDate;
use git2::{build::CheckoutBuilder, BranchType};

use super::remote::ORIGIN;
use super::repo::GitRepo;
use crate::counter::DATE_FORMAT;
use crate::{Error, Result};

/// Branch name for a demo run: `{repo}-{YYYYMMDD}-{counter}`
pub fn branch_name(repo_name: &str, date: NaiveDate, counter: u32) -> String {
    format!("{}-{}-{}", repo_name, date.format(DATE_FORMAT), counter)
}

impl GitRepo {
    /// Whether a local branch with this name exists
    pub fn branch_exists(&self, name: &str) -> bool {
        self.inner().find_branch(name, BranchType::Local).is_ok()
    }

    /// Switch to `name`, creating it from `origin/<name>` if only the remote branch exists
    pub fn checkout_branch(&self, name: &str) -> Result<()> {
        if !self.branch_exists(name) {
            let remote_ref = format!("{}/{}", ORIGIN, name);
            let remote_branch = self
                .inner()
                .find_branch(&remote_ref, BranchType::Remote)
                .map_err(|_| {
                    Error::Config(format!(
                        "Branch '{}' not found locally or on {}",
                        name, ORIGIN
                    ))
                })?;

            let commit = remote_branch.get().peel_to_commit()?;
            let mut local = self.inner().branch(name, &commit, false)?;
            local.set_upstream(Some(remote_ref.as_str()))?;
        }

        self.switch_to(&format!("refs/heads/{}", name))
    }

    /// Create `name` at HEAD and switch to it
    pub fn create_branch(&self, name: &str) -> Result<()> {
        let head = self.inner().head()?.peel_to_commit()?;
        self.inner().branch(name, &head, false).map_err(|e| {
            if e.code() == git2::ErrorCode::Exists {
                Error::Config(format!("Branch '{}' already exists", name))
            } else {
                Error::Git(e)
            }
        })?;

        self.switch_to(&format!("refs/heads/{}", name))
    }

    /// Check out `name` if it exists, otherwise create it at HEAD
    ///
    /// Returns `true` if the branch was created.
    pub fn checkout_or_create_branch(&self, name: &str) -> Result<bool> {
        if self.branch_exists(name) {
            self.checkout_branch(name)?;
            Ok(false)
        } else {
            self.create_branch(name)?;
            Ok(true)
        }
    }

    fn switch_to(&self, refname: &str) -> Result<()> {
        let target = self.inner().revparse_single(refname)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.inner().checkout_tree(&target, Some(&mut checkout))?;
        self.inner().set_head(refname)?;

        Ok(())
    }
}
