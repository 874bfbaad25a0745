//! Clone and push against the remote, with credentials supplied by callback

use std::path::Path;

use git2::build::RepoBuilder;
use git2::{Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, PushOptions, RemoteCallbacks};
use tracing::debug;

use super::repo::GitRepo;
use crate::credentials::Credentials;
use crate::{Error, Result};

/// Name of the remote created by [`GitRepo::clone_remote`]
pub const ORIGIN: &str = "origin";

/// libgit2 keeps asking for credentials after a rejection; give up after this many
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

fn remote_callbacks(credentials: &Credentials) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;

    callbacks.credentials(move |url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str(&format!(
                "Authentication failed for {}",
                url
            )));
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }

        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Some(token) = credentials.token.as_deref() {
                let username = credentials
                    .username
                    .as_deref()
                    .or(username_from_url)
                    .unwrap_or("git");
                return Cred::userpass_plaintext(username, token);
            }
        }

        Cred::default()
    });

    // Silent progress
    callbacks.transfer_progress(|_| true);

    callbacks
}

fn classify_remote_error(action: &str, url: &str, e: git2::Error) -> Error {
    if e.code() == ErrorCode::Auth || e.message().contains("Authentication failed") {
        return Error::Config(format!(
            "Authentication failed for {}. Check your credentials or repository access.",
            url
        ));
    }

    if e.class() == ErrorClass::Net || e.class() == ErrorClass::Http {
        return Error::Config(format!(
            "Network error during {} of {}: {}",
            action,
            url,
            e.message()
        ));
    }

    Error::Git(e)
}

impl GitRepo {
    /// Clone `url` into `path`
    pub fn clone_remote(url: &str, path: &Path, credentials: &Credentials) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(credentials));

        let repo = RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(url, path)
            .map_err(|e| classify_remote_error("clone", url, e))?;

        debug!(url, path = %path.display(), "Cloned repository");

        Self::from_repository(repo)
    }

    /// Push a local branch to the same name on `origin`
    ///
    /// A ref update rejected by the remote is an error.
    pub fn push_branch(&self, branch: &str, credentials: &Credentials) -> Result<()> {
        let mut remote = self.inner().find_remote(ORIGIN).map_err(|e| {
            Error::Config(format!("Remote '{}' not found: {}", ORIGIN, e))
        })?;
        let url = remote.url().unwrap_or(ORIGIN).to_string();

        let mut callbacks = remote_callbacks(credentials);
        callbacks.push_update_reference(|refname, status| match status {
            Some(message) => Err(git2::Error::from_str(&format!(
                "Push of {} rejected: {}",
                refname, message
            ))),
            None => Ok(()),
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        remote
            .push(&[refspec.as_str()], Some(&mut push_options))
            .map_err(|e| classify_remote_error("push", &url, e))?;

        debug!(branch, url = %url, "Pushed branch");

        Ok(())
    }
}
