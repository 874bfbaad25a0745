//! Git credentials for Demogen
//!
//! Credentials are kept out of repository URLs and out of the main config.
//! The secrets file is located at `~/.config/demogen/secrets.toml` and must
//! have restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (DEMOGEN_GIT_USERNAME, DEMOGEN_GIT_TOKEN)
//! 2. Secrets file (~/.config/demogen/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Secrets file structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct SecretsFile {
    git: GitSecrets,
}

/// Git-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct GitSecrets {
    username: Option<String>,
    token: Option<String>,
}

/// Credentials handed to git for clone and push
#[derive(Clone, Default)]
pub struct Credentials {
    /// Username for HTTPS remotes
    pub username: Option<String>,
    /// Token or password for HTTPS remotes
    pub token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Load credentials from the environment, falling back to the default secrets file
    pub fn load() -> Result<Self> {
        let from_file = match Self::default_secrets_path() {
            Some(path) if path.exists() => Self::load_from_file(&path)?,
            _ => Self::default(),
        };

        Ok(from_file.with_env_overrides())
    }

    /// Load credentials from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        // Check file permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let secrets: SecretsFile = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        Ok(Self {
            username: non_empty(secrets.git.username),
            token: non_empty(secrets.git.token),
        })
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/demogen/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("demogen").join("secrets.toml"))
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(username) = non_empty(std::env::var("DEMOGEN_GIT_USERNAME").ok()) {
            debug!("Using git username from DEMOGEN_GIT_USERNAME");
            self.username = Some(username);
        }

        if let Some(token) = non_empty(std::env::var("DEMOGEN_GIT_TOKEN").ok()) {
            debug!("Using git token from DEMOGEN_GIT_TOKEN");
            self.token = Some(token);
        }

        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
