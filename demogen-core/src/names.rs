//! Demo project name allocation
//!
//! A name is used when it appears as a substring of any path matched by the
//! repository's search pattern. Allocation returns the first candidate, in
//! pool order, that no matched path contains.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result};

/// Return the first candidate not contained in any of `paths`
pub fn first_unused<'a, S: AsRef<str>>(paths: &[String], candidates: &'a [S]) -> Option<&'a str> {
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|name| paths.iter().all(|path| !path.contains(name)))
}

/// Resolve `pattern` under `root` and return the paths it matches, relative to `root`
pub fn resolve_used_paths(root: &Path, pattern: &str) -> Result<Vec<String>> {
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let full_pattern = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);

    let entries = glob::glob(&full_pattern).map_err(|e| {
        Error::Config(format!("Invalid search pattern '{}': {}", pattern, e))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path: PathBuf = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable path");
                continue;
            }
        };
        let relative = path.strip_prefix(root).unwrap_or(&path);
        paths.push(relative.to_string_lossy().into_owned());
    }

    Ok(paths)
}

/// Find the first unused demo project name for a working copy
///
/// Returns `None` when every candidate is already taken.
pub fn find_unused_name<S: AsRef<str>>(
    root: &Path,
    pattern: &str,
    candidates: &[S],
) -> Result<Option<String>> {
    let used = resolve_used_paths(root, pattern)?;
    debug!(pattern, used = ?used, "Resolved used project paths");

    Ok(first_unused(&used, candidates).map(str::to_string))
}
