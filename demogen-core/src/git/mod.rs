//! Git operations for Demogen
//!
//! This module wraps `git2` for the clone, branch, commit and push steps of
//! a demo run.

mod branch;
mod remote;
mod repo;

pub use branch::branch_name;
pub use remote::ORIGIN;
pub use repo::GitRepo;
