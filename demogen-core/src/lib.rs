//! Demogen Core - Core library for automated demo branch generation
//!
//! This crate clones a fixed set of repositories, cuts a dated feature
//! branch in each, runs a generator script with an unused demo project
//! name and pushes whatever the script produced.

pub mod config;
pub mod counter;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod git;
pub mod names;
pub mod script;

pub use config::{Config, GitConfig, RepositoryConfig, DEFAULT_PROJECT_NAMES};
pub use counter::{BranchCounter, CounterState};
pub use credentials::Credentials;
pub use driver::{Driver, RepositoryOutcome, RepositoryReport, RunReport};
pub use error::{Error, Result};
pub use git::{branch_name, GitRepo};
pub use names::{find_unused_name, first_unused};
pub use script::{ScriptOutput, ScriptRunner};
