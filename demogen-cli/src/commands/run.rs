//! Run command - Create demo branches in the configured repositories

use clap::Args;
use demogen_core::{Config, Credentials, Driver, RepositoryOutcome};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only process these repositories (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Leave working copies on disk instead of deleting them
    #[arg(long)]
    pub keep_working_copies: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let credentials = Credentials::load()?;

        tracing::info!(
            repositories = config.repositories.len(),
            only = ?self.only,
            "Starting demogen run"
        );

        let driver = Driver::new(config, credentials).keep_working_copies(self.keep_working_copies);
        let report = driver.run(&self.only).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("Demogen Run ({})", report.date);
        println!("================");
        println!();
        for entry in &report.repositories {
            match &entry.outcome {
                RepositoryOutcome::Committed {
                    branch,
                    name,
                    commit,
                } => {
                    let short = commit.get(..8).unwrap_or(commit);
                    match name {
                        Some(name) => println!(
                            "  {}: pushed {} ({}) with project {}",
                            entry.repository, branch, short, name
                        ),
                        None => println!("  {}: pushed {} ({})", entry.repository, branch, short),
                    }
                }
                RepositoryOutcome::NoChanges { branch } => {
                    println!("  {}: no changes on {}", entry.repository, branch);
                }
                RepositoryOutcome::Skipped { branch, reason } => {
                    println!("  {}: skipped on {} ({})", entry.repository, branch, reason);
                }
            }
        }
        println!();
        println!(
            "{} committed, {} skipped, {} total",
            report.committed(),
            report.skipped(),
            report.repositories.len()
        );

        Ok(())
    }
}
