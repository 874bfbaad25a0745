//! Demogen CLI - Command line interface for Demogen
//!
//! Creates dated demo branches across a fixed set of repositories.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use demogen_core::{BranchCounter, Config};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::RunArgs;

/// Demogen: automated demo branch generation
#[derive(Parser, Debug)]
#[command(name = "demogen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ~/.config/demogen/config.toml)
    #[arg(short, long, global = true, env = "DEMOGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the branch counter file (overrides config and env)
    #[arg(long, global = true)]
    counter_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Create demo branches in the configured repositories
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Show current configuration
    Config,

    /// Show the stored branch counter without advancing it
    Counter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.config.as_deref(), cli.counter_file.clone())?;

    tracing::debug!(
        counter_file = %config.counter_file.display(),
        workspace = %config.workspace.display(),
        repositories = config.repositories.len(),
        "Configuration loaded"
    );

    match cli.command {
        Some(Commands::Version) => {
            println!("demogen {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Run(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Config) => {
            print_config(&config, cli.config.as_deref());
        }
        Some(Commands::Counter) => {
            let counter = BranchCounter::new(&config.counter_file);
            match counter.peek()? {
                Some(state) => println!(
                    "{}: {} (date {}, count {})",
                    counter.path().display(),
                    state.render(),
                    state.date,
                    state.count
                ),
                None => println!("{}: (not created yet)", counter.path().display()),
            }
        }
        None => {
            println!("Demogen - Automated demo branch generation");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config, explicit_path: Option<&std::path::Path>) {
    println!("Demogen Configuration");
    println!("=====================");
    println!();
    println!("  counter_file: {}", config.counter_file.display());
    println!("  workspace: {}", config.workspace.display());
    println!("  project_names: {}", config.project_names.join(", "));
    println!(
        "  git author: {} <{}>",
        config.git.author_name, config.git.author_email
    );
    println!();
    println!("Repositories:");
    if config.repositories.is_empty() {
        println!("  (none)");
    }
    for repo in &config.repositories {
        println!("  {}", repo.name);
        println!("    url: {}", repo.url);
        println!("    base_branch: {}", repo.base_branch);
        println!(
            "    search_pattern: {}",
            repo.search_pattern.as_deref().unwrap_or("(none)")
        );
        println!("    script: {}", repo.script.display());
        println!("    working copy: {}", config.working_copy_path(repo).display());
    }
    println!();

    let path = explicit_path
        .map(|p| p.to_path_buf())
        .or_else(Config::default_config_path);
    if let Some(path) = path {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
