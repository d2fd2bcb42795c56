//! gits CLI - bulk git operations across many repositories
//!
//! Projects are declared in `~/.config/gits/config.toml` as local directories,
//! hosted provider accounts or groups, or static repository lists.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gits_core::{Config, Operation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{BulkArgs, CheckoutArgs, Context, ListArgs, OrphanArgs, SyncArgs};

/// gits: a multi-repository git companion
#[derive(Parser, Debug)]
#[command(name = "gits")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/gits/config.toml)
    #[arg(short, long, global = true, env = "GITS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Ignore and do not write the provider cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Concurrent git operations per project level
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Show current configuration
    Config,

    /// List projects and the state of their repositories
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Clone repositories that are missing locally
    Clone(BulkArgs),

    /// Fetch all remotes
    Fetch(BulkArgs),

    /// Fast-forward pull
    Pull(BulkArgs),

    /// One-line status per repository
    #[command(visible_alias = "st")]
    Status(BulkArgs),

    /// Switch repositories to a branch
    #[command(visible_alias = "co")]
    Checkout(CheckoutArgs),

    /// Refresh cached provider results
    Sync(SyncArgs),

    /// Find untracked git repositories under a project directory
    Orphan(OrphanArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let command = match cli.command {
        Some(Commands::Version) => {
            println!("gits {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(command) => command,
        None => {
            println!("gits - bulk git operations across many repositories");
            println!();
            println!("Use --help for usage information");
            return Ok(());
        }
    };

    let config = Config::load_with_overrides(cli.config.as_deref(), cli.workers, cli.no_cache)?;
    tracing::debug!(
        projects = config.projects.len(),
        workers = config.settings.worker_count,
        cache = config.settings.cache,
        "Configuration loaded"
    );
    let ctx = Context::new(config);

    match command {
        Commands::Config => commands::show_config(&ctx),
        Commands::List(args) => args.execute(&ctx).await,
        Commands::Clone(args) => args.execute(&ctx, Operation::Clone).await,
        Commands::Fetch(args) => args.execute(&ctx, Operation::Fetch).await,
        Commands::Pull(args) => args.execute(&ctx, Operation::Pull).await,
        Commands::Status(args) => args.execute(&ctx, Operation::Status).await,
        Commands::Checkout(args) => args.execute(&ctx).await,
        Commands::Sync(args) => args.execute(&ctx).await,
        Commands::Orphan(args) => args.execute(&ctx).await,
        Commands::Version => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_checkout() {
        let cli = Cli::try_parse_from(["gits", "checkout", "work", "api", "--branch", "origin/main"])
            .unwrap();
        match cli.command {
            Some(Commands::Checkout(args)) => {
                assert_eq!(args.branch, "origin/main");
                assert_eq!(args.target.project, "work");
                assert_eq!(args.target.target.as_deref(), Some("api"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gits", "fetch", "work", "--no-cache", "-w", "4"]).unwrap();
        assert!(cli.no_cache);
        assert_eq!(cli.workers, Some(4));
    }
}
