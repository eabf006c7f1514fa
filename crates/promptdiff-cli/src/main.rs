mod cmd_diff;
mod cmd_hook;
mod cmd_install;
mod cmd_list;
mod cmd_prune;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use promptdiff::PathResolver;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "promptdiff")]
#[command(about = "See what each Claude Code prompt did to your files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Claude Code data directory (defaults to ~/.claude)
    #[arg(long, global = true, value_name = "DIR")]
    claude_dir: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List prompts across all sessions, newest first
    List(cmd_list::ListArgs),
    /// Show the file changes made by one prompt
    Diff(cmd_diff::DiffArgs),
    /// PreToolUse hook entry point: snapshot a file before it is modified
    Hook,
    /// Register the hook in Claude Code's settings.json
    Install(cmd_install::InstallArgs),
    /// Delete old session snapshots
    Prune(cmd_prune::PruneArgs),
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("PROMPTDIFF_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut resolver = PathResolver::new();
    if let Some(dir) = cli.claude_dir {
        resolver = resolver.with_claude_dir(dir);
    }

    match cli.command {
        Commands::List(args) => cmd_list::run(&resolver, args),
        Commands::Diff(args) => cmd_diff::run(&resolver, args),
        Commands::Hook => {
            // Claude Code must never see the hook fail.
            if let Err(e) = cmd_hook::run(&resolver) {
                tracing::debug!(error = %format!("{e:#}"), "hook failed");
            }
            Ok(())
        }
        Commands::Install(args) => cmd_install::run(&resolver, args),
        Commands::Prune(args) => cmd_prune::run(&resolver, args),
    }
}
