use anyhow::{Context, Result};
use clap::Args;
use promptdiff::checkpoint::{CLEANUP_INTERVAL, MAX_AGE};
use promptdiff::{CheckpointStore, PathResolver, PruneOutcome, PrunePolicy};
use std::time::Duration;

#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Remove sessions older than this many days
    #[arg(long, default_value_t = MAX_AGE.as_secs() / 86_400)]
    max_age_days: u64,

    /// Skip if the last prune ran less than this many minutes ago
    #[arg(long, default_value_t = CLEANUP_INTERVAL.as_secs() / 60)]
    interval_minutes: u64,

    /// Prune even if the last run was recent
    #[arg(long)]
    force: bool,
}

/// Oversized values saturate to a policy that never expires anything.
fn policy(args: &PruneArgs) -> PrunePolicy {
    PrunePolicy {
        interval: Duration::from_secs(args.interval_minutes.saturating_mul(60)),
        max_age: Duration::from_secs(args.max_age_days.saturating_mul(86_400)),
    }
}

pub fn run(resolver: &PathResolver, args: PruneArgs) -> Result<()> {
    let store = CheckpointStore::from_resolver(resolver)?;
    let policy = policy(&args);

    match store
        .prune(&policy, args.force)
        .with_context(|| format!("failed to prune {}", store.root().display()))?
    {
        PruneOutcome::Skipped => {
            println!(
                "Skipped: last prune ran less than {} minute(s) ago (use --force).",
                args.interval_minutes
            );
        }
        PruneOutcome::Pruned(removed) if removed.is_empty() => {
            println!("No sessions older than {} day(s).", args.max_age_days);
        }
        PruneOutcome::Pruned(removed) => {
            println!("Removed {} session(s):", removed.len());
            for id in &removed {
                println!("  {}", id);
            }
        }
    }
    Ok(())
}
