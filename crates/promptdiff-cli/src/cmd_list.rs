use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use promptdiff::{ListFilter, PathResolver, PromptSummary, SessionDiff};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only prompts issued in this project directory
    #[arg(short, long)]
    project: Option<String>,

    /// Only prompts whose text or project contains this (case-insensitive)
    #[arg(short, long)]
    grep: Option<String>,

    /// Include prompts that did not edit any file
    #[arg(long)]
    all: bool,

    /// Show at most this many prompts
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(resolver: &PathResolver, args: ListArgs) -> Result<()> {
    let manager = SessionDiff::with_resolver(resolver.clone());
    let filter = ListFilter {
        project: args.project,
        grep: args.grep,
        include_without_edits: args.all,
    };

    let mut summaries = manager
        .prompt_summaries(&filter)
        .context("failed to scan session logs")?;
    if let Some(limit) = args.limit {
        summaries.truncate(limit);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for s in &summaries {
        println!("{}", format_row(s));
    }
    Ok(())
}

fn format_row(s: &PromptSummary) -> String {
    let date = DateTime::parse_from_rfc3339(&s.timestamp)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let short_id: String = s.session_id.chars().take(8).collect();
    format!(
        "{}  {} #{:<3} {:<20} {:>3} files  {}",
        date,
        short_id,
        s.prompt_index,
        truncate(s.project_name(), 20),
        s.files_edited.len(),
        truncate(&single_line(&s.prompt_text), 60)
    )
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
