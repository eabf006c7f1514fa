use anyhow::{Context, Result};
use promptdiff::{CheckpointStore, HookInput, PathResolver, run_hook};

pub fn run(resolver: &PathResolver) -> Result<()> {
    let input =
        HookInput::from_reader(std::io::stdin().lock()).context("failed to parse hook payload")?;
    let store = CheckpointStore::from_resolver(resolver)?;
    let cwd = std::env::current_dir().unwrap_or_default();

    let outcome = run_hook(&store, &input, &cwd).context("failed to capture checkpoint")?;
    tracing::debug!(
        session_id = %input.session_id,
        path = %input.tool_input.file_path,
        ?outcome,
        "hook finished"
    );
    Ok(())
}
