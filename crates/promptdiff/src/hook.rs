//! The `PreToolUse` hook that feeds the checkpoint store.
//!
//! Claude Code runs the hook before every `Write`/`Edit` tool call with a
//! JSON payload on stdin. The hook copies the target file into the store the
//! first time a session touches it, so replay later has a base to start from.

use crate::checkpoint::{CaptureOutcome, CheckpointStore, PrunePolicy};
use crate::error::Result;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Tools whose calls change file content.
pub const MUTATING_TOOLS: [&str; 2] = ["Write", "Edit"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: ToolInput,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub file_path: String,
}

impl HookInput {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Handles one hook invocation.
///
/// `fallback_cwd` is recorded as the project directory when the payload
/// carries no `cwd`. A successful capture is followed by a prune pass whose
/// failure is only logged.
pub fn run_hook(
    store: &CheckpointStore,
    input: &HookInput,
    fallback_cwd: &Path,
) -> Result<CaptureOutcome> {
    if !MUTATING_TOOLS.contains(&input.tool_name.as_str()) {
        return Ok(CaptureOutcome::NotAMutation);
    }
    let file_path = input.tool_input.file_path.as_str();
    if file_path.is_empty() {
        return Ok(CaptureOutcome::MissingPath);
    }

    let cwd = match &input.cwd {
        Some(cwd) if !cwd.is_empty() => cwd.clone(),
        _ => fallback_cwd.display().to_string(),
    };
    let outcome = store.capture(&input.session_id, Path::new(file_path), &cwd)?;

    if outcome.is_captured()
        && let Err(e) = store.prune(&PrunePolicy::default(), false)
    {
        debug!(error = %e, "opportunistic prune failed");
    }

    Ok(outcome)
}
