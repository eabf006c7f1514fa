#![doc = include_str!("../README.md")]

pub mod attribute;
pub mod checkpoint;
pub mod error;
pub mod hook;
pub mod install;
pub mod materialize;
pub mod paths;
pub mod reader;
pub mod replay;
pub mod segment;
pub mod types;

pub use attribute::{Attribution, attribute};
pub use checkpoint::{
    CaptureOutcome, CheckpointStore, Checkpoints, PruneOutcome, PrunePolicy, SessionMeta,
};
pub use error::{DiffError, Result};
pub use hook::{HookInput, run_hook};
pub use install::{InstallOutcome, hook_command, install_hook};
pub use materialize::{DiffOutcome, DiffTrees, DiffViewer, materialize, open_diff, render_unified};
pub use paths::PathResolver;
pub use reader::LogReader;
pub use replay::{Applied, FileState, reconstruct, reconstruct_prompt};
pub use segment::{is_noise, segment, window_at};
pub use types::{
    Event, LogEvent, PromptSummary, PromptWindow, Reconstruction, SessionLog,
};

use chrono::{DateTime, FixedOffset};
use std::path::Path;
use tracing::warn;

/// Which prompts [`SessionDiff::prompt_summaries`] returns.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only prompts issued in this project directory.
    pub project: Option<String>,
    /// Case-insensitive substring of the prompt text or project path.
    pub grep: Option<String>,
    /// Also list prompts that edited nothing.
    pub include_without_edits: bool,
}

impl ListFilter {
    pub fn matches(&self, summary: &PromptSummary) -> bool {
        if !self.include_without_edits && !summary.has_edits() {
            return false;
        }
        if let Some(project) = &self.project
            && !same_project(project, &summary.project_path)
        {
            return false;
        }
        if let Some(needle) = &self.grep {
            let needle = needle.to_lowercase();
            return summary.prompt_text.to_lowercase().contains(&needle)
                || summary.project_path.to_lowercase().contains(&needle);
        }
        true
    }
}

fn same_project(a: &str, b: &str) -> bool {
    let a = a.trim_end_matches(['/', '\\']);
    let b = b.trim_end_matches(['/', '\\']);
    a == b
}

/// Entry point tying the log reader, checkpoint store and replay together.
///
/// # Example
///
/// ```rust,no_run
/// use promptdiff::{ListFilter, SessionDiff};
///
/// let manager = SessionDiff::new();
/// let prompts = manager.prompt_summaries(&ListFilter::default())?;
/// if let Some(latest) = prompts.first() {
///     let result = manager.reconstruct(&latest.session_id, latest.prompt_index)?;
///     println!("{} file(s) changed", result.changed_paths().len());
/// }
/// # Ok::<(), promptdiff::DiffError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionDiff {
    resolver: PathResolver,
}

impl SessionDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn checkpoint_store(&self) -> Result<CheckpointStore> {
        CheckpointStore::from_resolver(&self.resolver)
    }

    /// One summary per genuine prompt across every session, newest first.
    pub fn prompt_summaries(&self, filter: &ListFilter) -> Result<Vec<PromptSummary>> {
        let mut summaries = Vec::new();
        for log_path in self.resolver.session_logs()? {
            match summarize_log(&log_path) {
                Ok(rows) => summaries.extend(rows.into_iter().filter(|s| filter.matches(s))),
                Err(e) => {
                    warn!(path = %log_path.display(), error = %e, "skipping unreadable session log");
                }
            }
        }
        sort_newest_first(&mut summaries);
        Ok(summaries)
    }

    /// The most recent prompt with edits in `project`.
    pub fn latest_for_project(&self, project: &str) -> Result<Option<PromptSummary>> {
        let filter = ListFilter {
            project: Some(project.to_string()),
            ..Default::default()
        };
        Ok(self.prompt_summaries(&filter)?.into_iter().next())
    }

    /// Before/after content for the `prompt_index`-th genuine prompt of a
    /// session.
    pub fn reconstruct(&self, session_id: &str, prompt_index: usize) -> Result<Reconstruction> {
        let log_path = self.resolver.find_session_log(session_id)?;
        self.reconstruct_log(&log_path, prompt_index)
    }

    pub fn reconstruct_summary(&self, summary: &PromptSummary) -> Result<Reconstruction> {
        self.reconstruct_log(&summary.log_path, summary.prompt_index)
    }

    fn reconstruct_log(&self, log_path: &Path, prompt_index: usize) -> Result<Reconstruction> {
        let log = LogReader::read_session(log_path);
        let window = window_at(&log, prompt_index).ok_or_else(|| DiffError::PromptNotFound {
            session_id: log.session_id.clone(),
            index: prompt_index,
        })?;
        let checkpoints = self.checkpoint_store()?.load(&log.session_id);
        Ok(replay::reconstruct(&log, &window, &checkpoints))
    }
}

/// Summaries for every genuine prompt of one log, in log order.
pub fn summarize_log(log_path: &Path) -> Result<Vec<PromptSummary>> {
    let log = LogReader::try_read_session(log_path)?;
    let summaries = segment(&log)
        .into_iter()
        .enumerate()
        .map(|(prompt_index, window)| {
            let files_edited = attribute(&log, &window)
                .touched_paths()
                .into_iter()
                .map(str::to_string)
                .collect();
            PromptSummary {
                session_id: log.session_id.clone(),
                log_path: log_path.to_path_buf(),
                prompt_index,
                timestamp: window.timestamp,
                prompt_text: window.prompt_text,
                project_path: window.working_dir,
                files_edited,
            }
        })
        .collect();
    Ok(summaries)
}

/// Parsed timestamps sort chronologically; unparseable ones sort last.
fn sort_newest_first(summaries: &mut [PromptSummary]) {
    summaries.sort_by_cached_key(|s| {
        std::cmp::Reverse((
            DateTime::<FixedOffset>::parse_from_rfc3339(&s.timestamp).ok(),
            s.timestamp.clone(),
        ))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const S1: &str = "aaaaaaaa-0000-4000-8000-000000000001";
    const S2: &str = "bbbbbbbb-0000-4000-8000-000000000002";

    fn user(text: &str, cwd: &str, ts: &str) -> String {
        serde_json::json!({
            "type": "user",
            "cwd": cwd,
            "timestamp": ts,
            "message": {"role": "user", "content": text},
        })
        .to_string()
    }

    fn tool(name: &str, input: serde_json::Value) -> String {
        serde_json::json!({
            "type": "assistant",
            "message": {"role": "assistant", "content": [
                {"type": "tool_use", "id": "t", "name": name, "input": input}
            ]},
        })
        .to_string()
    }

    fn setup() -> (TempDir, SessionDiff) {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("projects/-p");
        fs::create_dir_all(&project).unwrap();

        let s1 = [
            user("add function", "/p", "2024-01-01T10:00:00Z"),
            tool("Write", serde_json::json!({"file_path": "/p/a.py", "content": "v1"})),
            user("rename var", "/p", "2024-01-01T10:05:00Z"),
            tool(
                "Edit",
                serde_json::json!({"file_path": "/p/a.py", "old_string": "v1", "new_string": "v2"}),
            ),
            tool("Write", serde_json::json!({"file_path": "/p/b.py", "content": "new"})),
            user("just a question", "/p", "2024-01-01T10:10:00Z"),
        ];
        fs::write(project.join(format!("{S1}.jsonl")), s1.join("\n")).unwrap();

        let s2 = [
            user("other project", "/q/", "2024-01-02T09:00:00Z"),
            tool(
                "Edit",
                serde_json::json!({"file_path": "/q/c.py", "old_string": "old", "new_string": "new"}),
            ),
        ];
        fs::write(project.join(format!("{S2}.jsonl")), s2.join("\n")).unwrap();

        let snapshot = temp.path().join("session-snapshots").join(S2).join("files/q");
        fs::create_dir_all(&snapshot).unwrap();
        fs::write(snapshot.join("c.py"), "old code").unwrap();

        let manager = SessionDiff::with_resolver(PathResolver::new().with_claude_dir(temp.path()));
        (temp, manager)
    }

    #[test]
    fn test_prompt_summaries_default_filter() {
        let (_temp, manager) = setup();
        let summaries = manager.prompt_summaries(&ListFilter::default()).unwrap();

        let rows: Vec<(&str, usize)> = summaries
            .iter()
            .map(|s| (s.session_id.as_str(), s.prompt_index))
            .collect();
        assert_eq!(rows, vec![(S2, 0), (S1, 1), (S1, 0)]);
        assert_eq!(summaries[1].files_edited, vec!["/p/a.py", "/p/b.py"]);
        assert_eq!(summaries[1].prompt_text, "rename var");
    }

    #[test]
    fn test_prompt_summaries_filters() {
        let (_temp, manager) = setup();

        let all = ListFilter {
            include_without_edits: true,
            ..Default::default()
        };
        assert_eq!(manager.prompt_summaries(&all).unwrap().len(), 4);

        let project = ListFilter {
            project: Some("/q".to_string()),
            ..Default::default()
        };
        let rows = manager.prompt_summaries(&project).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].session_id, S2);

        let grep = ListFilter {
            grep: Some("RENAME".to_string()),
            ..Default::default()
        };
        let rows = manager.prompt_summaries(&grep).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prompt_index, 1);
    }

    #[test]
    fn test_latest_for_project() {
        let (_temp, manager) = setup();
        let latest = manager.latest_for_project("/p/").unwrap().unwrap();
        assert_eq!((latest.session_id.as_str(), latest.prompt_index), (S1, 1));
        assert!(manager.latest_for_project("/nowhere").unwrap().is_none());
    }

    #[test]
    fn test_reconstruct_end_to_end() {
        let (_temp, manager) = setup();
        let result = manager.reconstruct(S1, 1).unwrap();
        assert_eq!(result.before["/p/a.py"], "v1");
        assert_eq!(result.before["/p/b.py"], "");
        assert_eq!(result.after["/p/a.py"], "v2");
        assert_eq!(result.after["/p/b.py"], "new");
    }

    #[test]
    fn test_reconstruct_uses_checkpoints() {
        let (_temp, manager) = setup();
        let result = manager.reconstruct(S2, 0).unwrap();
        assert_eq!(result.before["/q/c.py"], "old code");
        assert_eq!(result.after["/q/c.py"], "new code");
    }

    #[test]
    fn test_reconstruct_errors() {
        let (_temp, manager) = setup();
        assert!(matches!(
            manager.reconstruct(S1, 7),
            Err(DiffError::PromptNotFound { index: 7, .. })
        ));
        assert!(matches!(
            manager.reconstruct("cccccccc-0000-4000-8000-000000000003", 0),
            Err(DiffError::SessionNotFound(_))
        ));
        assert!(manager.reconstruct(S1, 2).unwrap().is_empty());
    }

    #[test]
    fn test_summarize_log_reports_unopenable_log() {
        let temp = TempDir::new().unwrap();
        assert!(summarize_log(&temp.path().join(format!("{S1}.jsonl"))).is_err());
    }

    #[test]
    fn test_reconstruct_resolves_parent_components() {
        let (temp, manager) = setup();
        let source = temp.path().join("work/r.py");
        fs::create_dir_all(temp.path().join("work/sub")).unwrap();
        fs::write(&source, "orig").unwrap();
        let logged = format!("{}/work/sub/../r.py", temp.path().display());

        let store = manager.checkpoint_store().unwrap();
        let session = "dddddddd-0000-4000-8000-000000000004";
        assert!(store.capture(session, Path::new(&logged), "/w").unwrap().is_captured());

        let lines = [
            user("tweak", "/w", "2024-01-03T00:00:00Z"),
            tool(
                "Edit",
                serde_json::json!({"file_path": logged, "old_string": "orig", "new_string": "new"}),
            ),
        ];
        fs::write(
            temp.path().join(format!("projects/-p/{session}.jsonl")),
            lines.join("\n"),
        )
        .unwrap();

        let result = manager.reconstruct(session, 0).unwrap();
        let key = source.to_str().unwrap();
        assert_eq!(result.before[key], "orig");
        assert_eq!(result.after[key], "new");
    }

    #[test]
    fn test_sort_puts_unparseable_timestamps_last() {
        let mut rows: Vec<PromptSummary> = ["", "2024-01-01T00:00:00Z", "2024-06-01T00:00:00+02:00"]
            .iter()
            .map(|ts| PromptSummary {
                session_id: String::new(),
                log_path: Default::default(),
                prompt_index: 0,
                timestamp: ts.to_string(),
                prompt_text: String::new(),
                project_path: String::new(),
                files_edited: vec![],
            })
            .collect();
        sort_newest_first(&mut rows);
        let order: Vec<&str> = rows.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(order, vec!["2024-06-01T00:00:00+02:00", "2024-01-01T00:00:00Z", ""]);
    }
}
