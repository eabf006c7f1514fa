use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

// ── Raw log shapes ───────────────────────────────────────────────────
//
// Only the fields the replay needs are modeled; everything else in a
// Claude Code log record is ignored by serde.

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRecord {
    #[serde(rename = "type", default)]
    pub entry_type: String,

    #[serde(default)]
    pub cwd: Option<String>,

    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub message: Option<RawMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawMessage {
    #[serde(default)]
    pub content: Option<RawContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawContent {
    Text(String),
    Blocks(Vec<Value>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum RawBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WriteInput {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EditInput {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub old_string: String,
    #[serde(default)]
    pub new_string: String,
    #[serde(default)]
    pub replace_all: bool,
}

// ── Events ───────────────────────────────────────────────────────────

/// A decoded log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    UserPrompt {
        text: String,
        working_dir: String,
        timestamp: String,
    },
    /// Full overwrite of `path`.
    FileWrite { path: String, content: String },
    /// Substring patch of `path`.
    FileEdit {
        path: String,
        old: String,
        new: String,
        replace_all: bool,
    },
}

impl Event {
    /// The file a mutation targets; `None` for prompts.
    pub fn mutated_path(&self) -> Option<&str> {
        match self {
            Event::FileWrite { path, .. } | Event::FileEdit { path, .. } => Some(path),
            Event::UserPrompt { .. } => None,
        }
    }

    pub fn is_mutation(&self) -> bool {
        self.mutated_path().is_some()
    }
}

/// An event tagged with the log position of the record it came from.
///
/// Several events can share a position (one assistant record may carry
/// more than one tool call); their relative order is the block order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub position: usize,
    pub event: Event,
}

/// A parsed session log: the decoded events plus the number of records,
/// which bounds the last prompt window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionLog {
    pub session_id: String,
    pub record_count: usize,
    pub events: Vec<LogEvent>,
}

impl SessionLog {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    pub fn mutations(&self) -> impl Iterator<Item = &LogEvent> {
        self.events.iter().filter(|e| e.event.is_mutation())
    }
}

// ── Windows and results ──────────────────────────────────────────────

/// The span of log positions `[start_index, end_index)` owned by one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptWindow {
    pub start_index: usize,
    pub end_index: usize,
    pub prompt_text: String,
    pub working_dir: String,
    pub timestamp: String,
}

impl PromptWindow {
    pub fn contains(&self, position: usize) -> bool {
        (self.start_index..self.end_index).contains(&position)
    }
}

/// Before/after content for every file a window touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconstruction {
    pub before: BTreeMap<String, String>,
    pub after: BTreeMap<String, String>,
}

impl Reconstruction {
    /// True when there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Union of paths present in either map, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .before
            .keys()
            .chain(self.after.keys())
            .map(String::as_str)
            .collect();
        paths.sort_unstable();
        paths.dedup();
        paths
    }

    /// Paths whose content actually differs between before and after.
    pub fn changed_paths(&self) -> Vec<&str> {
        self.paths()
            .into_iter()
            .filter(|p| self.before.get(*p) != self.after.get(*p))
            .collect()
    }
}

/// One row of the prompt listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSummary {
    pub session_id: String,
    pub log_path: PathBuf,
    pub prompt_index: usize,
    pub timestamp: String,
    pub prompt_text: String,
    pub project_path: String,
    pub files_edited: Vec<String>,
}

impl PromptSummary {
    pub fn has_edits(&self) -> bool {
        !self.files_edited.is_empty()
    }

    /// Last component of the project path, for compact display.
    pub fn project_name(&self) -> &str {
        self.project_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}
