//! Reconstructing file contents by replaying logged mutations.
//!
//! Replay is a single forward pass over the mutations of a [`SessionLog`],
//! seeded with the session's [`Checkpoints`]. Nothing here touches the
//! filesystem, so the same log and checkpoints always give the same result.
//!
//! The log is an imperfect record of what happened on disk, so every
//! inconsistency resolves to a no-op instead of an error:
//!
//! - an `Edit` of a file whose content is unknown is dropped;
//! - an `Edit` whose `old` text is empty or absent changes nothing;
//! - a file with no checkpoint starts out as the empty string when a window
//!   needs its "before" content.

use crate::attribute::attribute;
use crate::checkpoint::Checkpoints;
use crate::segment::window_at;
use crate::types::{Event, PromptWindow, Reconstruction, SessionLog};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// What applying one mutation did to the file state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A `Write` replaced the content.
    Overwritten,
    /// An `Edit` replaced this many occurrences.
    Replaced(usize),
    /// `old` does not occur in the current content.
    NoMatch,
    /// `old` is empty.
    EmptyPattern,
    /// The file's content is unknown, so the edit cannot be applied.
    UnknownBase,
    /// The event is not a file mutation.
    Ignored,
}

/// Current content of every file seen so far in a replay.
#[derive(Debug, Clone, Default)]
pub struct FileState {
    contents: HashMap<String, String>,
}

impl FileState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_checkpoints(checkpoints: &Checkpoints) -> Self {
        Self {
            contents: checkpoints
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.contents.get(path).map(String::as_str)
    }

    /// Content of `path`, or the empty string when it was never established.
    pub fn current(&self, path: &str) -> String {
        self.get(path).unwrap_or_default().to_string()
    }

    pub fn apply(&mut self, event: &Event) -> Applied {
        match event {
            Event::FileWrite { path, content } => {
                self.contents.insert(path.clone(), content.clone());
                Applied::Overwritten
            }
            Event::FileEdit {
                path,
                old,
                new,
                replace_all,
            } => match self.contents.get_mut(path) {
                None => Applied::UnknownBase,
                Some(content) => apply_edit(content, old, new, *replace_all),
            },
            Event::UserPrompt { .. } => Applied::Ignored,
        }
    }
}

/// Replaces the leftmost occurrence of `old` (or every non-overlapping
/// occurrence, scanning left to right, when `replace_all` is set).
pub fn apply_edit(content: &mut String, old: &str, new: &str, replace_all: bool) -> Applied {
    if old.is_empty() {
        return Applied::EmptyPattern;
    }
    let count = if replace_all {
        content.matches(old).count()
    } else {
        usize::from(content.contains(old))
    };
    if count == 0 {
        return Applied::NoMatch;
    }
    *content = if replace_all {
        content.replace(old, new)
    } else {
        content.replacen(old, new, 1)
    };
    Applied::Replaced(count)
}

/// Before/after content of every file mutated inside `window`.
///
/// Mutations at or past `window.end_index` are never applied, so "after" is
/// the state as the window closes.
pub fn reconstruct(
    log: &SessionLog,
    window: &PromptWindow,
    checkpoints: &Checkpoints,
) -> Reconstruction {
    let attribution = attribute(log, window);
    if attribution.is_empty() {
        return Reconstruction::default();
    }

    let mut state = FileState::from_checkpoints(checkpoints);
    let mut before = BTreeMap::new();

    for entry in &attribution.replay_prefix {
        let Some(path) = entry.event.mutated_path() else {
            continue;
        };
        if attribution.first_touch.get(path) == Some(&entry.position)
            && !before.contains_key(path)
        {
            before.insert(path.to_string(), state.current(path));
        }
        let applied = state.apply(&entry.event);
        trace!(position = entry.position, path, ?applied, "replayed mutation");
    }

    let after = before
        .keys()
        .map(|path| (path.clone(), state.current(path)))
        .collect();

    Reconstruction { before, after }
}

/// [`reconstruct`] for the `prompt_index`-th genuine prompt; an index past
/// the last prompt yields an empty result.
pub fn reconstruct_prompt(
    log: &SessionLog,
    prompt_index: usize,
    checkpoints: &Checkpoints,
) -> Reconstruction {
    match window_at(log, prompt_index) {
        Some(window) => reconstruct(log, &window, checkpoints),
        None => Reconstruction::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogEvent;
    use proptest::prelude::*;

    fn at(position: usize, event: Event) -> LogEvent {
        LogEvent { position, event }
    }

    fn prompt(text: &str) -> Event {
        Event::UserPrompt {
            text: text.to_string(),
            working_dir: "/p".to_string(),
            timestamp: String::new(),
        }
    }

    fn write(path: &str, content: &str) -> Event {
        Event::FileWrite {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    fn edit(path: &str, old: &str, new: &str, replace_all: bool) -> Event {
        Event::FileEdit {
            path: path.to_string(),
            old: old.to_string(),
            new: new.to_string(),
            replace_all,
        }
    }

    /// Each event gets its own position.
    fn log_of(events: Vec<Event>) -> SessionLog {
        SessionLog {
            session_id: "s".to_string(),
            record_count: events.len(),
            events: events
                .into_iter()
                .enumerate()
                .map(|(i, e)| at(i, e))
                .collect(),
        }
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ── apply_edit ─────────────────────────────────────────────────────

    #[test]
    fn test_replace_once() {
        let mut s = "ababab".to_string();
        assert_eq!(apply_edit(&mut s, "ab", "X", false), Applied::Replaced(1));
        assert_eq!(s, "Xabab");
    }

    #[test]
    fn test_replace_all() {
        let mut s = "ababab".to_string();
        assert_eq!(apply_edit(&mut s, "ab", "X", true), Applied::Replaced(3));
        assert_eq!(s, "XXX");
    }

    #[test]
    fn test_replace_all_is_non_overlapping() {
        let mut s = "aaaa".to_string();
        assert_eq!(apply_edit(&mut s, "aa", "b", true), Applied::Replaced(2));
        assert_eq!(s, "bb");

        let mut s = "aaa".to_string();
        apply_edit(&mut s, "aa", "b", true);
        assert_eq!(s, "ba");
    }

    #[test]
    fn test_replacement_text_is_not_rescanned() {
        let mut s = "ab".to_string();
        apply_edit(&mut s, "ab", "abab", true);
        assert_eq!(s, "abab");
    }

    #[test]
    fn test_absent_substring_is_noop() {
        let mut s = "hello".to_string();
        assert_eq!(apply_edit(&mut s, "xyz", "abc", false), Applied::NoMatch);
        assert_eq!(s, "hello");
    }

    #[test]
    fn test_empty_pattern_is_noop() {
        let mut s = "hello".to_string();
        assert_eq!(apply_edit(&mut s, "", "abc", true), Applied::EmptyPattern);
        assert_eq!(s, "hello");
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let mut s = "a.b a+b".to_string();
        apply_edit(&mut s, ".", "!", true);
        assert_eq!(s, "a!b a+b");
    }

    // ── FileState ──────────────────────────────────────────────────────

    #[test]
    fn test_write_defines_unknown_state() {
        let mut state = FileState::new();
        assert_eq!(state.apply(&write("/a", "v1")), Applied::Overwritten);
        assert_eq!(state.get("/a"), Some("v1"));
        state.apply(&write("/a", "v2"));
        assert_eq!(state.get("/a"), Some("v2"));
    }

    #[test]
    fn test_edit_on_unknown_state_is_dropped() {
        let mut state = FileState::new();
        assert_eq!(state.apply(&edit("/a", "x", "y", false)), Applied::UnknownBase);
        assert_eq!(state.get("/a"), None);
        assert_eq!(state.current("/a"), "");
    }

    #[test]
    fn test_prompt_is_ignored() {
        let mut state = FileState::new();
        assert_eq!(state.apply(&prompt("hi")), Applied::Ignored);
    }

    // ── reconstruct ────────────────────────────────────────────────────

    #[test]
    fn test_end_to_end_two_prompts() {
        let log = log_of(vec![
            prompt("add function"),
            write("/a.py", "v1"),
            prompt("rename var"),
            edit("/a.py", "v1", "v2", false),
            write("/b.py", "new"),
        ]);
        let result = reconstruct_prompt(&log, 1, &Checkpoints::default());

        assert_eq!(result.before, map(&[("/a.py", "v1"), ("/b.py", "")]));
        assert_eq!(result.after, map(&[("/a.py", "v2"), ("/b.py", "new")]));

        let first = reconstruct_prompt(&log, 0, &Checkpoints::default());
        assert_eq!(first.before, map(&[("/a.py", "")]));
        assert_eq!(first.after, map(&[("/a.py", "v1")]));
    }

    #[test]
    fn test_checkpoint_is_base_for_first_edit() {
        let log = log_of(vec![
            prompt("tweak"),
            edit("/a.py", "old", "new", false),
        ]);
        let checkpoints: Checkpoints = [("/a.py", "old code")].into_iter().collect();
        let result = reconstruct_prompt(&log, 0, &checkpoints);

        assert_eq!(result.before, map(&[("/a.py", "old code")]));
        assert_eq!(result.after, map(&[("/a.py", "new code")]));
    }

    #[test]
    fn test_missing_checkpoint_falls_back_to_empty() {
        let log = log_of(vec![prompt("tweak"), edit("/a.py", "x", "y", false)]);
        let result = reconstruct_prompt(&log, 0, &Checkpoints::default());

        assert_eq!(result.before, map(&[("/a.py", "")]));
        assert_eq!(result.after, map(&[("/a.py", "")]));
    }

    #[test]
    fn test_state_from_earlier_windows_carries_forward() {
        let log = log_of(vec![
            prompt("one"),
            edit("/a", "1", "2", false),
            prompt("two"),
            edit("/a", "2", "3", false),
            prompt("three"),
            edit("/a", "3", "4", false),
        ]);
        let checkpoints: Checkpoints = [("/a", "1")].into_iter().collect();

        let result = reconstruct_prompt(&log, 1, &checkpoints);
        assert_eq!(result.before, map(&[("/a", "2")]));
        assert_eq!(result.after, map(&[("/a", "3")]));
    }

    #[test]
    fn test_after_excludes_mutations_past_window() {
        let log = log_of(vec![
            prompt("one"),
            write("/a", "mine"),
            prompt("two"),
            write("/a", "theirs"),
        ]);
        let result = reconstruct_prompt(&log, 0, &Checkpoints::default());
        assert_eq!(result.after, map(&[("/a", "mine")]));
    }

    #[test]
    fn test_multiple_mutations_in_window() {
        let log = log_of(vec![
            prompt("go"),
            write("/a", "one two"),
            edit("/a", "one", "1", false),
            edit("/a", "two", "2", false),
        ]);
        let result = reconstruct_prompt(&log, 0, &Checkpoints::default());
        assert_eq!(result.before, map(&[("/a", "")]));
        assert_eq!(result.after, map(&[("/a", "1 2")]));
    }

    #[test]
    fn test_same_position_mutations() {
        let log = SessionLog {
            session_id: "s".to_string(),
            record_count: 2,
            events: vec![
                at(0, prompt("go")),
                at(1, write("/a", "x")),
                at(1, edit("/a", "x", "y", false)),
            ],
        };
        let result = reconstruct_prompt(&log, 0, &Checkpoints::default());
        assert_eq!(result.before, map(&[("/a", "")]));
        assert_eq!(result.after, map(&[("/a", "y")]));
    }

    #[test]
    fn test_untouched_checkpoints_are_not_reported() {
        let log = log_of(vec![prompt("go"), write("/a", "x")]);
        let checkpoints: Checkpoints = [("/other", "content")].into_iter().collect();
        let result = reconstruct_prompt(&log, 0, &checkpoints);
        assert_eq!(result.paths(), vec!["/a"]);
    }

    #[test]
    fn test_out_of_range_and_empty_inputs() {
        let log = log_of(vec![prompt("go"), write("/a", "x")]);
        assert!(reconstruct_prompt(&log, 5, &Checkpoints::default()).is_empty());
        assert!(reconstruct_prompt(&SessionLog::new("s"), 0, &Checkpoints::default()).is_empty());

        let quiet = log_of(vec![prompt("just talk")]);
        assert!(reconstruct_prompt(&quiet, 0, &Checkpoints::default()).is_empty());
    }

    fn arb_event() -> impl Strategy<Value = Event> {
        let path = prop::sample::select(vec!["/a", "/b", "/c"]);
        let text = "[ab]{0,4}";
        prop_oneof![
            "[a-z ]{0,6}".prop_map(|t| prompt(&t)),
            (path.clone(), text).prop_map(|(p, c)| write(p, &c)),
            (path, text, text, any::<bool>()).prop_map(|(p, o, n, all)| edit(p, &o, &n, all)),
        ]
    }

    proptest! {
        #[test]
        fn prop_replay_is_deterministic(
            events in prop::collection::vec(arb_event(), 0..40),
            index in 0usize..6,
        ) {
            let log = log_of(events);
            let checkpoints: Checkpoints = [("/a", "abab")].into_iter().collect();
            let first = reconstruct_prompt(&log, index, &checkpoints);
            let second = reconstruct_prompt(&log, index, &checkpoints);
            prop_assert_eq!(&first, &second);
            let before_keys: Vec<&String> = first.before.keys().collect();
            let after_keys: Vec<&String> = first.after.keys().collect();
            prop_assert_eq!(before_keys, after_keys);
        }
    }
}
