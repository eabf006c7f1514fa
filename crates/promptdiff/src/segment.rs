//! Splitting a session log into prompt windows.
//!
//! Not every `user` record is something a person typed: Claude Code also
//! records tool results, interruption notices and slash-command plumbing as
//! user messages. Only the remaining "genuine" prompts anchor a window.

use crate::types::{Event, PromptWindow, SessionLog};

/// Leading text of user messages injected by the harness rather than typed.
pub const NOISE_MARKERS: [&str; 5] = [
    "[Request interrupted",
    "<command-message>",
    "<command-name>",
    "<task-notification>",
    "<system-reminder>",
];

/// True if `text` is empty after trimming or starts with a noise marker.
pub fn is_noise(text: &str) -> bool {
    let stripped = text.trim();
    stripped.is_empty() || NOISE_MARKERS.iter().any(|m| stripped.starts_with(m))
}

/// One window per genuine prompt, in log order.
///
/// Each window runs from its prompt's position up to the next genuine
/// prompt's position, or to the record count for the last one.
pub fn segment(log: &SessionLog) -> Vec<PromptWindow> {
    let mut windows: Vec<PromptWindow> = Vec::new();

    for entry in &log.events {
        let Event::UserPrompt {
            text,
            working_dir,
            timestamp,
        } = &entry.event
        else {
            continue;
        };
        if is_noise(text) {
            continue;
        }
        if let Some(prev) = windows.last_mut() {
            prev.end_index = entry.position;
        }
        windows.push(PromptWindow {
            start_index: entry.position,
            end_index: log.record_count,
            prompt_text: text.clone(),
            working_dir: working_dir.clone(),
            timestamp: timestamp.clone(),
        });
    }

    windows
}

/// The window for the `index`-th genuine prompt, if there is one.
pub fn window_at(log: &SessionLog, index: usize) -> Option<PromptWindow> {
    segment(log).into_iter().nth(index)
}
