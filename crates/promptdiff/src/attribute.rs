//! Assigning file mutations to prompt windows.

use crate::types::{LogEvent, PromptWindow, SessionLog};
use std::collections::BTreeMap;

/// Mutations relevant to one window.
#[derive(Debug, Clone)]
pub struct Attribution<'a> {
    /// Mutations positioned inside the window, in log order.
    pub in_window: Vec<&'a LogEvent>,
    /// Every mutation from the start of the log up to the window's end.
    pub replay_prefix: Vec<&'a LogEvent>,
    /// Position of the first in-window mutation of each path.
    pub first_touch: BTreeMap<&'a str, usize>,
}

impl<'a> Attribution<'a> {
    /// Distinct paths touched in the window, in first-touch order.
    pub fn touched_paths(&self) -> Vec<&'a str> {
        let mut seen = Vec::new();
        for event in &self.in_window {
            if let Some(path) = event.event.mutated_path()
                && !seen.contains(&path)
            {
                seen.push(path);
            }
        }
        seen
    }

    pub fn is_empty(&self) -> bool {
        self.in_window.is_empty()
    }
}

pub fn attribute<'a>(log: &'a SessionLog, window: &PromptWindow) -> Attribution<'a> {
    let mut in_window = Vec::new();
    let mut replay_prefix = Vec::new();
    let mut first_touch = BTreeMap::new();

    for event in log.mutations() {
        if event.position >= window.end_index {
            break;
        }
        replay_prefix.push(event);
        if window.contains(event.position) {
            in_window.push(event);
            if let Some(path) = event.event.mutated_path() {
                first_touch.entry(path).or_insert(event.position);
            }
        }
    }

    Attribution {
        in_window,
        replay_prefix,
        first_touch,
    }
}
