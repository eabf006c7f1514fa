use crate::error::Result;
use crate::paths::normalize_path;
use crate::types::{
    EditInput, Event, LogEvent, RawBlock, RawContent, RawRecord, SessionLog, WriteInput,
};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

pub struct LogReader;

impl LogReader {
    /// Reads and decodes a session log. The session id is the file stem.
    ///
    /// Never fails: an unreadable file yields an empty log.
    pub fn read_session<P: AsRef<Path>>(path: P) -> SessionLog {
        let path = path.as_ref();
        Self::try_read_session(path).unwrap_or_else(|e| {
            debug!(path = %path.display(), error = %e, "cannot open session log");
            SessionLog::new(session_id_of(path))
        })
    }

    /// Like [`read_session`](Self::read_session), but reports a log that
    /// cannot be opened.
    pub fn try_read_session<P: AsRef<Path>>(path: P) -> Result<SessionLog> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let records = Self::parse_records(file);
        Ok(decode_session(session_id_of(path), &records))
    }

    /// Reads every line that parses as a JSON object, in order.
    /// Only `Value::Object`s are returned.
    pub fn read_records<P: AsRef<Path>>(path: P) -> Vec<Value> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Self::parse_records(file),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "cannot open session log");
                Vec::new()
            }
        }
    }

    /// Line-by-line parse of any reader. Bad lines (including invalid UTF-8
    /// and non-object JSON) are skipped; an I/O error ends the read with
    /// whatever was collected so far.
    pub fn parse_records<R: Read>(source: R) -> Vec<Value> {
        let reader = BufReader::new(source);
        let mut records = Vec::new();

        for (line_num, line) in reader.split(b'\n').enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    debug!(line = line_num + 1, error = %e, "log read aborted");
                    break;
                }
            };
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<Value>(&line) {
                Ok(value @ Value::Object(_)) => records.push(value),
                Ok(_) => debug!(line = line_num + 1, "skipping non-object record"),
                Err(e) => debug!(line = line_num + 1, error = %e, "skipping malformed record"),
            }
        }

        records
    }
}

fn session_id_of(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
}

/// Turns raw records into typed events, keeping each record's position.
pub fn decode_session(session_id: &str, records: &[Value]) -> SessionLog {
    let mut log = SessionLog::new(session_id);
    log.record_count = records.len();

    for (position, record) in records.iter().enumerate() {
        let Ok(raw) = RawRecord::deserialize(record) else {
            continue;
        };
        for event in decode_record(raw) {
            log.events.push(LogEvent { position, event });
        }
    }

    log
}

fn decode_record(raw: RawRecord) -> Vec<Event> {
    let content = raw.message.and_then(|m| m.content);
    match raw.entry_type.as_str() {
        "user" => vec![Event::UserPrompt {
            text: content.map(|c| user_text(&c)).unwrap_or_default(),
            working_dir: raw.cwd.unwrap_or_default(),
            timestamp: raw.timestamp.unwrap_or_default(),
        }],
        "assistant" => match content {
            Some(RawContent::Blocks(blocks)) => blocks.iter().filter_map(decode_tool_call).collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Plain text of a user message: the string itself, or the `text` blocks
/// joined by single spaces.
fn user_text(content: &RawContent) -> String {
    match content {
        RawContent::Text(text) => text.clone(),
        RawContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match RawBlock::deserialize(b) {
                Ok(RawBlock::Text { text }) => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn decode_tool_call(block: &Value) -> Option<Event> {
    let RawBlock::ToolUse { name, input } = RawBlock::deserialize(block).ok()? else {
        return None;
    };
    match name.as_str() {
        "Write" => {
            let input = WriteInput::deserialize(&input).ok()?;
            (!input.file_path.is_empty()).then(|| Event::FileWrite {
                path: normalize_path(&input.file_path),
                content: input.content,
            })
        }
        "Edit" => {
            let input = EditInput::deserialize(&input).ok()?;
            (!input.file_path.is_empty()).then(|| Event::FileEdit {
                path: normalize_path(&input.file_path),
                old: input.old_string,
                new: input.new_string,
                replace_all: input.replace_all,
            })
        }
        _ => None,
    }
}
