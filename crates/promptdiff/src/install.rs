//! Registering the capture hook in Claude Code's `settings.json`.

use crate::error::{DiffError, Result};
use serde_json::{Map, Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HOOK_EVENT: &str = "PreToolUse";
pub const HOOK_MATCHER: &str = "Write|Edit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { settings: PathBuf, command: String },
    AlreadyConfigured,
}

/// The hook command line for `exe`, quoted when the path has spaces.
pub fn hook_command(exe: &Path) -> String {
    let exe = exe.display().to_string();
    if exe.contains(char::is_whitespace) {
        format!("\"{exe}\" hook")
    } else {
        format!("{exe} hook")
    }
}

/// True if some `PreToolUse` hook already runs `command` or another
/// `promptdiff hook`.
pub fn is_installed(settings: &Value, command: &str) -> bool {
    settings
        .pointer(&format!("/hooks/{HOOK_EVENT}"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|group| group.get("hooks").and_then(Value::as_array))
        .flatten()
        .filter_map(|hook| hook.get("command").and_then(Value::as_str))
        .any(|c| c.trim() == command.trim() || is_capture_command(c))
}

fn is_capture_command(command: &str) -> bool {
    let command = command.trim_end();
    command.contains("promptdiff") && command.ends_with(" hook")
}

/// Adds the capture hook to `settings_path`, creating the file if needed.
///
/// Other settings and hooks are preserved. The file is replaced atomically.
pub fn install_hook(settings_path: &Path, command: &str) -> Result<InstallOutcome> {
    let mut settings = load_settings(settings_path)?;
    if is_installed(&settings, command) {
        return Ok(InstallOutcome::AlreadyConfigured);
    }

    let invalid = |reason: &str| DiffError::InvalidSettings {
        path: settings_path.to_path_buf(),
        reason: reason.to_string(),
    };

    let root = settings
        .as_object_mut()
        .ok_or_else(|| invalid("top level is not an object"))?;
    let hooks = root
        .entry("hooks")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| invalid("\"hooks\" is not an object"))?;
    let groups = hooks
        .entry(HOOK_EVENT)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| invalid("\"hooks.PreToolUse\" is not an array"))?;

    groups.push(json!({
        "matcher": HOOK_MATCHER,
        "hooks": [{"type": "command", "command": command}],
    }));

    save_settings(settings_path, &settings)?;
    Ok(InstallOutcome::Installed {
        settings: settings_path.to_path_buf(),
        command: command.to_string(),
    })
}

fn load_settings(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(&content).map_err(|e| DiffError::InvalidSettings {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn save_settings(path: &Path, settings: &Value) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, settings)?;
    writeln!(tmp)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
