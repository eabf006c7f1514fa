use crate::error::{DiffError, Result};
use std::env;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Resolves every on-disk location the tool reads or writes.
///
/// Defaults to `$HOME/.claude`; tests and the `--claude-dir` flag override it.
#[derive(Debug, Clone)]
pub struct PathResolver {
    home_dir: Option<PathBuf>,
    claude_dir: Option<PathBuf>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver {
    pub fn new() -> Self {
        let home_dir = dirs::home_dir();
        Self {
            home_dir,
            claude_dir: None,
        }
    }

    pub fn with_home<P: Into<PathBuf>>(mut self, home: P) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    pub fn with_claude_dir<P: Into<PathBuf>>(mut self, claude_dir: P) -> Self {
        self.claude_dir = Some(claude_dir.into());
        self
    }

    pub fn home_dir(&self) -> Result<&Path> {
        self.home_dir.as_deref().ok_or(DiffError::NoHomeDirectory)
    }

    pub fn claude_dir(&self) -> Result<PathBuf> {
        if let Some(ref claude_dir) = self.claude_dir {
            return Ok(claude_dir.clone());
        }

        let home = self.home_dir()?;
        Ok(home.join(".claude"))
    }

    pub fn projects_dir(&self) -> Result<PathBuf> {
        Ok(self.claude_dir()?.join("projects"))
    }

    pub fn settings_file(&self) -> Result<PathBuf> {
        Ok(self.claude_dir()?.join("settings.json"))
    }

    /// Root of the checkpoint store, one subdirectory per session.
    pub fn snapshots_dir(&self) -> Result<PathBuf> {
        Ok(self.claude_dir()?.join("session-snapshots"))
    }

    /// Every session log under every project directory, sorted by path.
    ///
    /// Only files named `<uuid>.jsonl` count; agent sidechain logs and other
    /// files Claude Code leaves next to them are ignored.
    pub fn session_logs(&self) -> Result<Vec<PathBuf>> {
        let projects_dir = self.projects_dir()?;
        if !projects_dir.exists() {
            return Ok(Vec::new());
        }

        let mut logs = Vec::new();
        for project in std::fs::read_dir(&projects_dir)? {
            let project = project?;
            if !project.file_type()?.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(project.path())? {
                let entry = entry?;
                if entry.file_type()?.is_file()
                    && let Some(name) = entry.file_name().to_str()
                    && is_session_log_name(name)
                {
                    logs.push(entry.path());
                }
            }
        }
        logs.sort();
        Ok(logs)
    }

    /// Locates the log for `session_id` in whichever project it belongs to.
    pub fn find_session_log(&self, session_id: &str) -> Result<PathBuf> {
        let file_name = format!("{}.jsonl", session_id);
        self.session_logs()?
            .into_iter()
            .find(|p| p.file_name().and_then(|n| n.to_str()) == Some(file_name.as_str()))
            .ok_or_else(|| DiffError::SessionNotFound(session_id.to_string()))
    }
}

/// The `Normal` components of `path` after resolving `.` and `..`
/// lexically. `..` never climbs above the root.
fn resolved_components(path: &Path) -> Vec<&OsStr> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts
}

/// An absolute path re-rooted as a relative one: `/home/u/a.py` becomes
/// `home/u/a.py` and `/w/sub/../a.py` becomes `w/a.py`.
pub(crate) fn rehome(path: &Path) -> PathBuf {
    resolved_components(path).into_iter().collect()
}

/// Lexically normalized form of an absolute file path, the key every
/// mutation and checkpoint is stored under. Relative paths are returned
/// unchanged.
pub fn normalize_path(path: &str) -> String {
    let as_path = Path::new(path);
    if !as_path.has_root() {
        return path.to_string();
    }
    let parts: Vec<String> = resolved_components(as_path)
        .into_iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    format!("/{}", parts.join("/"))
}

/// `8-4-4-4-12` lowercase hex followed by `.jsonl`.
pub(crate) fn is_session_log_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".jsonl") else {
        return false;
    };
    let groups: Vec<&str> = stem.split('-').collect();
    let expected = [8, 4, 4, 4, 12];
    groups.len() == expected.len()
        && groups.iter().zip(expected).all(|(group, len)| {
            group.len() == len
                && group
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
}

mod dirs {
    use super::*;

    pub fn home_dir() -> Option<PathBuf> {
        env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}
