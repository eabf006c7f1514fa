//! Turning a [`Reconstruction`] into something a person can look at.

use crate::error::{DiffError, Result};
use crate::paths::rehome;
use crate::types::Reconstruction;
use similar::TextDiff;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

pub const BEFORE_PREFIX: &str = "claude_diff_before_";
pub const AFTER_PREFIX: &str = "claude_diff_after_";

/// Two directory trees holding the before and after side of every path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffTrees {
    pub before_dir: PathBuf,
    pub after_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    Opened(DiffTrees),
    NothingToShow,
}

/// Writes both trees under the system temp directory.
///
/// The directories are left behind for the viewer to read after this
/// process exits. Returns `None` when there is nothing to show.
pub fn materialize(result: &Reconstruction) -> Result<Option<DiffTrees>> {
    materialize_in(result, &std::env::temp_dir())
}

pub fn materialize_in(result: &Reconstruction, parent: &Path) -> Result<Option<DiffTrees>> {
    if result.is_empty() {
        return Ok(None);
    }

    let before_dir = kept_tempdir(BEFORE_PREFIX, parent)?;
    let after_dir = kept_tempdir(AFTER_PREFIX, parent)?;
    let paths = result.paths();
    write_tree(&before_dir, &paths, &result.before)?;
    write_tree(&after_dir, &paths, &result.after)?;

    Ok(Some(DiffTrees {
        before_dir,
        after_dir,
    }))
}

fn kept_tempdir(prefix: &str, parent: &Path) -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix(prefix)
        .keep(true)
        .tempdir_in(parent)?;
    Ok(dir.path().to_path_buf())
}

/// A path missing from `files` is written as an empty file.
fn write_tree(root: &Path, paths: &[&str], files: &BTreeMap<String, String>) -> Result<()> {
    for path in paths {
        let dest = root.join(rehome(Path::new(path)));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = files.get(*path).map(String::as_str).unwrap_or_default();
        fs::write(&dest, content)?;
    }
    Ok(())
}

/// Unified diff of every changed path, 3 lines of context.
pub fn render_unified(result: &Reconstruction) -> String {
    let mut out = String::new();
    for path in result.paths() {
        let old = result.before.get(path).map(String::as_str).unwrap_or_default();
        let new = result.after.get(path).map(String::as_str).unwrap_or_default();
        let diff = TextDiff::from_lines(old, new);
        let unified = diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("a{path}"), &format!("b{path}"))
            .to_string();
        out.push_str(&unified);
    }
    out
}

/// An external program that compares two directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffViewer {
    pub program: PathBuf,
    pub leading_args: Vec<String>,
}

impl DiffViewer {
    pub const ENV_VAR: &'static str = "PROMPTDIFF_VIEWER";

    /// Tried in order when nothing is configured.
    pub const CANDIDATES: [&'static str; 3] = ["pycharm diff", "pycharm-professional diff", "meld"];

    pub fn new<P: Into<PathBuf>>(program: P, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    /// `"pycharm diff"` → program `pycharm`, leading args `["diff"]`.
    pub fn parse(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program, words.map(str::to_string).collect()))
    }

    /// Picks the viewer from `explicit`, then `$PROMPTDIFF_VIEWER`, then the
    /// built-in candidates.
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        let from_env = std::env::var(Self::ENV_VAR).ok();
        Self::resolve_from(explicit, from_env.as_deref())
    }

    pub fn resolve_from(explicit: Option<&str>, from_env: Option<&str>) -> Result<Self> {
        let configured = explicit
            .filter(|s| !s.trim().is_empty())
            .or(from_env.filter(|s| !s.trim().is_empty()));

        if let Some(command) = configured {
            return Self::parse(command)
                .and_then(|v| v.located())
                .ok_or_else(|| DiffError::ViewerNotFound(command.trim().to_string()));
        }

        Self::CANDIDATES
            .iter()
            .filter_map(|c| Self::parse(c))
            .find_map(|v| v.located())
            .ok_or_else(|| DiffError::ViewerNotFound(Self::CANDIDATES.join(", ")))
    }

    /// The same viewer with `program` resolved to a full path on `PATH`.
    fn located(self) -> Option<Self> {
        match which::which(&self.program) {
            Ok(program) => Some(Self { program, ..self }),
            Err(e) => {
                debug!(program = %self.program.display(), error = %e, "viewer not found");
                None
            }
        }
    }

    pub fn command(&self, trees: &DiffTrees) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg(&trees.before_dir)
            .arg(&trees.after_dir);
        cmd
    }

    /// Launches the viewer without waiting for it.
    pub fn open(&self, trees: &DiffTrees) -> Result<()> {
        self.command(trees)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

/// Materializes `result` and opens it in `viewer`.
pub fn open_diff(result: &Reconstruction, viewer: &DiffViewer) -> Result<DiffOutcome> {
    match materialize(result)? {
        Some(trees) => {
            viewer.open(&trees)?;
            Ok(DiffOutcome::Opened(trees))
        }
        None => Ok(DiffOutcome::NothingToShow),
    }
}
