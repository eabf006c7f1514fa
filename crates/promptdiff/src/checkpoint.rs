//! The per-session checkpoint store under `<claude-dir>/session-snapshots`.
//!
//! ```text
//! session-snapshots/
//!   .last_cleanup
//!   <session-id>/
//!     meta.json
//!     files/<absolute path without leading '/'>
//! ```
//!
//! Every write is create-if-absent: the content goes to a temporary sibling
//! which is then linked into place without clobbering. Concurrent hook
//! processes racing on the same path leave exactly one checkpoint behind.

use crate::error::Result;
use crate::paths::{PathResolver, rehome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::debug;

pub const META_FILE: &str = "meta.json";
pub const FILES_DIR: &str = "files";
pub const CLEANUP_MARKER: &str = ".last_cleanup";

/// Minimum time between two prune passes.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Sessions whose metadata is older than this are removed by a prune pass.
pub const MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// First-seen content of every file a session mutated, keyed by absolute path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoints(BTreeMap<String, String>);

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.0.insert(path.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Checkpoints {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Contents of `meta.json`, written once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub session_id: String,
    pub project_cwd: String,
    pub created: String,
}

/// Result of one capture attempt. Only `Captured` wrote anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOutcome {
    Captured,
    NotAMutation,
    MissingPath,
    RelativePath,
    NewFile,
    InvalidSession,
    AlreadyCaptured,
}

impl CaptureOutcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, CaptureOutcome::Captured)
    }
}

/// Thresholds for a prune pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrunePolicy {
    pub interval: Duration,
    pub max_age: Duration,
}

impl Default for PrunePolicy {
    fn default() -> Self {
        Self {
            interval: CLEANUP_INTERVAL,
            max_age: MAX_AGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneOutcome {
    /// The last pass ran less than `interval` ago.
    Skipped,
    /// Session ids whose directories were removed.
    Pruned(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn from_resolver(resolver: &PathResolver) -> Result<Self> {
        Ok(Self::new(resolver.snapshots_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    /// Where the checkpoint of `file_path` lives for `session_id`.
    pub fn checkpoint_path(&self, session_id: &str, file_path: &Path) -> PathBuf {
        self.session_dir(session_id)
            .join(FILES_DIR)
            .join(rehome(file_path))
    }

    /// Loads every checkpoint of a session into memory.
    ///
    /// Never fails: a missing session yields an empty table and files that
    /// cannot be read as UTF-8 text are skipped.
    pub fn load(&self, session_id: &str) -> Checkpoints {
        let files_dir = self.session_dir(session_id).join(FILES_DIR);
        let mut checkpoints = Checkpoints::new();
        if is_valid_session_id(session_id) {
            collect_files(&files_dir, &files_dir, &mut checkpoints);
        }
        checkpoints
    }

    pub fn read_meta(&self, session_id: &str) -> Option<SessionMeta> {
        let path = self.session_dir(session_id).join(META_FILE);
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Copies `file_path` into the store unless a checkpoint already exists.
    ///
    /// The first successful capture of a session also writes `meta.json`.
    pub fn capture(
        &self,
        session_id: &str,
        file_path: &Path,
        project_cwd: &str,
    ) -> Result<CaptureOutcome> {
        if !is_valid_session_id(session_id) {
            return Ok(CaptureOutcome::InvalidSession);
        }
        if !file_path.is_absolute() {
            return Ok(CaptureOutcome::RelativePath);
        }
        if !file_path.exists() {
            return Ok(CaptureOutcome::NewFile);
        }

        let dest = self.checkpoint_path(session_id, file_path);
        if dest.exists() {
            return Ok(CaptureOutcome::AlreadyCaptured);
        }

        let mut source = File::open(file_path)?;
        let created = create_if_absent(&dest, |out| io::copy(&mut source, out).map(|_| ()))?;
        if !created {
            return Ok(CaptureOutcome::AlreadyCaptured);
        }
        debug!(session_id, path = %file_path.display(), "captured checkpoint");

        let meta = SessionMeta {
            session_id: session_id.to_string(),
            project_cwd: project_cwd.to_string(),
            created: chrono::Local::now()
                .format("%Y-%m-%dT%H:%M:%S%z")
                .to_string(),
        };
        let meta_path = self.session_dir(session_id).join(META_FILE);
        create_if_absent(&meta_path, |out| {
            serde_json::to_writer_pretty(&mut *out, &meta)?;
            Ok(())
        })?;

        Ok(CaptureOutcome::Captured)
    }

    pub fn prune(&self, policy: &PrunePolicy, force: bool) -> Result<PruneOutcome> {
        self.prune_at(policy, force, SystemTime::now())
    }

    /// Removes sessions whose `meta.json` was last modified more than
    /// `max_age` before `now`, then refreshes the cleanup marker.
    ///
    /// Session directories without metadata and hidden entries are kept.
    pub fn prune_at(
        &self,
        policy: &PrunePolicy,
        force: bool,
        now: SystemTime,
    ) -> Result<PruneOutcome> {
        if !self.root.is_dir() {
            return Ok(PruneOutcome::Pruned(Vec::new()));
        }

        let marker = self.root.join(CLEANUP_MARKER);
        if !force
            && let Some(age) = age_of(&marker, now)
            && age < policy.interval
        {
            return Ok(PruneOutcome::Skipped);
        }

        let mut removed = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') || !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(age) = age_of(&entry.path().join(META_FILE), now) else {
                continue;
            };
            if age > policy.max_age {
                match fs::remove_dir_all(entry.path()) {
                    Ok(()) => removed.push(name),
                    Err(e) => debug!(session = %name, error = %e, "failed to remove session"),
                }
            }
        }
        removed.sort();

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        write!(tmp, "{}", chrono::Utc::now().timestamp())?;
        tmp.persist(&marker).map_err(|e| e.error)?;

        Ok(PruneOutcome::Pruned(removed))
    }
}

/// Rejects ids that would escape the store root.
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id != "."
        && session_id != ".."
        && !session_id.contains(['/', '\\'])
}

/// Writes `dest` through a temporary sibling and links it into place only if
/// nothing is there yet. Returns `false` when another writer got there first.
fn create_if_absent<F>(dest: &Path, write: F) -> Result<bool>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;

    match tmp.persist_noclobber(dest) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error.into()),
    }
}

fn age_of(path: &Path, now: SystemTime) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(now.duration_since(modified).unwrap_or_default())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Checkpoints) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            collect_files(root, &path, out);
            continue;
        }
        let Some(key) = checkpoint_key(root, &path) else {
            continue;
        };
        match fs::read(&path).map(String::from_utf8) {
            Ok(Ok(content)) => out.insert(key, content),
            Ok(Err(_)) => debug!(path = %key, "skipping non-UTF-8 checkpoint"),
            Err(e) => debug!(path = %key, error = %e, "skipping unreadable checkpoint"),
        }
    }
}

/// `files/home/u/a.py` → `/home/u/a.py`.
fn checkpoint_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(format!("/{}", parts.join("/")))
}
