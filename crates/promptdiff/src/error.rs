use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffError>;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Home directory not found")]
    NoHomeDirectory,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Prompt {index} not found in session {session_id}")]
    PromptNotFound { session_id: String, index: usize },

    #[error("No diff viewer found (tried: {0})")]
    ViewerNotFound(String),

    #[error("Invalid settings file {path}: {reason}")]
    InvalidSettings { path: PathBuf, reason: String },

    #[error("Generic error: {0}")]
    Other(#[from] anyhow::Error),
}
