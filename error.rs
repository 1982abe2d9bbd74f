use serde::Serialize;
use thiserror::Error;

/// Errors that abort a whole shred run before any file is touched
#[derive(Debug, Error)]
pub enum ShredError {
    /// Bad pass count, chunk size or other unusable settings
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O failure outside of a single file's shred (e.g. reading config)
    #[error("I/O error: {0}")]
    Io(String),
}

impl ShredError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

impl From<std::io::Error> for ShredError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Why a single target could not be shredded.
///
/// These are recorded as data in a [`crate::report::ShredOutcome`]; they
/// never stop the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("not a regular file")]
    NotAFile,

    #[error("is a directory (use --recursive)")]
    IsDirectoryNotRecursive,

    #[error("unsupported file type (symlink or special file)")]
    UnsupportedFileType,

    #[error("path not found")]
    PathNotFound,

    /// Write, flush, seek or open failure; partial overwrite may exist
    #[error("I/O error: {0}")]
    Io(String),

    /// Read-back after pass `pass` (1-based) did not match the pattern
    #[error("verification failed after pass {pass}")]
    VerifyMismatch { pass: usize },

    #[error("cancelled")]
    Cancelled,
}

impl From<std::io::Error> for FailureReason {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
