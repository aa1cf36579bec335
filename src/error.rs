use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the state store.
///
/// Storage failures are surfaced to acquisition code as recoverable
/// conditions: a check may proceed without persisted state or treat the
/// error as fatal, but the store itself never masks corruption as
/// "no state".
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("state file {path} is locked by another process")]
    Locked { path: PathBuf },

    #[error("cookie is closed")]
    Closed,
}

/// Error taxonomy for check execution.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Malformed range specification, detected at parse time.
    #[error("invalid range '{spec}': {reason}")]
    Syntax { spec: String, reason: String },

    /// The state store failed to open, read, or commit.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Caller-supplied measurement code failed.
    #[error("{0}")]
    Acquisition(String),

    /// Programming mistake by the check author, e.g. duplicate or
    /// missing context registration. Fatal before acquisition starts.
    #[error("check configuration error: {0}")]
    Config(String),

    /// Acquisition exceeded its deadline.
    #[error("check execution aborted after {0}s")]
    Timeout(u64),
}

impl CheckError {
    pub fn acquisition(message: impl Into<String>) -> Self {
        CheckError::Acquisition(message.into())
    }

    pub(crate) fn syntax(spec: &str, reason: impl Into<String>) -> Self {
        CheckError::Syntax {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for CheckError {
    fn from(e: io::Error) -> Self {
        CheckError::Acquisition(e.to_string())
    }
}
