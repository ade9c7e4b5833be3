use std::path::PathBuf;
use thiserror::Error;

/// Conditions that abort a tick. Everything else is folded into a `CheckResult`.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("target list {path} could not be read: {source}")]
    TargetsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("target list {path} is malformed: {reason}")]
    TargetsMalformed { path: PathBuf, reason: String },

    #[error("previous snapshot {path} could not be read: {source}")]
    SnapshotUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("previous snapshot {path} is corrupt, refusing to overwrite: {reason}")]
    SnapshotCorrupt { path: PathBuf, reason: String },

    #[error("failed to write snapshot {path}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type TickResult<T> = Result<T, TickError>;
