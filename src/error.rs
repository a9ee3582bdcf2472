use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Everything that can keep a digest from reaching the property page.
///
/// Errors raised inside the worker are stored on the job as data, so the
/// type is `Clone` and carries the OS error as plain fields rather than an
/// `io::Error`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ErrorKind {
    #[error("selection is not a single regular file")]
    InvalidSelection,
    #[error("invalid path")]
    InvalidPath,
    #[error("io failure: {message}")]
    IoFailure { code: Option<i32>, message: String },
    #[error("digest computation produced no output")]
    EmptyDigest,
    #[error("invalid hash type: {0}")]
    InvalidAlgorithm(String),
    #[error("could not spawn hash worker: {0}")]
    ThreadSpawnFailure(String),
    #[error("job was already started")]
    AlreadyStarted,
    #[error("hash worker panicked: {0}")]
    WorkerPanic(String),
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::IoFailure {
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}
