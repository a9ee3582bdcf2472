use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    #[default]
    Md5,
    Sha256,
    Sha512,
    Sha3_256,
    Blake3,
}

impl Algorithm {
    pub fn all() -> Vec<Algorithm> {
        vec![Algorithm::Md5, Algorithm::Sha256, Algorithm::Sha512, Algorithm::Sha3_256, Algorithm::Blake3]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha512 => "SHA-512",
            Algorithm::Sha3_256 => "SHA3-256",
            Algorithm::Blake3 => "BLAKE3",
        }
    }

    /// Caption shown next to the digest on the property page.
    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5sum:",
            Algorithm::Sha256 => "SHA256sum:",
            Algorithm::Sha512 => "SHA512sum:",
            Algorithm::Sha3_256 => "SHA3-256sum:",
            Algorithm::Blake3 => "BLAKE3sum:",
        }
    }

    /// Width of the lowercase hex rendering.
    pub fn hex_len(&self) -> usize {
        match self {
            Algorithm::Md5 => 32,
            Algorithm::Sha256 | Algorithm::Sha3_256 | Algorithm::Blake3 => 64,
            Algorithm::Sha512 => 128,
        }
    }

    /// Whether a backend for this algorithm was compiled in.
    pub fn is_supported(&self) -> bool {
        match self {
            Algorithm::Md5 => true,
            Algorithm::Sha256 | Algorithm::Sha512 => cfg!(feature = "sha2"),
            Algorithm::Sha3_256 => cfg!(feature = "sha3"),
            Algorithm::Blake3 => cfg!(feature = "blake3"),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha256" => Ok(Algorithm::Sha256),
            "sha512" => Ok(Algorithm::Sha512),
            "sha3256" => Ok(Algorithm::Sha3_256),
            "blake3" => Ok(Algorithm::Blake3),
            _ => Err(ErrorKind::InvalidAlgorithm(s.to_string())),
        }
    }
}

/// Shared, immutable reference to the file a job hashes.
///
/// Cloning only bumps a reference count, so a job can hold its own
/// reference independent of the host's.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePathRef(Arc<Path>);

impl FilePathRef {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FilePathRef(Arc::from(path.as_ref()))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.0.to_path_buf()
    }
}

impl AsRef<Path> for FilePathRef {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for FilePathRef {
    fn from(path: PathBuf) -> Self {
        FilePathRef(Arc::from(path))
    }
}

impl From<&Path> for FilePathRef {
    fn from(path: &Path) -> Self {
        FilePathRef::new(path)
    }
}

impl fmt::Display for FilePathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

pub type DigestResult = Result<String, ErrorKind>;

/// Point-in-time view of a job, suitable for logging or handing to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashReport {
    pub id: String,
    pub file_name: String,
    pub file_path: PathBuf,
    /// Resolved algorithm; `None` until the job starts or when the name was rejected.
    pub algorithm: Option<Algorithm>,
    pub requested_algorithm: String,
    pub state: JobState,
    pub digest: Option<String>,
    pub error: Option<ErrorKind>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}
