use std::fs;
use std::path::Path;

use crate::error::ErrorKind;
use crate::models::FilePathRef;

/// What the host knows about one selected entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: FilePathRef,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl FileInfo {
    /// Looks the entry up without following symlinks.
    pub fn probe(path: impl AsRef<Path>) -> Result<FileInfo, ErrorKind> {
        let path = path.as_ref();
        let meta = fs::symlink_metadata(path)?;
        Ok(FileInfo {
            path: FilePathRef::new(path),
            is_dir: meta.is_dir(),
            is_symlink: meta.file_type().is_symlink(),
        })
    }
}

/// Accepts exactly one entry that is neither a directory nor a symlink and
/// hands back the job's own reference to its path.
pub fn validate(files: &[FileInfo]) -> Result<FilePathRef, ErrorKind> {
    match files {
        [file] if !file.is_dir && !file.is_symlink => Ok(file.path.clone()),
        _ => Err(ErrorKind::InvalidSelection),
    }
}
