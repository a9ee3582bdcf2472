use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::ErrorKind;
use crate::hashers::{self, clamp_block_size, DEFAULT_BLOCK_SIZE};
use crate::models::Algorithm;

/// Compute hash of the file at path using streaming read.
/// This is synchronous; call it inside a spawned thread to keep UI responsive.
pub fn compute_file_hash(path: &Path, algo: Algorithm) -> Result<String, ErrorKind> {
    compute_file_hash_with_block_size(path, algo, DEFAULT_BLOCK_SIZE)
}

pub fn compute_file_hash_with_block_size(
    path: &Path,
    algo: Algorithm,
    block_size: usize,
) -> Result<String, ErrorKind> {
    if path.as_os_str().is_empty() {
        return Err(ErrorKind::InvalidPath);
    }
    let block_size = clamp_block_size(block_size);
    let hasher = hashers::new_hasher(algo)?;
    let f = File::open(path)?;
    let reader = BufReader::with_capacity(block_size, f);
    hashers::compute_hash_for_reader(reader, hasher, block_size)
}
