use crate::error::ErrorKind;
use crate::models::Algorithm;
use std::io::Read;

pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;
/// Largest read buffer a job will allocate.
pub const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Clamps a requested block size into `1..=MAX_BLOCK_SIZE`.
pub fn clamp_block_size(block_size: usize) -> usize {
    block_size.clamp(1, MAX_BLOCK_SIZE)
}

/// One running digest computation. Implementations are fed blocks in file
/// order and render the final digest as lowercase hex.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finish_hex(self: Box<Self>) -> String;
}

struct Md5Hasher(md5::Context);

impl Hasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.consume(data);
    }

    fn finish_hex(self: Box<Self>) -> String {
        format!("{:x}", self.0.finalize())
    }
}

#[cfg(feature = "sha2")]
struct Sha256Hasher(sha2::Sha256);

#[cfg(feature = "sha2")]
impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        self.0.update(data);
    }

    fn finish_hex(self: Box<Self>) -> String {
        use sha2::Digest;
        hex::encode(self.0.finalize())
    }
}

#[cfg(feature = "sha2")]
struct Sha512Hasher(sha2::Sha512);

#[cfg(feature = "sha2")]
impl Hasher for Sha512Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        self.0.update(data);
    }

    fn finish_hex(self: Box<Self>) -> String {
        use sha2::Digest;
        hex::encode(self.0.finalize())
    }
}

#[cfg(feature = "sha3")]
struct Sha3_256Hasher(sha3::Sha3_256);

#[cfg(feature = "sha3")]
impl Hasher for Sha3_256Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha3::Digest;
        self.0.update(data);
    }

    fn finish_hex(self: Box<Self>) -> String {
        use sha3::Digest;
        hex::encode(self.0.finalize())
    }
}

#[cfg(feature = "blake3")]
struct Blake3Hasher(blake3::Hasher);

#[cfg(feature = "blake3")]
impl Hasher for Blake3Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finish_hex(self: Box<Self>) -> String {
        self.0.finalize().to_hex().to_string()
    }
}

/// Builds a fresh hasher for `algorithm`, or `InvalidAlgorithm` when its
/// backend was compiled out.
pub fn new_hasher(algorithm: Algorithm) -> Result<Box<dyn Hasher>, ErrorKind> {
    match algorithm {
        Algorithm::Md5 => Ok(Box::new(Md5Hasher(md5::Context::new()))),
        #[cfg(feature = "sha2")]
        Algorithm::Sha256 => {
            use sha2::Digest;
            Ok(Box::new(Sha256Hasher(sha2::Sha256::new())))
        }
        #[cfg(feature = "sha2")]
        Algorithm::Sha512 => {
            use sha2::Digest;
            Ok(Box::new(Sha512Hasher(sha2::Sha512::new())))
        }
        #[cfg(feature = "sha3")]
        Algorithm::Sha3_256 => {
            use sha3::Digest;
            Ok(Box::new(Sha3_256Hasher(sha3::Sha3_256::new())))
        }
        #[cfg(feature = "blake3")]
        Algorithm::Blake3 => Ok(Box::new(Blake3Hasher(blake3::Hasher::new()))),
        #[allow(unreachable_patterns)]
        other => Err(ErrorKind::InvalidAlgorithm(other.name().to_string())),
    }
}

/// Streams `reader` through `hasher` in `block_size` chunks.
pub fn compute_hash_for_reader<R: Read>(
    mut reader: R,
    mut hasher: Box<dyn Hasher>,
    block_size: usize,
) -> Result<String, ErrorKind> {
    let mut buf = vec![0u8; clamp_block_size(block_size)];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buf[..n]);
    }
    let hex = hasher.finish_hex();
    if hex.is_empty() {
        return Err(ErrorKind::EmptyDigest);
    }
    Ok(hex)
}
