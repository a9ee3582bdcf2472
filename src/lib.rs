//! Checksums for the file-properties dialog, computed off the UI thread.
//!
//! The host validates the selection, starts a [`HashJob`] with a
//! [`ResultSink`] for its digest field, and shuts the job down when the
//! dialog closes. [`PropertyModule`] bundles that sequence.

pub mod config;
mod error;
mod file_ops;
mod hashers;
mod job;
pub mod logging;
mod models;
mod module;
mod selection;
mod sink;

pub use config::HashConfig;
pub use error::ErrorKind;
pub use file_ops::{compute_file_hash, compute_file_hash_with_block_size};
pub use hashers::{compute_hash_for_reader, new_hasher, Hasher, DEFAULT_BLOCK_SIZE};
pub use job::{HashJob, JobId, WorkerHandle};
pub use models::{Algorithm, DigestResult, FilePathRef, HashReport, JobState};
pub use module::PropertyModule;
pub use selection::{validate, FileInfo};
pub use sink::{error_text, ChannelSink, ResultSink, SinkEvent};
