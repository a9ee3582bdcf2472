use std::sync::Arc;

use log::warn;

use crate::config::HashConfig;
use crate::job::HashJob;
use crate::selection::{self, FileInfo};
use crate::sink::ResultSink;

/// The init/finish pair a file-properties dialog calls into.
#[derive(Debug, Clone, Default)]
pub struct PropertyModule {
    config: HashConfig,
}

impl PropertyModule {
    pub fn new(config: HashConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    /// Starts hashing the selected file. Returns `None` when nothing should
    /// be shown: the selection is not a single regular file, or the job
    /// could not be started.
    pub fn init(&self, files: &[FileInfo], sink: Arc<dyn ResultSink>) -> Option<HashJob> {
        let target = selection::validate(files).ok()?;
        let mut job = HashJob::new(target, self.config.algorithm.clone())
            .with_block_size(self.config.block_size);
        match job.start(sink) {
            Ok(_) => Some(job),
            Err(err) => {
                warn!("{}", err);
                None
            }
        }
    }

    /// Releases a job handed out by [`PropertyModule::init`].
    pub fn finish(&self, job: Option<HashJob>, cancelled: bool) {
        if let Some(mut job) = job {
            job.shutdown(cancelled, self.config.teardown_timeout());
        }
    }
}
