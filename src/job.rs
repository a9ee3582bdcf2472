//! One background digest computation per property page.
//!
//! All state the worker writes lives behind a single mutex shared through an
//! `Arc`, so the host can drop its `HashJob` at any time: the worker keeps
//! the shared record alive until it exits. The worker claims the sink out of
//! its slot before calling it, so once teardown has emptied the slot no new
//! delivery can start, and teardown never waits on a sink call.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::channel::oneshot;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::file_ops;
use crate::hashers::{clamp_block_size, DEFAULT_BLOCK_SIZE};
use crate::models::{Algorithm, DigestResult, FilePathRef, HashReport, JobState};
use crate::sink::{error_text, ResultSink};

pub type JobId = Uuid;

struct JobInner {
    state: JobState,
    algorithm: Option<Algorithm>,
    result: Option<String>,
    error: Option<ErrorKind>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    waiters: Vec<oneshot::Sender<DigestResult>>,
}

struct Shared {
    inner: Mutex<JobInner>,
    done: Condvar,
    sink: Mutex<Option<Arc<dyn ResultSink>>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, JobInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the job into its terminal state. Later calls are ignored.
    fn finish(&self, outcome: DigestResult) {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return;
        }
        match &outcome {
            Ok(digest) => {
                inner.result = Some(digest.clone());
                inner.state = JobState::Completed;
            }
            Err(err) => {
                inner.error = Some(err.clone());
                inner.state = JobState::Failed;
            }
        }
        inner.finished_at = Some(Utc::now());
        for waiter in inner.waiters.drain(..) {
            let _ = waiter.send(outcome.clone());
        }
        self.done.notify_all();
    }

    fn outcome(inner: &JobInner) -> Option<DigestResult> {
        match inner.state {
            JobState::Completed => inner.result.clone().map(Ok),
            JobState::Failed => inner.error.clone().map(Err),
            JobState::Pending | JobState::Running => None,
        }
    }

    fn wait_until(&self, deadline: Option<Instant>) -> Option<DigestResult> {
        let mut inner = self.lock();
        loop {
            if let Some(outcome) = Self::outcome(&inner) {
                return Some(outcome);
            }
            if inner.state == JobState::Pending {
                return None;
            }
            match deadline {
                None => {
                    inner = self.done.wait(inner).unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    inner = self
                        .done
                        .wait_timeout(inner, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }

    /// Delivers the outcome to the sink unless the host already detached it.
    /// The slot lock is released before the sink runs.
    fn notify_sink(&self, outcome: &DigestResult) {
        let claimed = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sink) = claimed {
            match outcome {
                Ok(digest) => sink.set_text(digest),
                Err(err) => sink.set_error(&error_text(err)),
            }
        }
    }

    fn detach_sink(&self) {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Handle returned by [`HashJob::start`] for waiting on or polling the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    shared: Arc<Shared>,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.shared.lock().state.is_terminal()
    }

    /// Blocks until the worker has recorded its outcome.
    pub fn wait(&self) -> DigestResult {
        loop {
            if let Some(outcome) = self.shared.wait_until(None) {
                return outcome;
            }
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<DigestResult> {
        self.shared.wait_until(Some(Instant::now() + timeout))
    }
}

pub struct HashJob {
    id: JobId,
    target: FilePathRef,
    requested: String,
    block_size: usize,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl HashJob {
    /// Creates a pending job. `algorithm` is resolved by name when the job
    /// starts.
    pub fn new(target: FilePathRef, algorithm: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            requested: algorithm.into(),
            block_size: DEFAULT_BLOCK_SIZE,
            shared: Arc::new(Shared {
                inner: Mutex::new(JobInner {
                    state: JobState::Pending,
                    algorithm: None,
                    result: None,
                    error: None,
                    started_at: None,
                    finished_at: None,
                    waiters: Vec::new(),
                }),
                done: Condvar::new(),
                sink: Mutex::new(None),
            }),
            worker: None,
        }
    }

    pub fn with_algorithm(target: FilePathRef, algorithm: Algorithm) -> Self {
        Self::new(target, algorithm.name())
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = clamp_block_size(block_size);
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn target(&self) -> &FilePathRef {
        &self.target
    }

    pub fn requested_algorithm(&self) -> &str {
        &self.requested
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        self.shared.lock().algorithm
    }

    /// Caption for the digest row, once the algorithm has been resolved.
    pub fn label(&self) -> Option<&'static str> {
        self.algorithm().map(|algorithm| algorithm.label())
    }

    pub fn state(&self) -> JobState {
        self.shared.lock().state
    }

    pub fn result(&self) -> Option<String> {
        self.shared.lock().result.clone()
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.shared.lock().error.clone()
    }

    /// The terminal outcome, or `None` while the job is pending or running.
    pub fn outcome(&self) -> Option<DigestResult> {
        Shared::outcome(&self.shared.lock())
    }

    /// Resolves once the job reaches a terminal state.
    pub fn completion(&self) -> oneshot::Receiver<DigestResult> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.shared.lock();
        match Shared::outcome(&inner) {
            Some(outcome) => {
                let _ = tx.send(outcome);
            }
            None => inner.waiters.push(tx),
        }
        rx
    }

    pub fn report(&self) -> HashReport {
        let inner = self.shared.lock();
        let path = self.target.to_path_buf();
        HashReport {
            id: self.id.to_string(),
            file_name: path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("file")
                .to_string(),
            file_path: path,
            algorithm: inner.algorithm,
            requested_algorithm: self.requested.clone(),
            state: inner.state,
            digest: inner.result.clone(),
            error: inner.error.clone(),
            started_at: inner.started_at,
            finished_at: inner.finished_at,
        }
    }

    /// Spawns the single worker for this job and returns without waiting on it.
    ///
    /// An unsupported algorithm or a failed spawn leaves the job `Failed`
    /// with no worker; the error is also returned to the caller.
    pub fn start(&mut self, sink: Arc<dyn ResultSink>) -> Result<WorkerHandle, ErrorKind> {
        let algorithm = {
            let mut inner = self.shared.lock();
            if inner.state != JobState::Pending {
                return Err(ErrorKind::AlreadyStarted);
            }
            let resolved = self
                .requested
                .parse::<Algorithm>()
                .and_then(|algorithm| {
                    if algorithm.is_supported() {
                        Ok(algorithm)
                    } else {
                        Err(ErrorKind::InvalidAlgorithm(self.requested.clone()))
                    }
                });
            match resolved {
                Ok(algorithm) => {
                    inner.algorithm = Some(algorithm);
                    inner.state = JobState::Running;
                    inner.started_at = Some(Utc::now());
                    algorithm
                }
                Err(err) => {
                    drop(inner);
                    warn!("job {}: {}", self.id, err);
                    self.shared.finish(Err(err.clone()));
                    return Err(err);
                }
            }
        };

        sink.set_label(algorithm.label());
        *self.shared.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);

        let shared = Arc::clone(&self.shared);
        let target = self.target.clone();
        let block_size = self.block_size;
        let id = self.id;
        let spawned = thread::Builder::new()
            .name("hash_job".to_string())
            .spawn(move || {
                let path = target.clone();
                run_worker(id, shared, target, move || {
                    file_ops::compute_file_hash_with_block_size(path.as_path(), algorithm, block_size)
                })
            });

        match spawned {
            Ok(handle) => {
                debug!("job {}: {} worker started for {}", self.id, algorithm, self.target);
                self.worker = Some(handle);
                Ok(WorkerHandle {
                    shared: Arc::clone(&self.shared),
                })
            }
            Err(e) => {
                let err = ErrorKind::ThreadSpawnFailure(e.to_string());
                warn!("job {}: {}", self.id, err);
                self.shared.detach_sink();
                self.shared.finish(Err(err.clone()));
                Err(err)
            }
        }
    }

    /// Tears the job down for a closing view.
    ///
    /// The sink is detached first: no delivery starts after this returns,
    /// though one the worker already claimed may still be running.
    /// Unless `cancelled`, waits up to `timeout` for the worker thread to
    /// exit and joins it; a worker still running after that is detached and
    /// finishes on its own. Returns whether the worker was joined.
    pub fn shutdown(&mut self, cancelled: bool, timeout: Duration) -> bool {
        self.shared.detach_sink();
        let Some(handle) = self.worker.take() else {
            return true;
        };

        let wait = if cancelled { Duration::ZERO } else { timeout };
        let deadline = Instant::now() + wait;
        let mut finished = self.shared.wait_until(Some(deadline)).is_some();
        // The outcome is recorded before the sink runs; the thread may still be busy.
        while finished && !handle.is_finished() {
            if Instant::now() >= deadline {
                finished = false;
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }

        if finished {
            if handle.join().is_err() {
                warn!("job {}: worker panicked", self.id);
            }
            true
        } else {
            debug!(
                "job {}: detaching worker still hashing {}",
                self.id, self.target
            );
            false
        }
    }
}

impl Drop for HashJob {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown(true, Duration::ZERO);
        }
    }
}

/// Worker body. A panic in `compute` still ends the job as `Failed`.
fn run_worker<F>(id: JobId, shared: Arc<Shared>, target: FilePathRef, compute: F)
where
    F: FnOnce() -> DigestResult,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(compute))
        .unwrap_or_else(|payload| Err(ErrorKind::WorkerPanic(panic_message(payload.as_ref()))));
    match &outcome {
        Ok(digest) => info!("job {}: {} = {}", id, target, digest),
        Err(err) => warn!("job {}: hashing {} failed: {}", id, target, err),
    }
    shared.finish(outcome.clone());
    shared.notify_sink(&outcome);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ChannelSink, SinkEvent};
    use std::io::Write;

    fn temp_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn new_job_is_pending_and_empty() {
        let job = HashJob::with_algorithm(FilePathRef::new("/nope"), Algorithm::Md5);
        assert_eq!(job.state(), JobState::Pending);
        assert!(job.result().is_none());
        assert!(job.error().is_none());
        assert!(job.outcome().is_none());
    }

    #[test]
    fn unknown_algorithm_fails_before_spawn() {
        let file = temp_file(b"abc");
        let mut job = HashJob::new(FilePathRef::new(file.path()), "crc32");
        let (sink, rx) = ChannelSink::pair();
        let err = job.start(Arc::new(sink)).err().unwrap();
        assert_eq!(err, ErrorKind::InvalidAlgorithm("crc32".to_string()));
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.error(), Some(err));
        assert!(job.worker.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn completes_and_notifies_sink() {
        let file = temp_file(b"abc");
        let mut job = HashJob::with_algorithm(FilePathRef::new(file.path()), Algorithm::Md5);
        let (sink, rx) = ChannelSink::pair();
        let handle = job.start(Arc::new(sink)).unwrap();
        assert_eq!(handle.wait(), Ok("900150983cd24fb0d6963f7d28e17f72".to_string()));
        assert!(handle.is_finished());
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(job.label(), Some("MD5sum:"));
        assert_eq!(rx.try_recv().unwrap(), SinkEvent::Label("MD5sum:".to_string()));
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            SinkEvent::Text("900150983cd24fb0d6963f7d28e17f72".to_string())
        );
        assert!(job.shutdown(false, Duration::from_secs(5)));
    }

    #[test]
    fn second_start_is_rejected() {
        let file = temp_file(b"");
        let mut job = HashJob::with_algorithm(FilePathRef::new(file.path()), Algorithm::Md5);
        let (sink, _rx) = ChannelSink::pair();
        let sink: Arc<dyn ResultSink> = Arc::new(sink);
        let handle = job.start(Arc::clone(&sink)).unwrap();
        assert_eq!(job.start(sink).err(), Some(ErrorKind::AlreadyStarted));
        handle.wait().unwrap();
    }

    #[test]
    fn pending_job_wait_timeout_returns_none() {
        let job = HashJob::with_algorithm(FilePathRef::new("/nope"), Algorithm::Md5);
        let handle = WorkerHandle {
            shared: Arc::clone(&job.shared),
        };
        assert!(handle.wait_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn report_reflects_outcome() {
        let file = temp_file(b"abc");
        let mut job = HashJob::with_algorithm(FilePathRef::new(file.path()), Algorithm::Md5);
        let (sink, _rx) = ChannelSink::pair();
        job.start(Arc::new(sink)).unwrap().wait().unwrap();
        let report = job.report();
        assert_eq!(report.state, JobState::Completed);
        assert_eq!(report.algorithm, Some(Algorithm::Md5));
        assert_eq!(report.requested_algorithm, "MD5");
        assert!(report.started_at.is_some());
        assert!(report.finished_at.is_some());
        assert_eq!(report.id, job.id().to_string());
    }

    #[test]
    fn report_keeps_requested_name_when_unresolved() {
        let mut job = HashJob::new(FilePathRef::new("/nope"), "whirlpool");
        assert_eq!(job.report().algorithm, None);
        let (sink, _rx) = ChannelSink::pair();
        assert!(job.start(Arc::new(sink)).is_err());
        let report = job.report();
        assert_eq!(report.algorithm, None);
        assert_eq!(report.requested_algorithm, "whirlpool");
        assert_eq!(report.state, JobState::Failed);
    }

    #[test]
    fn panicking_worker_still_fails_the_job() {
        let mut job = HashJob::with_algorithm(FilePathRef::new("/nope"), Algorithm::Md5);
        let (sink, rx) = ChannelSink::pair();
        *job.shared.sink.lock().unwrap() = Some(Arc::new(sink));
        job.shared.lock().state = JobState::Running;

        let shared = Arc::clone(&job.shared);
        let target = job.target.clone();
        let id = job.id;
        job.worker = Some(thread::spawn(move || {
            run_worker(id, shared, target, || panic!("read buffer exploded"))
        }));

        let handle = WorkerHandle {
            shared: Arc::clone(&job.shared),
        };
        let err = ErrorKind::WorkerPanic("read buffer exploded".to_string());
        assert_eq!(handle.wait_timeout(Duration::from_secs(5)), Some(Err(err.clone())));
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            SinkEvent::Error(error_text(&err))
        );
        assert!(job.shutdown(false, Duration::from_secs(5)));
    }

    #[test]
    fn oversized_block_size_is_capped() {
        let file = temp_file(b"abc");
        let mut job = HashJob::with_algorithm(FilePathRef::new(file.path()), Algorithm::Md5)
            .with_block_size(usize::MAX);
        assert_eq!(job.block_size, crate::hashers::MAX_BLOCK_SIZE);
        let (sink, _rx) = ChannelSink::pair();
        let handle = job.start(Arc::new(sink)).unwrap();
        assert_eq!(
            handle.wait_timeout(Duration::from_secs(5)),
            Some(Ok("900150983cd24fb0d6963f7d28e17f72".to_string()))
        );
    }
}
