//! Per-task shared state and the caller-facing handle.
//!
//! A `CopyTask` is shared between three parties: the engine thread that
//! writes, the reader thread it spawns, and any number of pollers holding a
//! `TaskHandle`. Progress and the error message are written only by the
//! engine thread and read lock-free by everyone else. The state tag sits
//! behind a mutex with a condition variable so pause and abort can wake a
//! blocked engine.

use crate::model::TransferState;
use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Error message recorded when the user aborts and nothing else failed first.
pub const ABORTED_MESSAGE: &str = "aborted";

/// Single-writer byte counter, readable from any thread.
#[derive(Debug, Default)]
pub struct ProgressCounter(AtomicU64);

impl ProgressCounter {
    pub fn new() -> Self {
        ProgressCounter(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Add a written block. Only the engine thread calls this.
    pub(crate) fn advance(&self, bytes: u64) {
        self.0.fetch_add(bytes, Ordering::AcqRel);
    }

    /// Pin the counter to the task length on any terminal path.
    pub(crate) fn finish(&self, length: u64) {
        self.0.store(length, Ordering::Release);
    }
}

/// One-shot error holder; the first message wins.
#[derive(Debug, Default)]
pub struct ErrorCell(OnceLock<String>);

impl ErrorCell {
    pub fn new() -> Self {
        ErrorCell(OnceLock::new())
    }

    /// Store `message` unless a message is already present.
    ///
    /// Returns true if this call set the cell.
    pub(crate) fn set(&self, message: impl Into<String>) -> bool {
        self.0.set(message.into()).is_ok()
    }

    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }
}

/// Shared state of one in-flight transfer.
#[derive(Debug)]
pub(crate) struct CopyTask {
    source: PathBuf,
    destination: PathBuf,
    length: u64,
    source_modified: Option<SystemTime>,
    pub(crate) progress: ProgressCounter,
    pub(crate) error: ErrorCell,
    state: Mutex<TransferState>,
    changed: Condvar,
    done: AtomicBool,
    // Dropped by abort; the disconnect wakes every select! on `cancelled`.
    cancel: Mutex<Option<Sender<()>>>,
    cancelled: Receiver<()>,
}

impl CopyTask {
    pub(crate) fn new(
        source: PathBuf,
        destination: PathBuf,
        length: u64,
        source_modified: Option<SystemTime>,
        initial: TransferState,
    ) -> Self {
        let (cancel, cancelled) = crossbeam_channel::bounded(0);
        CopyTask {
            source,
            destination,
            length,
            source_modified,
            progress: ProgressCounter::new(),
            error: ErrorCell::new(),
            state: Mutex::new(initial),
            changed: Condvar::new(),
            done: AtomicBool::new(false),
            cancel: Mutex::new(Some(cancel)),
            cancelled,
        }
    }

    pub(crate) fn source(&self) -> &Path {
        &self.source
    }

    pub(crate) fn destination(&self) -> &Path {
        &self.destination
    }

    pub(crate) fn length(&self) -> u64 {
        self.length
    }

    pub(crate) fn source_modified(&self) -> Option<SystemTime> {
        self.source_modified
    }

    /// Receiver that disconnects once the task is aborted.
    pub(crate) fn cancelled(&self) -> &Receiver<()> {
        &self.cancelled
    }

    fn lock_state(&self) -> MutexGuard<'_, TransferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> TransferState {
        *self.lock_state()
    }

    pub(crate) fn pause(&self) {
        let mut state = self.lock_state();
        if *state != TransferState::Aborted {
            *state = TransferState::Paused;
            self.changed.notify_all();
        }
    }

    pub(crate) fn resume(&self) {
        let mut state = self.lock_state();
        if *state == TransferState::Paused {
            *state = TransferState::Copying;
            self.changed.notify_all();
        }
    }

    pub(crate) fn abort(&self) {
        {
            let mut state = self.lock_state();
            *state = TransferState::Aborted;
            self.changed.notify_all();
        }
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Block while paused; returns the state that ended the wait.
    pub(crate) fn wait_unpaused(&self) -> TransferState {
        let state = self.lock_state();
        let state = self
            .changed
            .wait_while(state, |s| *s == TransferState::Paused)
            .unwrap_or_else(PoisonError::into_inner);
        *state
    }

    /// Terminal bookkeeping: counter to length, then the done flag.
    pub(crate) fn finish(&self) {
        self.progress.finish(self.length);
        let _state = self.lock_state();
        self.done.store(true, Ordering::Release);
        self.changed.notify_all();
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Wait until done or `timeout` passes. Returns `is_done()`.
    pub(crate) fn wait_done(&self, timeout: Duration) -> bool {
        let state = self.lock_state();
        let _state = self
            .changed
            .wait_timeout_while(state, timeout, |_| !self.is_done())
            .unwrap_or_else(PoisonError::into_inner);
        self.is_done()
    }
}

/// Caller's handle on a running copy.
///
/// Cheap to clone; every clone observes and controls the same transfer.
/// None of the methods block except `wait` and `wait_timeout`.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    task: CopyTask,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskHandle {
    pub(crate) fn new(task: CopyTask) -> Self {
        TaskHandle {
            inner: Arc::new(HandleInner {
                task,
                worker: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn task(&self) -> &CopyTask {
        &self.inner.task
    }

    pub(crate) fn attach_worker(&self, worker: JoinHandle<()>) {
        *self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(worker);
    }

    /// Request a cooperative pause. Ignored once aborted.
    pub fn pause(&self) {
        debug!(destination = %self.destination().display(), "pause requested");
        self.task().pause();
    }

    /// Return from `Paused` to `Copying`. No-op in any other state.
    pub fn resume(&self) {
        debug!(destination = %self.destination().display(), "resume requested");
        self.task().resume();
    }

    /// Abort the transfer. One-way; the partial destination is removed.
    pub fn abort(&self) {
        debug!(destination = %self.destination().display(), "abort requested");
        self.task().abort();
    }

    /// Bytes written so far; equals `length()` once done, whatever the outcome.
    pub fn bytes_copied(&self) -> u64 {
        self.task().progress.get()
    }

    /// True once the engine loop has exited for any reason.
    pub fn is_done(&self) -> bool {
        self.task().is_done()
    }

    /// Failure or abort message; `None` after a clean copy.
    pub fn error_message(&self) -> Option<String> {
        self.task().error.get().map(str::to_owned)
    }

    pub fn state(&self) -> TransferState {
        self.task().state()
    }

    /// Source length captured when the task was started.
    pub fn length(&self) -> u64 {
        self.task().length()
    }

    pub fn source(&self) -> &Path {
        self.task().source()
    }

    pub fn destination(&self) -> &Path {
        self.task().destination()
    }

    /// Block until done or until `timeout` elapses. Returns `is_done()`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.task().wait_done(timeout)
    }

    /// Block until the engine thread has exited.
    pub fn wait(&self) {
        let worker = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                self.task().error.set("copy thread panicked");
                self.task().finish();
            }
        } else {
            // Another clone is joining; fall back to the done signal.
            while !self.task().wait_done(Duration::from_millis(100)) {}
        }
    }
}
