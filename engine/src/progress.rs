//! Progress reporting traits.
//!
//! Progress is primarily polled: `TaskHandle::bytes_copied` can be read from
//! any thread at any time. The traits here are push-style complements:
//! - `BlockObserver` is told about every block the engine writes
//! - `ProgressCallback` follows a whole batch driven by `run_job`

use crate::job::CopyJob;
use crate::model::{FileOutcome, JobSummary};
use crate::task::TaskHandle;

/// Receives a notification after each block is written and counted.
///
/// Called on the engine thread with no locks held. The copy does not
/// continue until the call returns, so implementations should be quick.
pub trait BlockObserver: Send + Sync {
    /// `block_index` counts from zero; `block_len` is the size just written.
    fn on_block_written(&self, handle: &TaskHandle, block_index: u64, block_len: usize);
}

/// Trait for receiving progress updates from a batch of copies.
///
/// All methods are called synchronously on the thread running `run_job`.
pub trait ProgressCallback {
    /// Called once before the first file starts.
    fn on_job_started(&self, job: &CopyJob);

    /// Called when a file's copy task has been started.
    fn on_file_started(&self, job: &CopyJob, file_index: usize);

    /// Called at every poll while a file is copying.
    ///
    /// `bytes_total` includes all files before this one.
    fn on_file_progress(&self, job: &CopyJob, file_index: usize, bytes_this_file: u64, bytes_total: u64);

    /// Called when a file is done (copied, skipped, or failed).
    fn on_file_completed(&self, job: &CopyJob, file_index: usize, outcome: &FileOutcome);

    /// Called after the last file, once watermarks have been saved.
    fn on_job_completed(&self, job: &CopyJob, summary: &JobSummary);
}
