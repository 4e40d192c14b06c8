//! Core data model.
//!
//! This module defines the plain data shared between the copy core and its
//! collaborators:
//! - TransferState: the per-task state tag driven by pause/resume/abort
//! - WorkItem: one pending file produced by the worklist
//! - Watermarks: per-folder "already copied up to" times from the control file
//! - FileOutcome / JobSummary: results of a batch of copies

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Per-folder newest-processed modification time, keyed by folder name.
pub type Watermarks = BTreeMap<String, DateTime<Utc>>;

/// State tag of a single copy task.
///
/// `Copying` and `Paused` flip back and forth; `Aborted` is terminal.
/// Completion is not a state: a task is done when its loop has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Bytes are moving (initial state)
    Copying,
    /// Cooperative pause; the loop blocks at its next checkpoint
    Paused,
    /// User abort; the partial destination is removed
    Aborted,
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferState::Copying => write!(f, "Copying"),
            TransferState::Paused => write!(f, "Paused"),
            TransferState::Aborted => write!(f, "Aborted"),
        }
    }
}

/// A single file waiting to be copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Path relative to both roots, `/`-separated (`folder/name.ext`)
    pub relative_path: String,

    /// Source length in bytes at scan time
    pub length: u64,

    /// Source modification time at scan time
    pub modified: SystemTime,
}

impl WorkItem {
    /// The folder part of the relative path, if any.
    pub fn folder(&self) -> Option<&str> {
        self.relative_path
            .rfind('/')
            .map(|slash| &self.relative_path[..slash])
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = if self.length == 1 { "byte" } else { "bytes" };
        write!(f, "{} ({} {})", self.relative_path, self.length, unit)
    }
}

/// How a single file of a batch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Copied completely; destination mtime matches the source
    Copied,
    /// Aborted by the user; destination removed
    Skipped,
    /// I/O failure or pre-flight rejection, with the captured message
    Failed(String),
}

impl FileOutcome {
    /// Whether the folder watermark may move past this file.
    pub fn advances_watermark(&self) -> bool {
        matches!(self, FileOutcome::Copied | FileOutcome::Skipped)
    }
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub total_files: usize,
    pub copied_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub total_bytes: u64,
    /// Bytes of files that completed cleanly
    pub bytes_copied: u64,
    /// (relative path, message) for every failed file
    pub failed_items: Vec<(String, String)>,
    /// True if the batch ended early through `JobControl::stop`
    pub stopped: bool,
}

impl JobSummary {
    /// Record the outcome of one file.
    pub fn record(&mut self, item: &WorkItem, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Copied => {
                self.copied_count += 1;
                self.bytes_copied += item.length;
            }
            FileOutcome::Skipped => self.skipped_count += 1,
            FileOutcome::Failed(message) => {
                self.failed_count += 1;
                self.failed_items
                    .push((item.relative_path.clone(), message.clone()));
            }
        }
    }
}
