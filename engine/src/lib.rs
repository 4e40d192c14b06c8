//! # MediaCopy Engine - Pausable File Copy Library
//!
//! A headless engine that copies large files one at a time on a background
//! thread while the caller keeps full control over the transfer.
//!
//! ## Overview
//!
//! Each copy overlaps reading and writing with two buffers: a reader thread
//! fills one slot while the engine thread writes the other. A running copy
//! can be paused, resumed, or aborted at any time, and its progress polled
//! from any thread. It features:
//! - Destination preallocation and source mtime preservation
//! - Partial destinations removed on abort
//! - Errors captured per task instead of panicking or returning mid-copy
//! - Batch runs over watermarked folders with a persisted control file
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{CopyEngine, EngineConfig};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = CopyEngine::new(EngineConfig::default())?;
//! let handle = engine.start("/media/in/show.avi", "/media/out/show.avi")?;
//!
//! while !handle.wait_timeout(Duration::from_millis(100)) {
//!     println!("{} / {} bytes", handle.bytes_copied(), handle.length());
//! }
//!
//! if let Some(message) = handle.error_message() {
//!     eprintln!("copy failed: {}", message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **buffer**: The two-slot buffer ring
//! - **copier**: CopyEngine, the per-file copy loop
//! - **task**: Shared task state and the caller's TaskHandle
//! - **fs_ops**: Low-level filesystem operations
//! - **worklist**: Deciding which files still need copying
//! - **control_store**: Persisted folder watermarks
//! - **job**: Batch orchestration (create, plan, run)
//! - **progress**: Observer and callback traits
//! - **config**: Engine and batch settings
//! - **model**: Shared data types
//! - **error**: Error types

pub mod buffer;
pub mod config;
pub mod control_store;
pub mod copier;
pub mod error;
pub mod fs_ops;
pub mod job;
pub mod model;
pub mod progress;
mod reader;
pub mod task;
pub mod worklist;

// Re-export main types and functions
pub use config::{EngineConfig, JobConfig, Settings};
pub use control_store::{advance_watermark, ControlStore, JsonControlStore};
pub use copier::CopyEngine;
pub use error::EngineError;
pub use job::{create_job, plan_job, run_job, CopyJob, JobControl, JobState};
pub use model::{FileOutcome, JobSummary, TransferState, Watermarks, WorkItem};
pub use progress::{BlockObserver, ProgressCallback};
pub use task::TaskHandle;
pub use worklist::{FolderScanner, WorklistProvider};
