//! The copy engine.
//!
//! `CopyEngine::start` runs the pre-flight checks on the caller's thread and
//! then hands the transfer to a dedicated engine thread. That thread
//! preallocates the destination, spawns a scoped reader thread, and writes
//! blocks in the order the reader produces them. Whatever ends the loop
//! (end of input, an I/O failure, or an abort) the thread runs the same
//! terminal step: clean up or stamp the destination, pin the byte counter to
//! the task length, and mark the task done.
//!
//! Failures after `start` returns are never raised to the caller; they are
//! recorded in the task and read back through the `TaskHandle`.

use crate::buffer::{BufferSlot, SLOT_COUNT};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fs_ops;
use crate::model::TransferState;
use crate::progress::BlockObserver;
use crate::reader::{Handoff, Reader};
use crate::task::{CopyTask, TaskHandle, ABORTED_MESSAGE};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Starts and runs copy tasks. Reusable: every `start` gets its own task.
#[derive(Clone)]
pub struct CopyEngine {
    config: EngineConfig,
    observer: Option<Arc<dyn BlockObserver>>,
}

impl fmt::Debug for CopyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyEngine")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl CopyEngine {
    /// Create an engine.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the buffer size is zero.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(CopyEngine {
            config,
            observer: None,
        })
    }

    /// Attach an observer notified after every written block.
    pub fn with_observer(mut self, observer: Arc<dyn BlockObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start copying `source` to `destination`.
    ///
    /// # Errors
    /// Returns `DestinationExists` if anything is already at `destination`;
    /// in that case nothing is created or modified and no thread is spawned.
    /// Returns `SourceNotFound`, `SourceAccessDenied` or `InvalidPath` if
    /// the source can't be measured, and `Spawn` if the engine thread can't
    /// be started.
    pub fn start<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
    ) -> Result<TaskHandle, EngineError> {
        self.spawn(source.as_ref(), destination.as_ref(), TransferState::Copying)
    }

    /// Like `start`, but the task begins paused: the destination is
    /// preallocated and no data moves until `resume`.
    pub fn start_paused<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
    ) -> Result<TaskHandle, EngineError> {
        self.spawn(source.as_ref(), destination.as_ref(), TransferState::Paused)
    }

    fn spawn(
        &self,
        source: &Path,
        destination: &Path,
        initial: TransferState,
    ) -> Result<TaskHandle, EngineError> {
        // symlink_metadata so a dangling link still counts as "exists"
        if fs::symlink_metadata(destination).is_ok() {
            return Err(EngineError::DestinationExists {
                path: destination.to_path_buf(),
            });
        }

        let metadata = fs::metadata(source).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                EngineError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                EngineError::SourceAccessDenied {
                    path: source.to_path_buf(),
                    source: e,
                }
            }
        })?;
        if !metadata.is_file() {
            return Err(EngineError::InvalidPath {
                path: source.to_path_buf(),
                reason: "Source must be a regular file".to_string(),
            });
        }

        let task = CopyTask::new(
            source.to_path_buf(),
            destination.to_path_buf(),
            metadata.len(),
            metadata.modified().ok(),
            initial,
        );
        let handle = TaskHandle::new(task);

        let worker = {
            let engine = self.clone();
            let handle = handle.clone();
            thread::Builder::new()
                .name("copy".to_string())
                .spawn(move || engine.run(&handle))
                .map_err(EngineError::Spawn)?
        };
        handle.attach_worker(worker);

        info!(
            source = %source.display(),
            destination = %destination.display(),
            length = metadata.len(),
            paused = initial == TransferState::Paused,
            "copy started"
        );
        Ok(handle)
    }

    /// Body of the engine thread.
    fn run(&self, handle: &TaskHandle) {
        let task = handle.task();
        let mut destination: Option<File> = None;

        let result = prepare(task).and_then(|file| {
            let file = destination.insert(file);
            panic::catch_unwind(AssertUnwindSafe(|| self.transfer(handle, file))).unwrap_or_else(
                |_| Err(io::Error::new(io::ErrorKind::Other, "copy thread panicked")),
            )
        });

        if let Err(e) = result {
            warn!(destination = %task.destination().display(), error = %e, "copy failed");
            task.error.set(e.to_string());
        }

        if task.state() == TransferState::Aborted {
            if let Some(file) = destination.take() {
                fs_ops::discard_partial(file, task.destination());
            }
            task.error.set(ABORTED_MESSAGE);
        } else {
            // Close before stamping the mtime so no later write can move it.
            drop(destination.take());
            if task.error.get().is_none() {
                if let Some(modified) = task.source_modified() {
                    if let Err(e) = fs_ops::copy_modified_time(task.destination(), modified) {
                        warn!(destination = %task.destination().display(), error = %e, "failed to copy modification time");
                    }
                }
            }
        }

        let copied = task.progress.get();
        task.finish();
        info!(
            destination = %task.destination().display(),
            bytes = copied,
            error = task.error.get().unwrap_or("none"),
            "copy finished"
        );
    }

    /// Run the reader and the write loop until either side stops.
    fn transfer(&self, handle: &TaskHandle, out: &mut File) -> io::Result<()> {
        let task = handle.task();
        let (empty_tx, empty_rx) = bounded(SLOT_COUNT);
        let (filled_tx, filled_rx) = bounded(0);
        for slot in BufferSlot::ring(self.config.buffer_size) {
            // Capacity matches the ring, so this never blocks or fails.
            let _ = empty_tx.send(slot);
        }

        let reader = Reader::new(
            task.source().to_path_buf(),
            task.length(),
            empty_rx,
            filled_tx,
            task.cancelled().clone(),
        );

        // The scope joins the reader before returning, so no reader outlives
        // its task. `pump` owns the engine's channel ends and drops them on
        // return, which unblocks a reader still waiting on either channel.
        thread::scope(|scope| {
            thread::Builder::new()
                .name("read".to_string())
                .spawn_scoped(scope, move || reader.run())?;
            self.pump(handle, out, filled_rx, empty_tx)
        })
    }

    /// Consume filled slots in order and write them to `out`.
    fn pump(
        &self,
        handle: &TaskHandle,
        out: &mut File,
        filled: Receiver<Handoff>,
        empty: Sender<BufferSlot>,
    ) -> io::Result<()> {
        let task = handle.task();
        let cancelled = task.cancelled();
        let mut block_index = 0u64;

        loop {
            if task.wait_unpaused() == TransferState::Aborted {
                break;
            }

            let handoff = select! {
                recv(filled) -> handoff => Some(handoff.unwrap_or_else(|_| {
                    Handoff::Failed(io::Error::new(io::ErrorKind::Other, "reader stopped unexpectedly"))
                })),
                recv(cancelled) -> _ => None,
            };
            let mut slot = match handoff {
                Some(Handoff::Block(slot)) => slot,
                Some(Handoff::EndOfInput) => {
                    let written = task.progress.get();
                    if written < task.length() {
                        // Drop the preallocated tail so only real data remains.
                        out.set_len(written)?;
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("source shrank from {} to {} bytes", task.length(), written),
                        ));
                    }
                    break;
                }
                None => break,
                Some(Handoff::Failed(e)) => return Err(e),
            };

            // Second checkpoint: a pause or abort issued during the read
            // takes effect before this block is written.
            if task.wait_unpaused() == TransferState::Aborted {
                break;
            }

            out.write_all(slot.filled())?;
            let written = slot.len();
            task.progress.advance(written as u64);
            debug!(block = block_index, slot = slot.index(), bytes = written, "block written");

            if let Some(observer) = &self.observer {
                observer.on_block_written(handle, block_index, written);
            }
            block_index += 1;

            slot.clear();
            // The reader is gone after its last block; the next recv says why.
            let _ = empty.send(slot);
        }

        Ok(())
    }
}

/// Create parent directories and the preallocated destination.
fn prepare(task: &CopyTask) -> io::Result<File> {
    fs_ops::ensure_parent_dir_exists(task.destination())?;
    fs_ops::create_preallocated(task.destination(), task.length())
}
