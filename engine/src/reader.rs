//! Background reader.
//!
//! The reader owns the source file handle. It takes an empty slot, fills it,
//! and hands it to the engine over a zero-capacity channel, so it can never
//! run more than one filled slot ahead of the writer. Emptied slots come
//! back over a second channel in the order they were consumed, which keeps
//! the two slots strictly alternating.

use crate::buffer::BufferSlot;
use crossbeam_channel::{select, Receiver, Sender, TryRecvError};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::debug;

/// What the reader passes to the engine at each handoff.
#[derive(Debug)]
pub(crate) enum Handoff {
    /// A filled slot, to be written and returned
    Block(BufferSlot),
    /// The source is exhausted
    EndOfInput,
    /// Opening or reading the source failed
    Failed(io::Error),
}

/// Reader half of one copy task.
pub(crate) struct Reader {
    source: PathBuf,
    limit: u64,
    empty: Receiver<BufferSlot>,
    filled: Sender<Handoff>,
    cancelled: Receiver<()>,
}

impl Reader {
    /// `limit` caps the bytes read at the length captured when the task
    /// started; `cancelled` disconnects when the task is aborted.
    pub(crate) fn new(
        source: PathBuf,
        limit: u64,
        empty: Receiver<BufferSlot>,
        filled: Sender<Handoff>,
        cancelled: Receiver<()>,
    ) -> Self {
        Reader {
            source,
            limit,
            empty,
            filled,
            cancelled,
        }
    }

    /// Read the source to the end, to the first error, or until stopped.
    ///
    /// Stops without further reads when the task is aborted or when the
    /// engine drops its end of either channel.
    pub(crate) fn run(self) {
        let file = match File::open(&self.source) {
            Ok(file) => file,
            Err(e) => {
                self.hand_off(Handoff::Failed(e));
                return;
            }
        };
        let mut input = file.take(self.limit);

        loop {
            let Some(mut slot) = self.next_empty() else {
                return;
            };
            if self.is_cancelled() {
                return;
            }

            let handoff = match slot.fill_from(&mut input) {
                Ok(0) => Handoff::EndOfInput,
                Ok(n) => {
                    debug!(slot = slot.index(), bytes = n, "slot filled");
                    Handoff::Block(slot)
                }
                Err(e) => Handoff::Failed(e),
            };

            let more = matches!(handoff, Handoff::Block(_));
            if !self.hand_off(handoff) || !more {
                return;
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        matches!(self.cancelled.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Wait for the engine to release a slot.
    fn next_empty(&self) -> Option<BufferSlot> {
        if self.is_cancelled() {
            return None;
        }
        select! {
            recv(self.empty) -> slot => slot.ok(),
            recv(self.cancelled) -> _ => None,
        }
    }

    /// Block until the engine takes `handoff`. False if it never will.
    fn hand_off(&self, handoff: Handoff) -> bool {
        select! {
            send(self.filled, handoff) -> sent => sent.is_ok(),
            recv(self.cancelled) -> _ => false,
        }
    }
}
