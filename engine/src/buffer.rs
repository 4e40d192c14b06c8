//! Double-buffer slots.
//!
//! Each copy task owns exactly two slots of fixed capacity. The reader fills
//! one while the engine writes the other; slots are told apart by index
//! parity and never reallocated after the ring is built.

use std::io::{self, Read};

/// Number of slots per task.
pub const SLOT_COUNT: usize = 2;

/// A fixed-capacity buffer plus its fill marker.
#[derive(Debug)]
pub struct BufferSlot {
    index: usize,
    data: Box<[u8]>,
    len: usize,
}

impl BufferSlot {
    fn new(index: usize, capacity: usize) -> Self {
        BufferSlot {
            index,
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Build the two-slot ring for one task.
    pub fn ring(capacity: usize) -> [BufferSlot; SLOT_COUNT] {
        [BufferSlot::new(0, capacity), BufferSlot::new(1, capacity)]
    }

    /// Position in the ring (0 or 1).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid bytes; zero means empty.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_filled(&self) -> bool {
        self.len > 0
    }

    /// The valid bytes of the slot.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Mark the slot empty so it can be refilled.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Fill the slot from `input`, reading until it is full or input ends.
    ///
    /// Returns the number of bytes now held; zero means end of input.
    /// Interrupted reads are retried.
    pub fn fill_from<R: Read>(&mut self, input: &mut R) -> io::Result<usize> {
        self.len = 0;
        while self.len < self.data.len() {
            match input.read(&mut self.data[self.len..]) {
                Ok(0) => break,
                Ok(n) => self.len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.len = 0;
                    return Err(e);
                }
            }
        }
        Ok(self.len)
    }
}
