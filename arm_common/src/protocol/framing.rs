//! Byte stream → framed records.
//!
//! Records are terminated by [`FRAME_TERMINATOR`]. Line noise (`\r`, `\n`)
//! between records is dropped. A record longer than the configured limit is
//! discarded up to its terminator so that one garbled burst never grows the
//! buffer or poisons the next record.

use heapless::Vec as FixedVec;
use thiserror::Error;

use crate::consts::{FRAME_BUFFER_CAPACITY, FRAME_TERMINATOR};

/// Framing-level failure. The offending bytes are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    #[error("record exceeds {limit} bytes, discarded")]
    Overflow { limit: usize },
}

/// Accumulates transport bytes into complete records.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: FixedVec<u8, FRAME_BUFFER_CAPACITY>,
    max_len: usize,
    /// Dropping bytes until the next terminator.
    discarding: bool,
}

impl FrameAssembler {
    /// `max_len` is capped at [`FRAME_BUFFER_CAPACITY`].
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: FixedVec::new(),
            max_len: max_len.clamp(1, FRAME_BUFFER_CAPACITY),
            discarding: false,
        }
    }

    /// Feed one byte. Returns a completed record (terminator stripped) or
    /// an overflow notice.
    pub fn push(&mut self, byte: u8) -> Option<Result<Vec<u8>, FramingError>> {
        match byte {
            FRAME_TERMINATOR => {
                if self.discarding {
                    self.discarding = false;
                    return None;
                }
                if self.buffer.is_empty() {
                    return None;
                }
                let record = self.buffer.to_vec();
                self.buffer.clear();
                Some(Ok(record))
            }
            b'\r' | b'\n' => None,
            _ if self.discarding => None,
            _ => {
                if self.buffer.len() >= self.max_len || self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.discarding = true;
                    return Some(Err(FramingError::Overflow {
                        limit: self.max_len,
                    }));
                }
                None
            }
        }
    }

    /// Feed a chunk, collecting every event in arrival order.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Result<Vec<u8>, FramingError>> {
        bytes.iter().filter_map(|b| self.push(*b)).collect()
    }

    /// Bytes of the incomplete record held so far.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial record.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }
}
