//! Owned in-memory backend.
//!
//! [`Memory`] holds a document handed over by the caller, usually a file read into memory or
//! bytes assembled by a test. Every [`super::BitStream`] window cut from it, sub-streams
//! included, shares the one buffer.

use super::Backend;
use crate::{
    Error::{Empty, OutOfBounds},
    Result,
};

/// A document held in memory
#[derive(Debug)]
pub struct Memory {
    data: Box<[u8]>,
}

impl Memory {
    /// Take ownership of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for an empty buffer; a stream without bits has no root.
    pub fn new(data: Vec<u8>) -> Result<Memory> {
        if data.is_empty() {
            return Err(Empty);
        }

        Ok(Memory {
            data: data.into_boxed_slice(),
        })
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(OutOfBounds)
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
