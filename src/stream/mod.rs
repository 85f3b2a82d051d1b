//! Bit-addressed input streams.
//!
//! Every field in a parsed tree is located by a bit address, and grammars constantly seek forward
//! and backward while they visit offset tables. This module provides the read substrate for that:
//! a [`Backend`] holding the raw bytes and a [`BitStream`] window over it that supports reads of
//! any bit length at any alignment.
//!
//! # Key Components
//!
//! - [`Backend`] - Trait for data sources (memory buffers, memory-mapped files)
//! - [`Memory`] - In-memory buffer backend
//! - [`Physical`] - Memory-mapped file backend
//! - [`BitStream`] - A bounded, re-based window over a backend
//! - [`Endian`] - Bit and byte order used to interpret multi-bit reads
//!
//! # Bit Order
//!
//! A big endian stream reads the most significant bit of every byte first, so a run of bit-fields
//! is consumed from the top of the byte downwards. A little endian stream reads the least
//! significant bit first. Byte-aligned integers decode exactly as their byte order suggests in
//! both cases.
//!
//! # Examples
//!
//! ```rust
//! use fieldscope::stream::{BitStream, Endian};
//!
//! let stream = BitStream::from_mem(vec![0b1010_0000, 0x12, 0x34])?;
//! assert_eq!(stream.len_bits(), 24);
//! assert_eq!(stream.read_bits(0, 3, Endian::Big)?, 0b101);
//! assert_eq!(stream.read_bits(8, 16, Endian::Big)?, 0x1234);
//! assert_eq!(stream.read_bits(8, 16, Endian::Little)?, 0x3412);
//!
//! let window = stream.sub_stream(8, 16)?;
//! assert_eq!(window.read_bits(0, 8, Endian::Big)?, 0x12);
//! # Ok::<(), fieldscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Backends are `Send + Sync` and a [`BitStream`] only holds an [`Arc`] to one plus its window,
//! so windows can be handed to independent decoders on other threads.

mod memory;
mod physical;

use std::{borrow::Cow, fmt, path::Path, sync::Arc};

use crate::{Error::OutOfBounds, Result};

pub use memory::Memory;
pub use physical::Physical;

/// Backend trait for stream data sources.
///
/// This trait abstracts over the source of the raw bytes, allowing for both in-memory and on-disk
/// representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// Bit and byte order of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Most significant byte and bit first
    Big,
    /// Least significant byte and bit first
    Little,
}

/// A bounded window over a [`Backend`], addressed in bits.
///
/// The window starts at bit 0 no matter where it sits in the underlying data; this is what makes
/// [`BitStream::sub_stream`] views safe to hand to unrelated decoders. The length of a stream is
/// always known.
#[derive(Clone)]
pub struct BitStream {
    backend: Arc<dyn Backend>,
    start: u64,
    size: u64,
}

impl BitStream {
    /// Create a stream covering the whole of a backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let size = (backend.len() as u64).saturating_mul(8);
        BitStream {
            backend,
            start: 0,
            size,
        }
    }

    /// Create a stream over an owned buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if `data` is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<Self> {
        Ok(Self::new(Arc::new(Memory::new(data)?)))
    }

    /// Create a stream over a memory-mapped file.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped and
    /// [`crate::Error::Empty`] if it holds no data.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(Arc::new(Physical::new(path)?)))
    }

    /// Total size of the window in bits
    pub fn len_bits(&self) -> u64 {
        self.size
    }

    /// Total size of the window in whole bytes
    pub fn len_bytes(&self) -> u64 {
        self.size / 8
    }

    /// Returns true if the window holds no data
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn check(&self, address: u64, nbits: u64) -> Result<u64> {
        match address.checked_add(nbits) {
            Some(end) if end <= self.size => Ok(self.start + address),
            _ => Err(OutOfBounds),
        }
    }

    /// Read `nbits` bits at the bit `address` and return them as an unsigned integer.
    ///
    /// `nbits` may be anything from 0 to 64 and `address` does not need to be byte aligned.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read would leave the window or `nbits`
    /// exceeds 64.
    pub fn read_bits(&self, address: u64, nbits: u32, endian: Endian) -> Result<u64> {
        if nbits > 64 {
            return Err(OutOfBounds);
        }
        if nbits == 0 {
            return Ok(0);
        }

        let absolute = self.check(address, u64::from(nbits))?;
        let first = usize::try_from(absolute / 8).map_err(|_| OutOfBounds)?;
        let last = usize::try_from((absolute + u64::from(nbits) - 1) / 8).map_err(|_| OutOfBounds)?;
        let bytes = self.backend.data_slice(first, last - first + 1)?;
        let skip = (absolute % 8) as u32;
        let mask = if nbits == 64 {
            u128::from(u64::MAX)
        } else {
            (1u128 << nbits) - 1
        };

        let value = match endian {
            Endian::Big => {
                let acc = bytes
                    .iter()
                    .fold(0u128, |acc, &byte| (acc << 8) | u128::from(byte));
                let total = (bytes.len() as u32) * 8;
                (acc >> (total - skip - nbits)) & mask
            }
            Endian::Little => {
                let acc = bytes
                    .iter()
                    .rev()
                    .fold(0u128, |acc, &byte| (acc << 8) | u128::from(byte));
                (acc >> skip) & mask
            }
        };

        Ok(value as u64)
    }

    /// Read a `bytes` wide integer at the bit `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read would leave the window.
    pub fn read_integer(&self, address: u64, bytes: u32, endian: Endian) -> Result<u64> {
        self.read_bits(address, bytes * 8, endian)
    }

    /// Read `len` bytes starting at the bit `address`.
    ///
    /// Byte-aligned reads borrow directly from the backend, unaligned reads are assembled into an
    /// owned buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read would leave the window.
    pub fn read_bytes(&self, address: u64, len: u64) -> Result<Cow<'_, [u8]>> {
        let nbits = len.checked_mul(8).ok_or(OutOfBounds)?;
        let absolute = self.check(address, nbits)?;
        let count = usize::try_from(len).map_err(|_| OutOfBounds)?;

        if absolute % 8 == 0 {
            let offset = usize::try_from(absolute / 8).map_err(|_| OutOfBounds)?;
            return Ok(Cow::Borrowed(self.backend.data_slice(offset, count)?));
        }

        let mut buffer = Vec::with_capacity(count);
        for index in 0..len {
            buffer.push(self.read_bits(address + index * 8, 8, Endian::Big)? as u8);
        }
        Ok(Cow::Owned(buffer))
    }

    /// Read `nbits` bits as a byte buffer; a trailing partial byte is left aligned.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read would leave the window.
    pub fn read_raw(&self, address: u64, nbits: u64) -> Result<Vec<u8>> {
        let whole = nbits / 8;
        let rest = (nbits % 8) as u32;
        let mut buffer = self.read_bytes(address, whole)?.into_owned();
        if rest != 0 {
            let tail = self.read_bits(address + whole * 8, rest, Endian::Big)?;
            buffer.push((tail << (8 - rest)) as u8);
        }
        Ok(buffer)
    }

    /// Returns true if every bit in the range is zero.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves the window.
    pub fn is_zero(&self, address: u64, nbits: u64) -> Result<bool> {
        self.check(address, nbits)?;
        if address % 8 == 0 {
            let bytes = self.read_bytes(address, nbits / 8)?;
            if bytes.iter().any(|&byte| byte != 0) {
                return Ok(false);
            }
            let rest = (nbits % 8) as u32;
            return Ok(rest == 0
                || self.read_bits(address + nbits - u64::from(rest), rest, Endian::Big)? == 0);
        }

        let mut position = 0;
        while position < nbits {
            let chunk = (nbits - position).min(64) as u32;
            if self.read_bits(address + position, chunk, Endian::Big)? != 0 {
                return Ok(false);
            }
            position += u64::from(chunk);
        }
        Ok(true)
    }

    /// Create a window of `size` bits starting at the bit `start` of this stream.
    ///
    /// The new stream shares the backend and is addressed from 0.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the window exceeds this stream.
    pub fn sub_stream(&self, start: u64, size: u64) -> Result<BitStream> {
        let absolute = self.check(start, size)?;
        Ok(BitStream {
            backend: Arc::clone(&self.backend),
            start: absolute,
            size,
        })
    }
}

impl fmt::Debug for BitStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitStream")
            .field("start", &self.start)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(data: &[u8]) -> BitStream {
        BitStream::from_mem(data.to_vec()).unwrap()
    }

    #[test]
    fn read_aligned_integers() {
        let s = stream(&[0x12, 0x34, 0x56, 0x78, 0x9A]);
        assert_eq!(s.read_bits(0, 8, Endian::Big).unwrap(), 0x12);
        assert_eq!(s.read_bits(0, 16, Endian::Big).unwrap(), 0x1234);
        assert_eq!(s.read_bits(0, 16, Endian::Little).unwrap(), 0x3412);
        assert_eq!(s.read_bits(8, 24, Endian::Big).unwrap(), 0x34_5678);
        assert_eq!(s.read_integer(8, 4, Endian::Big).unwrap(), 0x3456_789A);
        assert_eq!(s.read_integer(8, 4, Endian::Little).unwrap(), 0x9A78_5634);
    }

    #[test]
    fn read_unaligned_bits() {
        let s = stream(&[0b1011_0010, 0b0111_1111]);
        assert_eq!(s.read_bits(0, 1, Endian::Big).unwrap(), 1);
        assert_eq!(s.read_bits(1, 1, Endian::Big).unwrap(), 0);
        assert_eq!(s.read_bits(0, 4, Endian::Big).unwrap(), 0b1011);
        assert_eq!(s.read_bits(4, 8, Endian::Big).unwrap(), 0b0010_0111);
        assert_eq!(s.read_bits(0, 1, Endian::Little).unwrap(), 0);
        assert_eq!(s.read_bits(1, 1, Endian::Little).unwrap(), 1);
        assert_eq!(s.read_bits(4, 4, Endian::Little).unwrap(), 0b1011);
    }

    #[test]
    fn read_full_width() {
        let s = stream(&[0xFF; 9]);
        assert_eq!(s.read_bits(0, 64, Endian::Big).unwrap(), u64::MAX);
        assert_eq!(s.read_bits(3, 64, Endian::Big).unwrap(), u64::MAX);
        assert_eq!(s.read_bits(3, 64, Endian::Little).unwrap(), u64::MAX);
        assert!(s.read_bits(0, 65, Endian::Big).is_err());
    }

    #[test]
    fn read_out_of_bounds() {
        let s = stream(&[0x00, 0x01]);
        assert!(matches!(s.read_bits(9, 8, Endian::Big), Err(OutOfBounds)));
        assert!(matches!(s.read_bits(u64::MAX, 8, Endian::Big), Err(OutOfBounds)));
        assert!(s.read_bytes(1, 2).is_err());
        assert_eq!(s.read_bits(16, 0, Endian::Big).unwrap(), 0);
    }

    #[test]
    fn read_bytes_borrowed_and_owned() {
        let s = stream(&[0xAB, 0xCD, 0xEF]);
        let aligned = s.read_bytes(8, 2).unwrap();
        assert!(matches!(aligned, Cow::Borrowed(_)));
        assert_eq!(&*aligned, &[0xCD, 0xEF]);

        let unaligned = s.read_bytes(4, 2).unwrap();
        assert!(matches!(unaligned, Cow::Owned(_)));
        assert_eq!(&*unaligned, &[0xBC, 0xDE]);

        assert_eq!(s.read_raw(0, 12).unwrap(), vec![0xAB, 0xC0]);
    }

    #[test]
    fn zero_detection() {
        let s = stream(&[0x00, 0x00, 0x01, 0x00]);
        assert!(s.is_zero(0, 16).unwrap());
        assert!(s.is_zero(0, 23).unwrap());
        assert!(!s.is_zero(0, 24).unwrap());
        assert!(s.is_zero(24, 8).unwrap());
        assert!(!s.is_zero(3, 21).unwrap());
        assert!(s.is_zero(3, 20).unwrap());
    }

    #[test]
    fn sub_stream_is_rebased() {
        let s = stream(&[0x01, 0x02, 0x03, 0x04]);
        let window = s.sub_stream(8, 16).unwrap();
        assert_eq!(window.len_bits(), 16);
        assert_eq!(window.read_bits(0, 8, Endian::Big).unwrap(), 0x02);
        assert_eq!(window.read_bits(8, 8, Endian::Big).unwrap(), 0x03);
        assert!(window.read_bits(16, 8, Endian::Big).is_err());

        let nested = window.sub_stream(8, 8).unwrap();
        assert_eq!(nested.read_bits(0, 8, Endian::Big).unwrap(), 0x03);
        assert!(s.sub_stream(24, 16).is_err());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(BitStream::from_mem(vec![]), Err(crate::Error::Empty)));
    }
}
