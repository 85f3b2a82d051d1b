//! Memory-mapped file backend.
//!
//! [`Physical`] maps a document read-only into the address space of the process, so grammars that
//! jump around an offset table only page in the parts of the file they actually touch.

use std::{fs, path::Path};

use memmap2::Mmap;

use super::Backend;
use crate::{
    Error::{Empty, Error, OutOfBounds},
    Result,
};

/// A document mapped from disk
///
/// The mapping is read-only. Truncating the file from another process while it is mapped is not
/// guarded against.
#[derive(Debug)]
pub struct Physical {
    map: Mmap,
}

impl Physical {
    /// Map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, [`crate::Error::Empty`]
    /// if it holds no data and [`crate::Error::Error`] if it cannot be mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(Empty);
        }

        // SAFETY: the map is only ever read through shared slices
        let map = unsafe { Mmap::map(&file) }.map_err(|error| Error(error.to_string()))?;
        Ok(Physical { map })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.map.get(offset..end))
            .ok_or(OutOfBounds)
    }

    fn data(&self) -> &[u8] {
        &self.map
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{
        stream::{BitStream, Endian},
        Error::FileError,
    };

    fn document(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn mapped_document() {
        let file = document(&[0x00, 0x01, 0x00, 0x00, 0xAA, 0xBB]);
        let physical = Physical::new(file.path()).unwrap();
        assert_eq!(physical.len(), 6);
        assert_eq!(physical.data_slice(4, 2).unwrap(), [0xAA, 0xBB]);
        assert!(matches!(physical.data_slice(5, 2), Err(OutOfBounds)));

        let stream = BitStream::from_file(file.path()).unwrap();
        assert_eq!(stream.len_bits(), 48);
        assert_eq!(stream.read_integer(0, 4, Endian::Big).unwrap(), 0x0001_0000);
        assert_eq!(stream.read_bits(36, 8, Endian::Big).unwrap(), 0xAB);
    }

    #[test]
    fn empty_and_missing_files() {
        let empty = document(&[]);
        assert!(matches!(Physical::new(empty.path()), Err(Empty)));
        assert!(matches!(BitStream::from_file(empty.path()), Err(Empty)));

        let missing = Physical::new("this/file/does/not/exist.ttf");
        assert!(matches!(missing, Err(FileError(_))));
    }
}
