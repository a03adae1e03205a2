//! Storage Module
//!
//! Byte-addressable backing store for FWOB files.
//!
//! ## Responsibilities
//! - Positional reads and writes (every access states its absolute offset)
//! - Truncation and flushing
//! - Chunked block copies for compaction, split and concatenation
//!
//! Implemented for `std::fs::File` and for `Cursor<Vec<u8>>`, which holds the
//! exact same bytes in memory.

mod block;

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

pub use block::{copy_block, move_block};

/// A seekable, truncatable byte store
pub trait Storage: Read + Write + Seek {
    /// Current physical length in bytes
    fn len(&mut self) -> io::Result<u64>;

    /// Grow (zero-filled) or shrink to `len` bytes
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Flush buffered writes through to the medium
    fn sync(&mut self) -> io::Result<()>;

    fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Read exactly `buf.len()` bytes starting at `position`
    fn read_exact_at(&mut self, position: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(position))?;
        self.read_exact(buf)
    }

    /// Write all of `buf` starting at `position`
    fn write_all_at(&mut self, position: u64, buf: &[u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(position))?;
        self.write_all(buf)
    }
}

impl Storage for File {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl Storage for Cursor<Vec<u8>> {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds memory"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}
