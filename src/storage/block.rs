//! Block Copy
//!
//! Chunked copies of byte ranges, within one store or between two. Each chunk
//! re-seeks before its read and before its write, since source and target
//! may share one cursor.

use std::io;

use super::Storage;

/// Move `len` bytes from `src` down to `dst` inside one store.
///
/// Requires `dst <= src`; copying front to back never overwrites bytes that
/// are still to be read.
pub fn move_block<S: Storage + ?Sized>(
    storage: &mut S,
    src: u64,
    dst: u64,
    len: u64,
    chunk_size: usize,
) -> io::Result<()> {
    debug_assert!(dst <= src, "move_block only shifts data towards the start");
    if len == 0 || src == dst {
        return Ok(());
    }

    let mut buf = vec![0u8; chunk_len(len, chunk_size)];
    let mut copied = 0u64;
    while copied < len {
        let n = chunk_len(len - copied, buf.len());
        storage.read_exact_at(src + copied, &mut buf[..n])?;
        storage.write_all_at(dst + copied, &buf[..n])?;
        copied += n as u64;
    }
    Ok(())
}

/// Copy `len` bytes from `source` at `src` into `target` at `dst`
pub fn copy_block<R: Storage + ?Sized, W: Storage + ?Sized>(
    source: &mut R,
    src: u64,
    target: &mut W,
    dst: u64,
    len: u64,
    chunk_size: usize,
) -> io::Result<()> {
    if len == 0 {
        return Ok(());
    }

    let mut buf = vec![0u8; chunk_len(len, chunk_size)];
    let mut copied = 0u64;
    while copied < len {
        let n = chunk_len(len - copied, buf.len());
        source.read_exact_at(src + copied, &mut buf[..n])?;
        target.write_all_at(dst + copied, &buf[..n])?;
        copied += n as u64;
    }
    Ok(())
}

fn chunk_len(remaining: u64, chunk_size: usize) -> usize {
    remaining.min(chunk_size.max(1) as u64) as usize
}
