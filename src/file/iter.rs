//! Frame Iterator
//!
//! Lazy, forward-only sequence over one or more index ranges of the frame
//! region. Frames are read in batches and decoded one at a time.

use std::collections::VecDeque;
use std::ops::Range;

use crate::error::Result;
use crate::schema::Frame;
use crate::storage::Storage;

use super::FwobFile;

/// Iterator over query results.
///
/// Holds the file's only mutable borrow, so no other query can move the
/// cursor while it is alive.
pub struct Frames<'a, F: Frame, S: Storage> {
    file: &'a mut FwobFile<F, S>,
    /// Ranges not yet read
    ranges: VecDeque<Range<u64>>,
    /// Bytes of the current batch
    batch: Vec<u8>,
    /// Offset of the next undecoded frame in `batch`
    offset: usize,
    /// Frames left, including the undecoded part of `batch`
    remaining: u64,
    /// Stop after the first error
    failed: bool,
}

impl<'a, F: Frame, S: Storage> Frames<'a, F, S> {
    pub(super) fn new(file: &'a mut FwobFile<F, S>, ranges: Vec<Range<u64>>) -> Self {
        let ranges: VecDeque<_> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
        let remaining = ranges.iter().map(|r| r.end - r.start).sum();
        Self {
            file,
            ranges,
            batch: Vec::new(),
            offset: 0,
            remaining,
            failed: false,
        }
    }

    /// Number of frames not yet yielded
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read the next batch; `Ok(false)` when every range is exhausted
    fn fill(&mut self) -> Result<bool> {
        let Some(range) = self.ranges.front_mut() else {
            return Ok(false);
        };

        let batch = self.file.config.read_batch_frames as u64;
        let n = batch.min(range.end - range.start);
        let start = range.start;
        range.start += n;
        if range.is_empty() {
            self.ranges.pop_front();
        }

        self.batch = self.file.read_frame_bytes(start, n)?;
        self.offset = 0;
        Ok(true)
    }
}

impl<'a, F: Frame, S: Storage> Iterator for Frames<'a, F, S> {
    type Item = Result<F>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if self.offset >= self.batch.len() {
            match self.fill() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }

        let frame_length = self.file.codec.frame_length();
        let bytes = &self.batch[self.offset..self.offset + frame_length];
        self.offset += frame_length;
        self.remaining -= 1;

        let result = self.file.codec.decode(bytes);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}
