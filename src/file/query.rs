//! Query Engine
//!
//! Binary-search bound finding over the ordered frame array, and the point
//! and range accessors built on it. Keys are read straight from their byte
//! offset; frames are never fully decoded during a search.

use std::ops::Range;

use tracing::trace;

use crate::error::{FwobError, Result};
use crate::format::{FrameCodec, Header};
use crate::schema::Frame;
use crate::storage::Storage;

use super::{readable, FwobFile, Frames};

/// Bound searches over the frame region of one store
pub(crate) struct Searcher<'a, F: Frame, S: Storage + ?Sized> {
    storage: &'a mut S,
    codec: &'a FrameCodec<F>,
    first_frame_position: u64,
    frame_length: u64,
}

impl<'a, F: Frame, S: Storage + ?Sized> Searcher<'a, F, S> {
    pub(crate) fn new(storage: &'a mut S, codec: &'a FrameCodec<F>, header: &Header) -> Self {
        Self {
            storage,
            codec,
            first_frame_position: header.first_frame_position(),
            frame_length: u64::from(header.frame_length),
        }
    }

    pub(crate) fn key_at(&mut self, index: u64) -> Result<F::Key> {
        let position = self.first_frame_position + index * self.frame_length;
        self.codec.read_key_at(self.storage, position)
    }

    /// Smallest `i` in `[lo, hi]` with `key_at(i) >= key`
    pub(crate) fn lower_bound(&mut self, key: F::Key, mut lo: u64, mut hi: u64) -> Result<u64> {
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key_at(mid)? < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Smallest `i` in `[lo, hi]` with `key_at(i) > key`
    pub(crate) fn upper_bound(&mut self, key: F::Key, mut lo: u64, mut hi: u64) -> Result<u64> {
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if key < self.key_at(mid)? {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(lo)
    }

    /// `(lower_bound, upper_bound)` in one pass.
    ///
    /// Narrows both ends together until a probe hits `key`, then finishes
    /// each bound inside its own half.
    pub(crate) fn equal_range(&mut self, key: F::Key, mut lo: u64, mut hi: u64) -> Result<(u64, u64)> {
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let probe = self.key_at(mid)?;
            if probe < key {
                lo = mid + 1;
            } else if key < probe {
                hi = mid;
            } else {
                let lower = self.lower_bound(key, lo, mid)?;
                let upper = self.upper_bound(key, mid + 1, hi)?;
                return Ok((lower, upper));
            }
        }
        Ok((lo, lo))
    }
}

/// Reject key lists that are not strictly ascending
pub(crate) fn check_ascending_keys<K: PartialOrd + std::fmt::Debug>(keys: &[K]) -> Result<()> {
    if let Some(pair) = keys.windows(2).find(|w| !(w[0] < w[1])) {
        return Err(FwobError::InvalidKeyList(format!(
            "keys must be ascending and unique, found {:?} followed by {:?}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// Reject ranges whose first key is above the last
pub(crate) fn check_range<K: PartialOrd + std::fmt::Debug>(first: K, last: K) -> Result<()> {
    if first > last {
        return Err(FwobError::InvalidRange {
            first: format!("{:?}", first),
            last: format!("{:?}", last),
        });
    }
    Ok(())
}

impl<F: Frame, S: Storage> FwobFile<F, S> {
    pub(crate) fn searcher(&mut self) -> Result<Searcher<'_, F, S>> {
        let storage = readable(&mut self.storage, &self.path)?;
        Ok(Searcher::new(storage, &self.codec, &self.header))
    }

    // =========================================================================
    // Bound Primitives
    // =========================================================================

    /// Index of the first frame with key `>= key` (`frame_count` if none)
    pub fn lower_bound(&mut self, key: F::Key) -> Result<u64> {
        let count = self.header.frame_count;
        self.searcher()?.lower_bound(key, 0, count)
    }

    /// Index of the first frame with key `> key` (`frame_count` if none)
    pub fn upper_bound(&mut self, key: F::Key) -> Result<u64> {
        let count = self.header.frame_count;
        self.searcher()?.upper_bound(key, 0, count)
    }

    /// Index span of all frames whose key equals `key`
    pub fn equal_range(&mut self, key: F::Key) -> Result<(u64, u64)> {
        let count = self.header.frame_count;
        self.searcher()?.equal_range(key, 0, count)
    }

    // =========================================================================
    // Point Accessors
    // =========================================================================

    /// Frame at `index`, or `None` past the end
    pub fn get_frame_at(&mut self, index: u64) -> Result<Option<F>> {
        if index >= self.header.frame_count {
            return Ok(None);
        }
        let bytes = self.read_frame_bytes(index, 1)?;
        Ok(Some(self.codec.decode(&bytes)?))
    }

    /// Key of the frame at `index`, or `None` past the end
    pub fn get_key_at(&mut self, index: u64) -> Result<Option<F::Key>> {
        if index >= self.header.frame_count {
            return Ok(None);
        }
        Ok(Some(self.searcher()?.key_at(index)?))
    }

    // =========================================================================
    // Range Accessors (lazy, single pass)
    // =========================================================================

    /// All frames matching any of `keys`, which must be strictly ascending.
    ///
    /// Each key narrows the search window for the next, so the lookup costs
    /// O(K log N).
    pub fn get_frames(&mut self, keys: &[F::Key]) -> Result<Frames<'_, F, S>> {
        check_ascending_keys(keys)?;
        let count = self.header.frame_count;
        let mut ranges = Vec::new();
        {
            let mut searcher = self.searcher()?;
            let mut lo = 0;
            for &key in keys {
                let (lower, upper) = searcher.equal_range(key, lo, count)?;
                if lower < upper {
                    ranges.push(lower..upper);
                }
                lo = upper;
            }
        }
        trace!("get_frames: {} keys -> {} ranges", keys.len(), ranges.len());
        Ok(self.frames_in(ranges))
    }

    /// Frames with `first <= key <= last`
    pub fn get_frames_between(&mut self, first: F::Key, last: F::Key) -> Result<Frames<'_, F, S>> {
        check_range(first, last)?;
        let count = self.header.frame_count;
        let (lower, upper) = {
            let mut searcher = self.searcher()?;
            let lower = searcher.lower_bound(first, 0, count)?;
            let upper = searcher.upper_bound(last, lower, count)?;
            (lower, upper)
        };
        Ok(self.frames_in(vec![lower..upper]))
    }

    /// Frames with `key <= last`
    pub fn get_frames_before(&mut self, last: F::Key) -> Result<Frames<'_, F, S>> {
        let upper = self.upper_bound(last)?;
        Ok(self.frames_in(vec![0..upper]))
    }

    /// Frames with `key >= first`
    pub fn get_frames_after(&mut self, first: F::Key) -> Result<Frames<'_, F, S>> {
        let lower = self.lower_bound(first)?;
        let count = self.header.frame_count;
        Ok(self.frames_in(vec![lower..count]))
    }

    /// Every frame, in key order
    pub fn get_all_frames(&mut self) -> Result<Frames<'_, F, S>> {
        readable(&mut self.storage, &self.path)?;
        let count = self.header.frame_count;
        Ok(self.frames_in(vec![0..count]))
    }

    /// Every key, in order, without decoding whole frames
    pub fn get_keys(&mut self) -> Result<Vec<F::Key>> {
        let count = self.header.frame_count;
        let batch = self.config.read_batch_frames as u64;
        let frame_length = self.codec.frame_length();

        let mut keys = Vec::with_capacity(count as usize);
        let mut index = 0;
        while index < count {
            let n = batch.min(count - index);
            let bytes = self.read_frame_bytes(index, n)?;
            keys.extend(bytes.chunks_exact(frame_length).map(|b| self.codec.key_of(b)));
            index += n;
        }
        Ok(keys)
    }

    fn frames_in(&mut self, ranges: Vec<Range<u64>>) -> Frames<'_, F, S> {
        Frames::new(self, ranges)
    }
}
