//! Mutation Engine
//!
//! Append and delete paths. Every path keeps the frame region sorted
//! non-decreasing by key, patches only the frame-count bytes of the header,
//! and refreshes the cached first/last frame before returning.
//!
//! ## Append Modes
//! - `append_frames`: best-effort prefix. Stops at the first frame that would
//!   break ordering; frames before it stay committed.
//! - `append_frames_tx`: all-or-nothing. The whole batch is validated before
//!   any byte is written.
//!
//! ## Delete
//! Block-copy compaction: surviving spans slide down over removed ones, then
//! the file is truncated. Not crash-atomic; an interrupted compaction can
//! leave a partially shifted region.

use std::borrow::Borrow;
use std::io::Write;

use tracing::{debug, warn};

use crate::error::{FwobError, Result};
use crate::format::Header;
use crate::schema::Frame;
use crate::storage::{move_block, Storage};

use super::query::{check_ascending_keys, check_range};
use super::{writable, FwobFile};

/// Why a best-effort append stopped early
enum AppendStop {
    Encode(FwobError),
    Order { key: String, last_key: String },
}

impl<F: Frame, S: Storage> FwobFile<F, S> {
    // =========================================================================
    // Append
    // =========================================================================

    /// Append a single frame
    pub fn append_frame(&mut self, frame: &F) -> Result<()> {
        self.append_frames_tx(std::iter::once(frame)).map(|_| ())
    }

    /// Append frames until one would break key ordering.
    ///
    /// Frames accepted before the offending one remain committed; the error
    /// reports how many. Returns the number appended on full success.
    pub fn append_frames<I>(&mut self, frames: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Borrow<F>,
    {
        writable(&mut self.storage, &self.config, &self.path)?;

        let flush_threshold = self.config.block_copy_size;
        let mut pending: Vec<u8> = Vec::new();
        let mut pending_count = 0u64;
        let mut committed = 0u64;
        let mut last_key = self.last_key();
        let mut stop = None;

        for frame in frames {
            let start = pending.len();
            if let Err(e) = self.codec.encode(frame.borrow(), &mut pending) {
                stop = Some(AppendStop::Encode(e));
                break;
            }

            let key = self.codec.key_of(&pending[start..]);
            if let Some(last) = last_key {
                if key < last {
                    pending.truncate(start);
                    stop = Some(AppendStop::Order {
                        key: format!("{:?}", key),
                        last_key: format!("{:?}", last),
                    });
                    break;
                }
            }
            last_key = Some(key);
            pending_count += 1;

            if pending.len() >= flush_threshold {
                self.write_appended(&pending, pending_count)?;
                committed += pending_count;
                pending.clear();
                pending_count = 0;
            }
        }

        self.write_appended(&pending, pending_count)?;
        committed += pending_count;
        self.refresh_cached_frames()?;

        match stop {
            None => {
                debug!("{}: appended {} frames", self.path.display(), committed);
                Ok(committed)
            }
            Some(AppendStop::Encode(e)) => {
                warn!(
                    "{}: append stopped after {} frames: {}",
                    self.path.display(),
                    committed,
                    e
                );
                Err(e)
            }
            Some(AppendStop::Order { key, last_key }) => {
                warn!(
                    "{}: key {} precedes {}, append stopped after {} frames",
                    self.path.display(),
                    key,
                    last_key,
                    committed
                );
                Err(FwobError::KeyOrderViolation {
                    path: self.path.clone(),
                    key,
                    last_key,
                    committed,
                })
            }
        }
    }

    /// Append all frames or none.
    ///
    /// The batch must be non-decreasing by key and must not start below the
    /// current last key. Returns the number appended.
    pub fn append_frames_tx<I>(&mut self, frames: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Borrow<F>,
    {
        writable(&mut self.storage, &self.config, &self.path)?;

        // Step 1: Encode and validate the whole batch
        let mut pending: Vec<u8> = Vec::new();
        let mut count = 0u64;
        let mut last_key = self.last_key();
        for frame in frames {
            let start = pending.len();
            self.codec.encode(frame.borrow(), &mut pending)?;
            let key = self.codec.key_of(&pending[start..]);
            if let Some(last) = last_key {
                if key < last {
                    warn!(
                        "{}: key {:?} precedes {:?}, transaction rejected",
                        self.path.display(),
                        key,
                        last
                    );
                    return Err(FwobError::KeyOrderViolation {
                        path: self.path.clone(),
                        key: format!("{:?}", key),
                        last_key: format!("{:?}", last),
                        committed: 0,
                    });
                }
            }
            last_key = Some(key);
            count += 1;
        }

        if count == 0 {
            return Ok(0);
        }

        // Step 2: Write in one piece and commit
        self.write_appended(&pending, count)?;
        self.refresh_cached_frames()?;
        debug!("{}: appended {} frames (tx)", self.path.display(), count);
        Ok(count)
    }

    /// Write encoded frames at the end of the region, then patch the count
    fn write_appended(&mut self, bytes: &[u8], count: u64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let position = self.header.file_length();
        let storage = writable(&mut self.storage, &self.config, &self.path)?;

        storage.write_all_at(position, bytes)?;
        let new_count = self.header.frame_count + count;
        Header::update_frame_count(storage, new_count)?;
        storage.flush()?;
        self.header.frame_count = new_count;
        Ok(())
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete every frame whose key is in `keys` (strictly ascending).
    ///
    /// Keys with no matching frames are skipped. Returns frames removed.
    pub fn delete_frames(&mut self, keys: &[F::Key]) -> Result<u64> {
        check_ascending_keys(keys)?;
        writable(&mut self.storage, &self.config, &self.path)?;

        let count = self.header.frame_count;
        let frame_length = u64::from(self.header.frame_length);
        let first_position = self.header.first_frame_position();
        let chunk = self.config.block_copy_size;
        let position = |index: u64| first_position + index * frame_length;

        let storage = writable(&mut self.storage, &self.config, &self.path)?;
        let mut searcher_lo = 0u64;
        let mut read = 0u64;
        let mut write = 0u64;

        for &key in keys {
            let (lower, upper) = {
                let mut searcher = super::Searcher::new(&mut *storage, &self.codec, &self.header);
                searcher.equal_range(key, searcher_lo, count)?
            };
            searcher_lo = upper;
            if lower == upper {
                continue;
            }

            // Slide the kept span [read, lower) down to the writer
            let kept = lower - read;
            move_block(&mut *storage, position(read), position(write), kept * frame_length, chunk)?;
            write += kept;
            read = upper;
        }

        // Tail after the last match
        let kept = count - read;
        move_block(storage, position(read), position(write), kept * frame_length, chunk)?;
        write += kept;

        let removed = count - write;
        if removed > 0 {
            self.commit_truncated(write)?;
        }
        debug!(
            "{}: delete by {} keys removed {} frames",
            self.path.display(),
            keys.len(),
            removed
        );
        Ok(removed)
    }

    /// Delete frames with `first <= key <= last`
    pub fn delete_frames_between(&mut self, first: F::Key, last: F::Key) -> Result<u64> {
        check_range(first, last)?;
        writable(&mut self.storage, &self.config, &self.path)?;
        let count = self.header.frame_count;
        let (lower, upper) = {
            let mut searcher = self.searcher()?;
            let lower = searcher.lower_bound(first, 0, count)?;
            let upper = searcher.upper_bound(last, lower, count)?;
            (lower, upper)
        };
        self.delete_span(lower, upper)
    }

    /// Delete frames with `key <= last`
    pub fn delete_frames_before(&mut self, last: F::Key) -> Result<u64> {
        writable(&mut self.storage, &self.config, &self.path)?;
        let upper = self.upper_bound(last)?;
        self.delete_span(0, upper)
    }

    /// Delete frames with `key >= first`
    pub fn delete_frames_after(&mut self, first: F::Key) -> Result<u64> {
        writable(&mut self.storage, &self.config, &self.path)?;
        let lower = self.lower_bound(first)?;
        let count = self.header.frame_count;
        self.delete_span(lower, count)
    }

    /// Delete every frame
    pub fn delete_all_frames(&mut self) -> Result<u64> {
        writable(&mut self.storage, &self.config, &self.path)?;
        let count = self.header.frame_count;
        self.delete_span(0, count)
    }

    /// Remove frames `[lower, upper)`, sliding the tail down over the gap
    fn delete_span(&mut self, lower: u64, upper: u64) -> Result<u64> {
        if lower >= upper {
            return Ok(0);
        }

        let count = self.header.frame_count;
        let tail = count - upper;
        if tail > 0 {
            let src = self.header.frame_position(upper);
            let dst = self.header.frame_position(lower);
            let len = tail * u64::from(self.header.frame_length);
            let chunk = self.config.block_copy_size;
            let storage = writable(&mut self.storage, &self.config, &self.path)?;
            move_block(storage, src, dst, len, chunk)?;
        }

        let removed = upper - lower;
        self.commit_truncated(count - removed)?;
        debug!(
            "{}: deleted frames [{}, {}), {} remain",
            self.path.display(),
            lower,
            upper,
            count - removed
        );
        Ok(removed)
    }

    /// Patch the count, cut the file to match, refresh cached frames
    fn commit_truncated(&mut self, new_count: u64) -> Result<()> {
        let new_length = self.header.frame_position(new_count);
        let storage = writable(&mut self.storage, &self.config, &self.path)?;

        Header::update_frame_count(storage, new_count)?;
        storage.set_len(new_length)?;
        storage.flush()?;
        self.header.frame_count = new_count;
        self.refresh_cached_frames()
    }
}
