//! File Module
//!
//! The FWOB file handle that ties the header, codec, string table and frame
//! region together.
//!
//! ## Responsibilities
//! - Create new files and open existing ones, validating header, frame type,
//!   physical length and string table
//! - Own the single storage handle (one cursor, one owner)
//! - Keep the cached first/last frame in step with every mutation
//!
//! ## Concurrency
//! Single-threaded and blocking. Queries take `&mut self` because they move
//! the shared cursor; the borrow checker therefore allows one live query
//! sequence per handle.

mod iter;
mod mutate;
mod query;
mod strings;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{FwobError, Result};
use crate::format::{FrameCodec, Header};
use crate::schema::{Frame, FrameInfo};
use crate::storage::Storage;

pub use iter::Frames;
pub(crate) use query::{check_ascending_keys, Searcher};
pub use strings::read_string_table;

use strings::StringCache;

/// A decoded frame together with its key
struct CachedFrame<F: Frame> {
    key: F::Key,
    frame: F,
}

/// An open FWOB file holding frames of type `F`
pub struct FwobFile<F: Frame, S: Storage = File> {
    /// Path (or label) used in error messages
    path: PathBuf,

    /// Backing store; `None` once closed
    storage: Option<S>,

    /// In-memory copy of the on-disk header
    header: Header,

    codec: FrameCodec<F>,

    config: Config,

    first: Option<CachedFrame<F>>,
    last: Option<CachedFrame<F>>,

    /// Materialized string table, if loaded
    strings: Option<StringCache>,
}

impl<F: Frame> FwobFile<F, File> {
    /// Open an existing file on disk
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        // Derive the layout before touching the disk
        FrameInfo::of::<F>()?;

        let file = OpenOptions::new()
            .read(true)
            .write(config.access.can_write())
            .open(path)?;
        Self::open_storage(file, path, config)
    }

    /// Create a new file on disk; fails if `path` already exists
    pub fn create(path: impl AsRef<Path>, title: &str, config: Config) -> Result<Self> {
        let path = path.as_ref();
        FrameInfo::of::<F>()?;
        crate::format::check_title(title)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Self::create_storage(file, path, title, config)
    }
}

impl<F: Frame, S: Storage> FwobFile<F, S> {
    /// Open a FWOB file held in `storage`
    pub fn open_storage(mut storage: S, path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        config.validate()?;
        let codec = FrameCodec::<F>::new()?;

        // Step 1: Header must be readable and describe this frame type
        let header = Header::read(&mut storage)?.ok_or_else(|| FwobError::InvalidHeader {
            path: path.clone(),
        })?;
        header.validate(codec.info(), &path)?;

        // Step 2: Physical length must match header math
        let actual = storage.len()?;
        if actual != header.file_length() {
            warn!(
                "{}: file length {} disagrees with header ({} frames, {} bytes expected)",
                path.display(),
                actual,
                header.frame_count,
                header.file_length()
            );
            return Err(FwobError::FileLengthMismatch {
                path,
                expected: header.file_length(),
                actual,
            });
        }

        // Step 3: String table must scan cleanly
        let table = read_string_table(&mut storage, &header, &path)?;
        let strings = config
            .load_string_table
            .then(|| StringCache::from_list(table));

        let mut file = Self {
            path,
            storage: Some(storage),
            header,
            codec,
            config,
            first: None,
            last: None,
            strings,
        };
        file.refresh_cached_frames()?;

        info!(
            "Opened {} ({} frames of {}, title {:?})",
            file.path.display(),
            file.header.frame_count,
            file.header.frame_type,
            file.header.title
        );
        Ok(file)
    }

    /// Initialize an empty FWOB file in `storage`, discarding its contents
    pub fn create_storage(
        mut storage: S,
        path: impl AsRef<Path>,
        title: &str,
        config: Config,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        config.validate()?;
        let codec = FrameCodec::<F>::new()?;
        crate::format::check_title(title)?;

        let header = Header::new(codec.info(), title, config.string_table_preserved_length);

        // Header, then a zero-filled string table region
        storage.set_len(0)?;
        header.write(&mut storage)?;
        storage.set_len(header.first_frame_position())?;
        storage.sync()?;

        info!(
            "Created {} (frame type {}, title {:?}, {} bytes reserved for strings)",
            path.display(),
            header.frame_type,
            header.title,
            header.string_table_preserved_length
        );

        let strings = config
            .load_string_table
            .then(|| StringCache::from_list(Vec::new()));
        Ok(Self {
            path,
            storage: Some(storage),
            header,
            codec,
            config,
            first: None,
            last: None,
            strings,
        })
    }

    /// Flush, sync and release the storage. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut storage) = self.storage.take() {
            if self.config.access.can_write() {
                storage.sync()?;
            }
            debug!("Closed {}", self.path.display());
        }
        Ok(())
    }

    /// Close and hand back the storage (`None` if already closed)
    pub fn into_storage(mut self) -> Result<Option<S>> {
        let mut storage = self.storage.take();
        if let Some(s) = storage.as_mut() {
            if self.config.access.can_write() {
                s.sync()?;
            }
        }
        Ok(storage)
    }

    pub fn is_closed(&self) -> bool {
        self.storage.is_none()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn frame_info(&self) -> &FrameInfo {
        self.codec.info()
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    /// Replace the title, patching only its header bytes
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        crate::format::check_title(title)?;
        let storage = writable(&mut self.storage, &self.config, &self.path)?;

        Header::update_title(storage, title)?;
        storage.flush()?;
        debug!("{}: title {:?} -> {:?}", self.path.display(), self.header.title, title);
        self.header.title = title.to_string();
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.header.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.header.frame_count == 0
    }

    /// Expected physical size in bytes
    pub fn file_length(&self) -> u64 {
        self.header.file_length()
    }

    pub fn first_frame(&self) -> Option<&F> {
        self.first.as_ref().map(|c| &c.frame)
    }

    pub fn last_frame(&self) -> Option<&F> {
        self.last.as_ref().map(|c| &c.frame)
    }

    pub fn first_key(&self) -> Option<F::Key> {
        self.first.as_ref().map(|c| c.key)
    }

    pub fn last_key(&self) -> Option<F::Key> {
        self.last.as_ref().map(|c| c.key)
    }

    // =========================================================================
    // Crate-internal Access (file organizer)
    // =========================================================================

    pub(crate) fn storage_mut(&mut self) -> Result<&mut S> {
        readable(&mut self.storage, &self.path)
    }

    /// Record frames already written past the old end of the frame region
    pub(crate) fn commit_appended(&mut self, added: u64) -> Result<()> {
        let storage = writable(&mut self.storage, &self.config, &self.path)?;
        let count = self.header.frame_count + added;
        Header::update_frame_count(storage, count)?;
        storage.flush()?;
        self.header.frame_count = count;
        self.refresh_cached_frames()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Re-read the first and last frames from storage
    fn refresh_cached_frames(&mut self) -> Result<()> {
        let count = self.header.frame_count;
        if count == 0 {
            self.first = None;
            self.last = None;
            return Ok(());
        }
        self.first = Some(self.read_cached(0)?);
        self.last = Some(self.read_cached(count - 1)?);
        Ok(())
    }

    fn read_cached(&mut self, index: u64) -> Result<CachedFrame<F>> {
        let bytes = self.read_frame_bytes(index, 1)?;
        Ok(CachedFrame {
            key: self.codec.key_of(&bytes),
            frame: self.codec.decode(&bytes)?,
        })
    }

    /// Raw bytes of `count` frames starting at `index`
    fn read_frame_bytes(&mut self, index: u64, count: u64) -> Result<Vec<u8>> {
        let position = self.header.frame_position(index);
        let len = count as usize * self.codec.frame_length();
        let storage = readable(&mut self.storage, &self.path)?;
        let mut buf = vec![0u8; len];
        storage.read_exact_at(position, &mut buf)?;
        Ok(buf)
    }
}

impl<F: Frame, S: Storage> Drop for FwobFile<F, S> {
    fn drop(&mut self) {
        if let Some(storage) = self.storage.as_mut() {
            if self.config.access.can_write() {
                if let Err(e) = storage.flush() {
                    warn!("{}: flush on drop failed: {}", self.path.display(), e);
                }
            }
        }
    }
}

/// The open storage, or `Closed`
fn readable<'a, S>(storage: &'a mut Option<S>, path: &Path) -> Result<&'a mut S> {
    storage.as_mut().ok_or_else(|| FwobError::Closed {
        path: path.to_path_buf(),
    })
}

/// The open storage if the handle may write, else `Closed` or `ReadOnly`
fn writable<'a, S>(storage: &'a mut Option<S>, config: &Config, path: &Path) -> Result<&'a mut S> {
    let storage = readable(storage, path)?;
    if !config.access.can_write() {
        return Err(FwobError::ReadOnly {
            path: path.to_path_buf(),
        });
    }
    Ok(storage)
}
