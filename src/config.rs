//! Configuration for FWOB files
//!
//! Centralized configuration with sensible defaults.

use crate::error::{FwobError, Result};

/// Default capacity reserved for the string table of a new file (bytes)
pub const DEFAULT_STRING_TABLE_PRESERVED_LENGTH: u32 = 4096;

/// Default chunk size for block copies (4 MiB)
pub const DEFAULT_BLOCK_COPY_SIZE: usize = 4 * 1024 * 1024;

/// Default number of frames read per batch by query sequences
pub const DEFAULT_READ_BATCH_FRAMES: usize = 1024;

/// Main configuration for opening or creating a FWOB file
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Access Configuration
    // -------------------------------------------------------------------------
    /// Whether the handle may mutate the file
    pub access: Access,

    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Bytes reserved for the string table when creating a file.
    /// Fixed for the lifetime of the file; the table never grows past it.
    pub string_table_preserved_length: u32,

    // -------------------------------------------------------------------------
    // I/O Configuration
    // -------------------------------------------------------------------------
    /// Chunk size used when shifting or copying frame regions
    pub block_copy_size: usize,

    /// Frames decoded per read when iterating query results
    pub read_batch_frames: usize,

    /// Materialize the string table in memory on open
    pub load_string_table: bool,
}

/// File access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Queries only; every mutation fails with `ReadOnly`
    ReadOnly,

    /// Queries and mutations
    ReadWrite,
}

impl Access {
    /// Whether mutations are permitted
    pub fn can_write(self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access: Access::ReadWrite,
            string_table_preserved_length: DEFAULT_STRING_TABLE_PRESERVED_LENGTH,
            block_copy_size: DEFAULT_BLOCK_COPY_SIZE,
            read_batch_frames: DEFAULT_READ_BATCH_FRAMES,
            load_string_table: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the sizes are usable
    pub fn validate(&self) -> Result<()> {
        if self.block_copy_size == 0 {
            return Err(FwobError::InvalidArgument(
                "block_copy_size must be greater than zero".to_string(),
            ));
        }
        if self.read_batch_frames == 0 {
            return Err(FwobError::InvalidArgument(
                "read_batch_frames must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the access mode
    pub fn access(mut self, access: Access) -> Self {
        self.config.access = access;
        self
    }

    /// Shorthand for `access(Access::ReadOnly)`
    pub fn read_only(self) -> Self {
        self.access(Access::ReadOnly)
    }

    /// Set the string table capacity used when creating files (in bytes)
    pub fn string_table_preserved_length(mut self, length: u32) -> Self {
        self.config.string_table_preserved_length = length;
        self
    }

    /// Set the block copy chunk size (in bytes)
    pub fn block_copy_size(mut self, size: usize) -> Self {
        self.config.block_copy_size = size;
        self
    }

    /// Set the number of frames decoded per read batch
    pub fn read_batch_frames(mut self, count: usize) -> Self {
        self.config.read_batch_frames = count;
        self
    }

    /// Load the string table into memory on open
    pub fn load_string_table(mut self, load: bool) -> Self {
        self.config.load_string_table = load;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
