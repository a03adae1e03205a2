//! String Table
//!
//! Append-only, deduplicated UTF-8 strings stored between the header and the
//! frame region, each prefixed by its varint byte length. Capacity is fixed
//! when the file is created; the table never grows the file.
//!
//! A string's index is its position in append order. The optional in-memory
//! cache only saves rescans and has no effect on disk.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{FwobError, Result};
use crate::format::{decode_varint, encode_varint, varint_len, Header, MAX_VARINT_VALUE};
use crate::schema::Frame;
use crate::storage::Storage;

use super::{readable, writable, FwobFile};

/// Materialized string table
pub(super) struct StringCache {
    list: Vec<String>,
    index: HashMap<String, u32>,
}

impl StringCache {
    pub(super) fn from_list(list: Vec<String>) -> Self {
        let index = list
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as u32))
            .collect();
        Self { list, index }
    }

    fn push(&mut self, value: &str) {
        self.index.insert(value.to_string(), self.list.len() as u32);
        self.list.push(value.to_string());
    }
}

/// Read and check every entry of the string table.
///
/// The scan must consume exactly the used length and yield exactly the
/// recorded number of strings.
pub fn read_string_table<S: Storage + ?Sized>(
    storage: &mut S,
    header: &Header,
    path: &Path,
) -> Result<Vec<String>> {
    let corrupted = |reason: String| FwobError::StringTableCorrupted {
        path: path.to_path_buf(),
        reason,
    };

    let mut bytes = vec![0u8; header.string_table_length as usize];
    storage.read_exact_at(header.string_table_position(), &mut bytes)?;

    let mut strings = Vec::with_capacity(header.string_count as usize);
    let mut pos = 0usize;
    while pos < bytes.len() {
        let (len, consumed) = decode_varint(&bytes[pos..])
            .ok_or_else(|| corrupted(format!("bad length prefix at byte {}", pos)))?;
        pos += consumed;

        let end = pos + len as usize;
        if end > bytes.len() {
            return Err(corrupted(format!(
                "entry {} runs past used length {}",
                strings.len(),
                bytes.len()
            )));
        }
        let text = std::str::from_utf8(&bytes[pos..end])
            .map_err(|_| corrupted(format!("entry {} is not valid UTF-8", strings.len())))?;
        strings.push(text.to_string());
        pos = end;
    }

    if strings.len() != header.string_count as usize {
        return Err(corrupted(format!(
            "found {} strings, header records {}",
            strings.len(),
            header.string_count
        )));
    }
    Ok(strings)
}

impl<F: Frame, S: Storage> FwobFile<F, S> {
    pub fn string_count(&self) -> u32 {
        self.header.string_count
    }

    /// Bytes of the string table in use
    pub fn string_table_length(&self) -> u32 {
        self.header.string_table_length
    }

    /// Bytes reserved for the string table
    pub fn string_table_preserved_length(&self) -> u32 {
        self.header.string_table_preserved_length
    }

    /// Materialize the table in memory; later lookups skip the disk
    pub fn load_string_table(&mut self) -> Result<()> {
        let storage = readable(&mut self.storage, &self.path)?;
        let list = read_string_table(storage, &self.header, &self.path)?;
        self.strings = Some(StringCache::from_list(list));
        Ok(())
    }

    /// Drop the in-memory copy
    pub fn unload_string_table(&mut self) {
        self.strings = None;
    }

    pub fn is_string_table_loaded(&self) -> bool {
        self.strings.is_some()
    }

    /// All strings in index order
    pub fn strings(&mut self) -> Result<Vec<String>> {
        if let Some(cache) = &self.strings {
            return Ok(cache.list.clone());
        }
        let storage = readable(&mut self.storage, &self.path)?;
        read_string_table(storage, &self.header, &self.path)
    }

    /// String at `index`, or `None` past the end
    pub fn get_string(&mut self, index: u32) -> Result<Option<String>> {
        if let Some(cache) = &self.strings {
            return Ok(cache.list.get(index as usize).cloned());
        }
        Ok(self.strings()?.into_iter().nth(index as usize))
    }

    /// Index of `value`, if present
    pub fn get_string_index(&mut self, value: &str) -> Result<Option<u32>> {
        if let Some(cache) = &self.strings {
            return Ok(cache.index.get(value).copied());
        }
        Ok(self
            .strings()?
            .iter()
            .position(|s| s == value)
            .map(|i| i as u32))
    }

    pub fn contains_string(&mut self, value: &str) -> Result<bool> {
        Ok(self.get_string_index(value)?.is_some())
    }

    /// Add `value` to the table and return its index.
    ///
    /// A string already present is not stored twice; its existing index is
    /// returned.
    pub fn append_string(&mut self, value: &str) -> Result<u32> {
        writable(&mut self.storage, &self.config, &self.path)?;
        if let Some(index) = self.get_string_index(value)? {
            return Ok(index);
        }

        let len = value.len();
        let used = u64::from(self.header.string_table_length);
        let available = u64::from(self.header.string_table_preserved_length) - used;
        if len > MAX_VARINT_VALUE as usize {
            return Err(FwobError::StringTableFull {
                path: self.path.clone(),
                needed: (len + 4) as u64,
                available,
            });
        }

        let needed = (varint_len(len as u32) + len) as u64;
        if needed > available {
            warn!(
                "{}: string table full ({} bytes needed, {} available)",
                self.path.display(),
                needed,
                available
            );
            return Err(FwobError::StringTableFull {
                path: self.path.clone(),
                needed,
                available,
            });
        }

        let mut entry = Vec::with_capacity(needed as usize);
        encode_varint(len as u32, &mut entry);
        entry.extend_from_slice(value.as_bytes());

        let position = self.header.string_table_position() + used;
        let index = self.header.string_count;
        let new_length = self.header.string_table_length + needed as u32;

        let storage = writable(&mut self.storage, &self.config, &self.path)?;
        storage.write_all_at(position, &entry)?;
        Header::update_string_table_length(storage, index + 1, new_length)?;
        storage.flush()?;

        self.header.string_count = index + 1;
        self.header.string_table_length = new_length;
        if let Some(cache) = self.strings.as_mut() {
            cache.push(value);
        }
        debug!("{}: string {:?} appended at index {}", self.path.display(), value, index);
        Ok(index)
    }

    /// Remove every string; capacity is unchanged
    pub fn clear_strings(&mut self) -> Result<()> {
        let position = self.header.string_table_position();
        let used = self.header.string_table_length as usize;
        let storage = writable(&mut self.storage, &self.config, &self.path)?;

        storage.write_all_at(position, &vec![0u8; used])?;
        Header::update_string_table_length(storage, 0, 0)?;
        storage.flush()?;

        debug!(
            "{}: cleared {} strings",
            self.path.display(),
            self.header.string_count
        );
        self.header.string_count = 0;
        self.header.string_table_length = 0;
        if let Some(cache) = self.strings.as_mut() {
            *cache = StringCache::from_list(Vec::new());
        }
        Ok(())
    }
}
