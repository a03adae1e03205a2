//! FWOB Header
//!
//! Fixed 214-byte header: layout fingerprint plus string-table and frame
//! bookkeeping. Reads never fail on malformed content; they return `None`,
//! leaving "not a FWOB file" for the caller to tell apart from "FWOB file
//! with the wrong frame type".

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FwobError, Result};
use crate::schema::{FieldType, FrameInfo, MAX_FIELDS, MAX_FIELD_NAME_LENGTH, MAX_FRAME_TYPE_LENGTH};

use super::{
    FRAME_COUNT_OFFSET, HEADER_SIZE, MAX_TITLE_LENGTH, SIGNATURE, STRING_COUNT_OFFSET,
    TITLE_OFFSET, VERSION,
};

/// Decoded FWOB header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub field_lengths: Vec<u8>,
    pub field_types: u64,
    pub field_names: Vec<String>,
    pub string_count: u32,
    pub string_table_length: u32,
    pub string_table_preserved_length: u32,
    pub frame_count: u64,
    pub frame_length: u32,
    pub frame_type: String,
    pub title: String,
}

impl Header {
    /// Header of a new, empty file for the given layout
    pub fn new(info: &FrameInfo, title: &str, string_table_preserved_length: u32) -> Self {
        Self {
            version: VERSION,
            field_lengths: info.fields().iter().map(|f| f.length as u8).collect(),
            field_types: info.packed_types(),
            field_names: info.fields().iter().map(|f| f.name.clone()).collect(),
            string_count: 0,
            string_table_length: 0,
            string_table_preserved_length,
            frame_count: 0,
            frame_length: info.frame_length() as u32,
            frame_type: info.frame_type().to_string(),
            title: title.to_string(),
        }
    }

    // =========================================================================
    // Derived Positions
    // =========================================================================

    pub fn field_count(&self) -> usize {
        self.field_names.len()
    }

    /// Type code of field `index`
    pub fn field_type(&self, index: usize) -> Option<FieldType> {
        FieldType::from_code(((self.field_types >> (4 * index)) & 0xF) as u8)
    }

    pub fn string_table_position(&self) -> u64 {
        HEADER_SIZE
    }

    pub fn first_frame_position(&self) -> u64 {
        HEADER_SIZE + u64::from(self.string_table_preserved_length)
    }

    /// Byte position of frame `index`
    pub fn frame_position(&self, index: u64) -> u64 {
        self.first_frame_position() + index * u64::from(self.frame_length)
    }

    /// Expected physical file size. Cannot overflow for a decoded header.
    pub fn file_length(&self) -> u64 {
        self.frame_position(self.frame_count)
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    pub fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE as usize);

        buf.put_slice(SIGNATURE);
        buf.put_u8(self.version);
        buf.put_u8(self.field_count() as u8);

        let mut lengths = [0u8; MAX_FIELDS];
        lengths[..self.field_lengths.len()].copy_from_slice(&self.field_lengths);
        buf.put_slice(&lengths);

        buf.put_u64_le(self.field_types);

        // Used name slots are space-padded, unused slots stay zero
        let mut names = [0u8; MAX_FIELDS * MAX_FIELD_NAME_LENGTH];
        for (i, name) in self.field_names.iter().enumerate() {
            let slot = &mut names[i * MAX_FIELD_NAME_LENGTH..(i + 1) * MAX_FIELD_NAME_LENGTH];
            slot.copy_from_slice(&pad_text(name, MAX_FIELD_NAME_LENGTH));
        }
        buf.put_slice(&names);

        buf.put_u32_le(self.string_count);
        buf.put_u32_le(self.string_table_length);
        buf.put_u32_le(self.string_table_preserved_length);
        buf.put_u64_le(self.frame_count);
        buf.put_u32_le(self.frame_length);
        buf.put_slice(&pad_text(&self.frame_type, MAX_FRAME_TYPE_LENGTH));
        buf.put_slice(&pad_text(&self.title, MAX_TITLE_LENGTH));

        let mut out = [0u8; HEADER_SIZE as usize];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode and sanity-check a header. `None` means "not a valid FWOB header".
    pub fn decode(bytes: &[u8; HEADER_SIZE as usize]) -> Option<Self> {
        let mut buf = &bytes[..];

        if &buf[..4] != SIGNATURE {
            return None;
        }
        buf.advance(4);

        let version = buf.get_u8();
        if version != VERSION {
            return None;
        }

        let field_count = buf.get_u8() as usize;
        if field_count == 0 || field_count > MAX_FIELDS {
            return None;
        }

        let field_lengths = buf[..field_count].to_vec();
        buf.advance(MAX_FIELDS);

        let field_types = buf.get_u64_le();

        let mut field_names = Vec::with_capacity(field_count);
        for i in 0..MAX_FIELDS {
            let slot = &buf[i * MAX_FIELD_NAME_LENGTH..(i + 1) * MAX_FIELD_NAME_LENGTH];
            if i < field_count {
                let name = unpad_text(slot)?;
                if name.is_empty() {
                    return None;
                }
                field_names.push(name);
            }
        }
        buf.advance(MAX_FIELDS * MAX_FIELD_NAME_LENGTH);

        let string_count = buf.get_u32_le();
        let string_table_length = buf.get_u32_le();
        let string_table_preserved_length = buf.get_u32_le();
        let frame_count = buf.get_u64_le();
        let frame_length = buf.get_u32_le();

        let frame_type = unpad_text(&buf[..MAX_FRAME_TYPE_LENGTH])?;
        buf.advance(MAX_FRAME_TYPE_LENGTH);
        let title = unpad_text(&buf[..MAX_TITLE_LENGTH])?;

        if string_table_length > string_table_preserved_length {
            return None;
        }
        let length_sum: u32 = field_lengths.iter().map(|&l| u32::from(l)).sum();
        if frame_length != length_sum || field_lengths.contains(&0) {
            return None;
        }
        if frame_type.is_empty() || title.is_empty() {
            return None;
        }
        // Frame region must end at a representable offset
        frame_count
            .checked_mul(u64::from(frame_length))?
            .checked_add(HEADER_SIZE + u64::from(string_table_preserved_length))?;

        let header = Self {
            version,
            field_lengths,
            field_types,
            field_names,
            string_count,
            string_table_length,
            string_table_preserved_length,
            frame_count,
            frame_length,
            frame_type,
            title,
        };
        if (0..field_count).any(|i| header.field_type(i).is_none()) {
            return None;
        }
        Some(header)
    }

    /// Read a header from the start of `source`.
    ///
    /// Returns `Ok(None)` if the source is too short or the bytes are not a
    /// valid header; I/O failures are still errors.
    pub fn read<R: Read + Seek>(source: &mut R) -> Result<Option<Self>> {
        source.seek(SeekFrom::Start(0))?;
        let mut bytes = [0u8; HEADER_SIZE as usize];
        match source.read_exact(&mut bytes) {
            Ok(()) => Ok(Self::decode(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the whole header at the start of `sink`
    pub fn write<W: Write + Seek>(&self, sink: &mut W) -> Result<()> {
        sink.seek(SeekFrom::Start(0))?;
        sink.write_all(&self.encode())?;
        Ok(())
    }

    // =========================================================================
    // In-place Patches
    // =========================================================================

    /// Rewrite only the title bytes
    pub fn update_title<W: Write + Seek>(sink: &mut W, title: &str) -> Result<()> {
        sink.seek(SeekFrom::Start(TITLE_OFFSET))?;
        sink.write_all(&pad_text(title, MAX_TITLE_LENGTH))?;
        Ok(())
    }

    /// Rewrite only the frame count
    pub fn update_frame_count<W: Write + Seek>(sink: &mut W, frame_count: u64) -> Result<()> {
        sink.seek(SeekFrom::Start(FRAME_COUNT_OFFSET))?;
        sink.write_all(&frame_count.to_le_bytes())?;
        Ok(())
    }

    /// Rewrite only the string count and used string-table length
    pub fn update_string_table_length<W: Write + Seek>(
        sink: &mut W,
        string_count: u32,
        string_table_length: u32,
    ) -> Result<()> {
        let mut buf = [0u8; 8];
        buf[..4].copy_from_slice(&string_count.to_le_bytes());
        buf[4..].copy_from_slice(&string_table_length.to_le_bytes());
        sink.seek(SeekFrom::Start(STRING_COUNT_OFFSET))?;
        sink.write_all(&buf)?;
        Ok(())
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check that this header describes exactly the layout `info`
    pub fn validate(&self, info: &FrameInfo, path: &Path) -> Result<()> {
        let mismatch = |reason: String| FwobError::FrameTypeMismatch {
            path: path.to_path_buf(),
            reason,
        };

        if self.frame_type != info.frame_type() {
            return Err(mismatch(format!(
                "frame type is {:?}, expected {:?}",
                self.frame_type,
                info.frame_type()
            )));
        }
        if self.frame_length as usize != info.frame_length() {
            return Err(mismatch(format!(
                "frame length is {}, expected {}",
                self.frame_length,
                info.frame_length()
            )));
        }
        if self.field_count() != info.fields().len() {
            return Err(mismatch(format!(
                "field count is {}, expected {}",
                self.field_count(),
                info.fields().len()
            )));
        }
        if self.field_types != info.packed_types() {
            return Err(mismatch(format!(
                "field types are {:#018x}, expected {:#018x}",
                self.field_types,
                info.packed_types()
            )));
        }
        for (i, field) in info.fields().iter().enumerate() {
            if self.field_names[i] != field.name || self.field_lengths[i] as usize != field.length {
                return Err(mismatch(format!(
                    "field {} is {:?} ({} bytes), expected {:?} ({} bytes)",
                    i, self.field_names[i], self.field_lengths[i], field.name, field.length
                )));
            }
        }
        Ok(())
    }
}

/// Check a user-supplied title against the header constraints
pub(crate) fn check_title(title: &str) -> Result<()> {
    if title.len() > MAX_TITLE_LENGTH {
        return Err(FwobError::TitleTooLong {
            title: title.to_string(),
            limit: MAX_TITLE_LENGTH,
        });
    }
    if title.trim().is_empty() || title.ends_with(' ') || title.contains('\0') {
        return Err(FwobError::InvalidArgument(format!(
            "title {:?} must be non-blank without trailing spaces or NUL bytes",
            title
        )));
    }
    Ok(())
}

/// Space-pad `text` to `width` bytes (callers guarantee it fits)
fn pad_text(text: &str, width: usize) -> Vec<u8> {
    let mut out = vec![b' '; width];
    let bytes = text.as_bytes();
    let n = bytes.len().min(width);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Strip trailing spaces and NULs; `None` on invalid UTF-8
fn unpad_text(bytes: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?;
    Some(text.trim_end_matches([' ', '\0']).to_string())
}
