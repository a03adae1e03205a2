//! Format Module
//!
//! Byte-exact on-disk layout of a FWOB file. Little-endian throughout.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (214 bytes)                                           │
//! │   Signature "FWOB" (4) | Version (1) | FieldCount (1)        │
//! │   FieldLengths (16 × 1) | FieldTypes (8, 4 bits per field)   │
//! │   FieldNames (16 × 8)                                        │
//! │   StringCount (4) | StringTableLength (4) | Preserved (4)    │
//! │   FrameCount (8) | FrameLength (4)                           │
//! │   FrameType (16) | Title (16)                                │
//! ├──────────────────────────────────────────────────────────────┤
//! │ String Table (Preserved bytes)                               │
//! │   [varint len][UTF-8 bytes] ... repeated StringCount times   │
//! │   (unused capacity is zero-filled)                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Frames (FrameCount × FrameLength bytes)                      │
//! │   fixed-width records, sorted non-decreasing by key          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod codec;
mod header;
mod varint;

pub use codec::FrameCodec;
pub use header::Header;
pub(crate) use header::check_title;
pub use varint::{decode_varint, encode_varint, varint_len, MAX_VARINT_BYTES, MAX_VARINT_VALUE};

// =============================================================================
// Shared Constants
// =============================================================================

/// Signature identifying a FWOB file
pub const SIGNATURE: &[u8; 4] = b"FWOB";

/// Current header version
pub const VERSION: u8 = 1;

/// Total header size in bytes
pub const HEADER_SIZE: u64 = 214;

/// Extension of FWOB files
pub const FILE_EXTENSION: &str = "fwob";

/// Maximum title length in bytes
pub const MAX_TITLE_LENGTH: usize = 16;

// -----------------------------------------------------------------------------
// Header field offsets (targets of in-place patches)
// -----------------------------------------------------------------------------

pub(crate) const STRING_COUNT_OFFSET: u64 = 158;
pub(crate) const FRAME_COUNT_OFFSET: u64 = 170;
pub(crate) const TITLE_OFFSET: u64 = 198;
