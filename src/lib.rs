//! # FWOB
//!
//! An embeddable storage engine for Fixed-Width Ordered Binary files:
//! - Fixed-size records ("frames") kept sorted by a single key
//! - A compact 214-byte self-describing header
//! - A deduplicated, fixed-capacity string table
//! - O(log N) bound searches and O(N) compaction, split and concatenation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  FwobFile<F, S> / Organizer                  │
//! │        (append, delete, query, strings, split, concat)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌──────────────┐
//!   │   Header    │ │ FrameCodec  │   │ String Table │
//!   │ (214 bytes) │ │ (per field) │   │   (varint)   │
//!   └──────┬──────┘ └──────┬──────┘   └──────┬───────┘
//!          │               │                 │
//!          └───────┬───────┴─────────────────┘
//!                  ▼
//!   ┌─────────────────────────────┐   ┌─────────────────────┐
//!   │  Storage (File / Cursor)    │   │ Schema (FrameInfo)  │
//!   └─────────────────────────────┘   └─────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod schema;
pub mod format;
pub mod storage;
pub mod file;
pub mod organizer;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Access, Config};
pub use error::{FwobError, Result, SchemaError};
pub use file::{Frames, FwobFile};
pub use organizer::{concat, fix_file_length, split, FixOutcome};
pub use schema::{DeclaredType, FieldDecl, FieldValues, Frame, FrameDefinition, FrameInfo, FrameKey, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the fwob crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
