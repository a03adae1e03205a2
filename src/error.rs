//! Error types for FWOB
//!
//! Provides a unified error type for all file operations, plus a separate
//! [`SchemaError`] for problems detected while deriving a frame layout.

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::DeclaredType;

/// Result type alias using FwobError
pub type Result<T> = std::result::Result<T, FwobError>;

/// Unified error type for FWOB operations
#[derive(Debug, Error)]
pub enum FwobError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Schema Errors (raised once, at derivation time)
    // -------------------------------------------------------------------------
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    // -------------------------------------------------------------------------
    // Format / Corruption Errors
    // -------------------------------------------------------------------------
    #[error("Invalid FWOB header in {path}")]
    InvalidHeader { path: PathBuf },

    #[error("Frame type mismatch in {path}: {reason}")]
    FrameTypeMismatch { path: PathBuf, reason: String },

    #[error("File length mismatch in {path}: header implies {expected} bytes, file has {actual}")]
    FileLengthMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("String table corrupted in {path}: {reason}")]
    StringTableCorrupted { path: PathBuf, reason: String },

    // -------------------------------------------------------------------------
    // Access Errors
    // -------------------------------------------------------------------------
    #[error("File {path} was opened read-only")]
    ReadOnly { path: PathBuf },

    #[error("File {path} is closed")]
    Closed { path: PathBuf },

    // -------------------------------------------------------------------------
    // Invariant Violations
    // -------------------------------------------------------------------------
    #[error("Key order violation in {path}: key {key} precedes last key {last_key} ({committed} frames committed)")]
    KeyOrderViolation {
        path: PathBuf,
        key: String,
        last_key: String,
        committed: u64,
    },

    #[error("Invalid key list: {0}")]
    InvalidKeyList(String),

    #[error("Invalid range: first key {first} is greater than last key {last}")]
    InvalidRange { first: String, last: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("String table full in {path}: need {needed} bytes, {available} available")]
    StringTableFull {
        path: PathBuf,
        needed: u64,
        available: u64,
    },

    #[error("String too long for field {field}: {value:?} exceeds {limit} bytes")]
    StringTooLong {
        field: String,
        value: String,
        limit: usize,
    },

    #[error("Title too long: {title:?} exceeds {limit} bytes")]
    TitleTooLong { title: String, limit: usize },

    // -------------------------------------------------------------------------
    // Multi-file Errors
    // -------------------------------------------------------------------------
    #[error("Title mismatch in {path}: expected {expected:?}, got {actual:?}")]
    TitleMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("String table of {path} is incompatible at index {index}: {reason}")]
    StringTableIncompatible {
        path: PathBuf,
        index: u32,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // Value Conversion Errors
    // -------------------------------------------------------------------------
    #[error("Value mismatch for field {field}: expected {expected}")]
    ValueMismatch { field: String, expected: String },
}

/// Errors detected while deriving a frame layout from its definition.
///
/// These never occur during I/O; a frame type either derives cleanly the first
/// time it is used or fails the same way every time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Frame type {frame_type} has no key field")]
    KeyUndefined { frame_type: String },

    #[error("Frame type {frame_type} marks more than one key field: {fields:?}")]
    AmbiguousKey {
        frame_type: String,
        fields: Vec<String>,
    },

    #[error("Key field {field} of frame type {frame_type} is marked ignored")]
    KeyIgnored { frame_type: String, field: String },

    #[error("Key field {field} of frame type {frame_type} is {actual:?}, key type is {expected:?}")]
    KeyTypeMismatch {
        frame_type: String,
        field: String,
        expected: DeclaredType,
        actual: DeclaredType,
    },

    #[error("Frame type {frame_type} has no fields")]
    NoFields { frame_type: String },

    #[error("Frame type {frame_type} has {count} fields, at most {limit} are allowed")]
    TooManyFields {
        frame_type: String,
        count: usize,
        limit: usize,
    },

    #[error("Field name {field:?} must be 1 to {limit} bytes")]
    FieldNameTooLong { field: String, limit: usize },

    #[error("String field {field} has no declared length")]
    FieldLengthUndefined { field: String },

    #[error("Field {field} declares length {length}, allowed range is 1..={limit}")]
    FieldLengthOutOfRange {
        field: String,
        length: usize,
        limit: usize,
    },

    #[error("Field {field} is not a string and cannot declare a length")]
    FieldLengthNotAllowed { field: String },

    #[error("Field {field} has unsupported type {declared:?}")]
    FieldTypeNotSupported {
        field: String,
        declared: DeclaredType,
    },

    #[error("Frame type name {name:?} must be 1 to {limit} bytes")]
    FrameTypeNameTooLong { name: String, limit: usize },

    #[error("Name {name:?} ends with a space or contains a NUL byte and cannot be stored padded")]
    NameNotPaddable { name: String },
}
