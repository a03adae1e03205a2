//! Frame layout derivation
//!
//! Turns a [`FrameDefinition`] into an immutable [`FrameInfo`]: byte offsets,
//! type codes and the key field. Derivation is pure; every schema problem is
//! reported here and never during file I/O.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::error::SchemaError;

use super::{DeclaredType, FieldDecl, Frame, FrameDefinition, FrameKey};

/// Maximum number of encoded fields per frame type
pub const MAX_FIELDS: usize = 16;

/// Maximum field name length in bytes
pub const MAX_FIELD_NAME_LENGTH: usize = 8;

/// Maximum declared length of a string field in bytes
pub const MAX_STRING_FIELD_LENGTH: usize = 255;

/// Maximum frame type name length in bytes
pub const MAX_FRAME_TYPE_LENGTH: usize = 16;

/// 4-bit type code stored in the header for each field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    SignedInteger = 0,
    UnsignedInteger = 1,
    FloatingPoint = 2,
    Utf8String = 3,
    StringTableIndex = 4,
}

impl FieldType {
    /// Creates a FieldType from its 4-bit code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::SignedInteger),
            1 => Some(Self::UnsignedInteger),
            2 => Some(Self::FloatingPoint),
            3 => Some(Self::Utf8String),
            4 => Some(Self::StringTableIndex),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Layout of one encoded field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub offset: usize,
    pub length: usize,
    pub declared: DeclaredType,
    pub field_type: FieldType,
    pub is_key: bool,
}

/// Immutable binary layout of a frame type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    frame_type: String,
    fields: Vec<FieldInfo>,
    frame_length: usize,
    key_index: usize,
}

impl FrameInfo {
    /// Derive the layout of `definition`, keyed by `K`.
    ///
    /// Fields are taken in declaration order with ignored ones skipped. The
    /// key is the field explicitly marked `key`, or failing that the first
    /// field whose declared type is `K`.
    pub fn derive<K: FrameKey>(definition: &FrameDefinition) -> Result<Self, SchemaError> {
        let frame_type = definition.name().to_string();
        if frame_type.is_empty() || frame_type.len() > MAX_FRAME_TYPE_LENGTH {
            return Err(SchemaError::FrameTypeNameTooLong {
                name: frame_type,
                limit: MAX_FRAME_TYPE_LENGTH,
            });
        }
        check_paddable(&frame_type)?;

        let mut fields = Vec::new();
        let mut offset = 0usize;
        let mut explicit_keys: Vec<usize> = Vec::new();
        let mut fallback_key: Option<usize> = None;

        for decl in definition.fields() {
            if decl.is_ignored {
                if decl.is_key {
                    return Err(SchemaError::KeyIgnored {
                        frame_type,
                        field: decl.name.clone(),
                    });
                }
                continue;
            }

            let (length, field_type) = classify(decl)?;
            let index = fields.len();

            if decl.is_key {
                explicit_keys.push(index);
            }
            if fallback_key.is_none() && decl.declared == K::DECLARED {
                fallback_key = Some(index);
            }

            fields.push(FieldInfo {
                name: decl.name.clone(),
                offset,
                length,
                declared: decl.declared,
                field_type,
                is_key: false,
            });
            offset += length;
        }

        if fields.is_empty() {
            return Err(SchemaError::NoFields { frame_type });
        }
        if fields.len() > MAX_FIELDS {
            return Err(SchemaError::TooManyFields {
                frame_type,
                count: fields.len(),
                limit: MAX_FIELDS,
            });
        }

        let key_index = match explicit_keys.as_slice() {
            [] => fallback_key.ok_or_else(|| SchemaError::KeyUndefined {
                frame_type: frame_type.clone(),
            })?,
            [index] => {
                let field = &fields[*index];
                if field.declared != K::DECLARED {
                    return Err(SchemaError::KeyTypeMismatch {
                        frame_type,
                        field: field.name.clone(),
                        expected: K::DECLARED,
                        actual: field.declared,
                    });
                }
                *index
            }
            many => {
                return Err(SchemaError::AmbiguousKey {
                    frame_type,
                    fields: many.iter().map(|&i| fields[i].name.clone()).collect(),
                })
            }
        };
        fields[key_index].is_key = true;

        Ok(Self {
            frame_type,
            fields,
            frame_length: offset,
            key_index,
        })
    }

    /// Cached layout of frame type `F`.
    ///
    /// Derivation runs once per type; later calls (including failed ones)
    /// return the cached outcome.
    pub fn of<F: Frame>() -> Result<Arc<FrameInfo>, SchemaError> {
        type Cache = RwLock<HashMap<TypeId, Result<Arc<FrameInfo>, SchemaError>>>;
        static CACHE: OnceLock<Cache> = OnceLock::new();

        let cache = CACHE.get_or_init(|| RwLock::new(HashMap::new()));
        let type_id = TypeId::of::<F>();

        if let Some(cached) = cache.read().get(&type_id) {
            return cached.clone();
        }

        let derived = FrameInfo::derive::<F::Key>(&F::definition()).map(Arc::new);
        cache
            .write()
            .entry(type_id)
            .or_insert(derived)
            .clone()
    }

    pub fn frame_type(&self) -> &str {
        &self.frame_type
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Encoded size of one frame in bytes
    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn key_index(&self) -> usize {
        self.key_index
    }

    pub fn key_field(&self) -> &FieldInfo {
        &self.fields[self.key_index]
    }

    /// Byte offset of the key inside a frame
    pub fn key_offset(&self) -> usize {
        self.fields[self.key_index].offset
    }

    /// Type codes packed 4 bits per field, field `i` at bits `[4i, 4i+4)`
    pub fn packed_types(&self) -> u64 {
        self.fields
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, f)| acc | (u64::from(f.field_type.code()) << (4 * i)))
    }
}

/// Header names are space-padded, so a trailing space or NUL would not survive
/// a round trip
fn check_paddable(name: &str) -> Result<(), SchemaError> {
    if name.ends_with(' ') || name.contains('\0') {
        return Err(SchemaError::NameNotPaddable {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Byte length and type code of a non-ignored field
fn classify(decl: &FieldDecl) -> Result<(usize, FieldType), SchemaError> {
    if decl.name.is_empty() || decl.name.len() > MAX_FIELD_NAME_LENGTH {
        return Err(SchemaError::FieldNameTooLong {
            field: decl.name.clone(),
            limit: MAX_FIELD_NAME_LENGTH,
        });
    }
    check_paddable(&decl.name)?;

    let unsupported = || SchemaError::FieldTypeNotSupported {
        field: decl.name.clone(),
        declared: decl.declared,
    };

    match decl.declared {
        DeclaredType::Bool | DeclaredType::Char => Err(unsupported()),
        DeclaredType::String => {
            if decl.string_table_index {
                return Err(unsupported());
            }
            let length = decl.length.ok_or_else(|| SchemaError::FieldLengthUndefined {
                field: decl.name.clone(),
            })?;
            if length == 0 || length > MAX_STRING_FIELD_LENGTH {
                return Err(SchemaError::FieldLengthOutOfRange {
                    field: decl.name.clone(),
                    length,
                    limit: MAX_STRING_FIELD_LENGTH,
                });
            }
            Ok((length, FieldType::Utf8String))
        }
        scalar => {
            if decl.length.is_some() {
                return Err(SchemaError::FieldLengthNotAllowed {
                    field: decl.name.clone(),
                });
            }
            let width = scalar.scalar_width().ok_or_else(unsupported)?;
            let field_type = if decl.string_table_index {
                if !scalar.is_integer() {
                    return Err(unsupported());
                }
                FieldType::StringTableIndex
            } else if scalar.is_signed_integer() {
                FieldType::SignedInteger
            } else if scalar.is_unsigned_integer() {
                FieldType::UnsignedInteger
            } else {
                FieldType::FloatingPoint
            };
            Ok((width, field_type))
        }
    }
}
