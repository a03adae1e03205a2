//! Frame Codec
//!
//! Walks a [`FrameInfo`] field list to translate frames to and from their
//! fixed-width bytes.
//!
//! ## Field Encoding
//! - Scalars: native width, little-endian
//! - Strings: UTF-8, right-padded with NUL to the declared length; longer
//!   strings are rejected, never truncated

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{FwobError, Result};
use crate::schema::{DeclaredType, FieldInfo, FieldValues, Frame, FrameInfo, FrameKey, Value};
use crate::storage::Storage;

/// Schema-driven encoder/decoder for frames of type `F`
pub struct FrameCodec<F: Frame> {
    info: Arc<FrameInfo>,
    _frame: PhantomData<fn() -> F>,
}

impl<F: Frame> Clone for FrameCodec<F> {
    fn clone(&self) -> Self {
        Self {
            info: Arc::clone(&self.info),
            _frame: PhantomData,
        }
    }
}

impl<F: Frame> FrameCodec<F> {
    /// Codec for `F`, deriving its layout on first use
    pub fn new() -> Result<Self> {
        Ok(Self {
            info: FrameInfo::of::<F>()?,
            _frame: PhantomData,
        })
    }

    pub fn info(&self) -> &Arc<FrameInfo> {
        &self.info
    }

    pub fn frame_length(&self) -> usize {
        self.info.frame_length()
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Append the encoded bytes of `frame` to `out`.
    ///
    /// On error nothing is appended.
    pub fn encode(&self, frame: &F, out: &mut Vec<u8>) -> Result<()> {
        let mut values = Vec::with_capacity(self.info.fields().len());
        frame.write_values(&mut values);

        if values.len() != self.info.fields().len() {
            return Err(FwobError::ValueMismatch {
                field: self.info.frame_type().to_string(),
                expected: format!(
                    "{} field values, got {}",
                    self.info.fields().len(),
                    values.len()
                ),
            });
        }

        let mut bytes = vec![0u8; self.info.frame_length()];
        for (field, value) in self.info.fields().iter().zip(values) {
            let slot = &mut bytes[field.offset..field.offset + field.length];
            encode_field(field, value, slot)?;
        }
        out.extend_from_slice(&bytes);
        Ok(())
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decode one frame from exactly `frame_length` bytes
    pub fn decode(&self, bytes: &[u8]) -> Result<F> {
        let values = self.decode_values(bytes)?;
        F::read_values(&mut FieldValues::new(self.info.fields(), values))
    }

    /// Decode the raw field values of one frame
    pub fn decode_values(&self, bytes: &[u8]) -> Result<Vec<Value>> {
        self.info
            .fields()
            .iter()
            .map(|field| decode_field(field, &bytes[field.offset..field.offset + field.length]))
            .collect()
    }

    /// Key of an encoded frame
    pub fn key_of(&self, bytes: &[u8]) -> F::Key {
        F::Key::from_le_slice(&bytes[self.info.key_offset()..])
    }

    /// Read only the key of the frame starting at `frame_position`
    pub fn read_key_at<S: Storage + ?Sized>(&self, storage: &mut S, frame_position: u64) -> Result<F::Key> {
        let field = self.info.key_field();
        let mut buf = [0u8; 8];
        storage.read_exact_at(
            frame_position + field.offset as u64,
            &mut buf[..field.length],
        )?;
        Ok(F::Key::from_le_slice(&buf[..field.length]))
    }
}

fn encode_field(field: &FieldInfo, value: Value, slot: &mut [u8]) -> Result<()> {
    if value.declared_type() != field.declared {
        return Err(FwobError::ValueMismatch {
            field: field.name.clone(),
            expected: format!("{:?}, got {:?}", field.declared, value.declared_type()),
        });
    }

    match value {
        Value::I8(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::I16(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::I32(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::I64(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::U8(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::U16(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::U32(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::U64(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::F32(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::F64(v) => slot.copy_from_slice(&v.to_le_bytes()),
        Value::Str(s) => {
            if s.len() > field.length {
                return Err(FwobError::StringTooLong {
                    field: field.name.clone(),
                    value: s,
                    limit: field.length,
                });
            }
            let bytes = s.as_bytes();
            slot[..bytes.len()].copy_from_slice(bytes);
            slot[bytes.len()..].fill(0);
        }
    }
    Ok(())
}

fn decode_field(field: &FieldInfo, slot: &[u8]) -> Result<Value> {
    let value = match field.declared {
        DeclaredType::I8 => Value::I8(i8::from_le_slice(slot)),
        DeclaredType::I16 => Value::I16(i16::from_le_slice(slot)),
        DeclaredType::I32 => Value::I32(i32::from_le_slice(slot)),
        DeclaredType::I64 => Value::I64(i64::from_le_slice(slot)),
        DeclaredType::U8 => Value::U8(u8::from_le_slice(slot)),
        DeclaredType::U16 => Value::U16(u16::from_le_slice(slot)),
        DeclaredType::U32 => Value::U32(u32::from_le_slice(slot)),
        DeclaredType::U64 => Value::U64(u64::from_le_slice(slot)),
        DeclaredType::F32 => Value::F32(f32::from_le_slice(slot)),
        DeclaredType::F64 => Value::F64(f64::from_le_slice(slot)),
        DeclaredType::String => {
            let end = slot.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            let text = std::str::from_utf8(&slot[..end]).map_err(|_| FwobError::ValueMismatch {
                field: field.name.clone(),
                expected: "valid UTF-8 string bytes".to_string(),
            })?;
            Value::Str(text.to_string())
        }
        DeclaredType::Bool | DeclaredType::Char => {
            return Err(FwobError::ValueMismatch {
                field: field.name.clone(),
                expected: format!("supported type, found {:?}", field.declared),
            })
        }
    };
    Ok(value)
}
