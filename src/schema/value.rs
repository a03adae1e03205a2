//! Field values
//!
//! Frames cross the codec boundary as an ordered list of [`Value`]s, one per
//! non-ignored field.

use crate::error::{FwobError, Result};

use super::{DeclaredType, FieldInfo, FrameKey};

/// A single decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl Value {
    /// Declared type this value satisfies
    pub fn declared_type(&self) -> DeclaredType {
        match self {
            Value::I8(_) => DeclaredType::I8,
            Value::I16(_) => DeclaredType::I16,
            Value::I32(_) => DeclaredType::I32,
            Value::I64(_) => DeclaredType::I64,
            Value::U8(_) => DeclaredType::U8,
            Value::U16(_) => DeclaredType::U16,
            Value::U32(_) => DeclaredType::U32,
            Value::U64(_) => DeclaredType::U64,
            Value::F32(_) => DeclaredType::F32,
            Value::F64(_) => DeclaredType::F64,
            Value::Str(_) => DeclaredType::String,
        }
    }
}

/// Conversion out of a [`Value`]
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! scalar_value {
    ($($variant:ident => $t:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }

            impl FromValue for $t {
                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl FrameKey for $t {
                const DECLARED: DeclaredType = DeclaredType::$variant;

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

scalar_value! {
    I8 => i8,
    I16 => i16,
    I32 => i32,
    I64 => i64,
    U8 => u8,
    U16 => u16,
    U32 => u32,
    U64 => u64,
    F32 => f32,
    F64 => f64,
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Ordered decoded values handed to [`Frame::read_values`](super::Frame::read_values)
pub struct FieldValues<'a> {
    fields: &'a [FieldInfo],
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl<'a> FieldValues<'a> {
    pub(crate) fn new(fields: &'a [FieldInfo], values: Vec<Value>) -> Self {
        Self {
            fields,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Take the next field value, converting it to `T`
    pub fn next<T: FromValue>(&mut self) -> Result<T> {
        let field = self
            .fields
            .get(self.position)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| format!("#{}", self.position));
        self.position += 1;

        let value = self.values.next().ok_or_else(|| FwobError::ValueMismatch {
            field: field.clone(),
            expected: "a value, found end of frame".to_string(),
        })?;
        let found = value.declared_type();
        T::from_value(value).ok_or_else(|| FwobError::ValueMismatch {
            field,
            expected: format!(
                "{}, found {:?}",
                std::any::type_name::<T>(),
                found
            ),
        })
    }
}
