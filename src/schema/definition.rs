//! Frame definitions
//!
//! The declared shape of a frame record: an ordered list of named, typed
//! fields with annotations. This is the input to layout derivation.

/// Declared Rust type of a frame field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    /// Declarable, but has no FWOB encoding
    Bool,
    /// Declarable, but has no FWOB encoding
    Char,
}

impl DeclaredType {
    /// Byte width of a scalar type; `None` for strings and unsupported types
    pub fn scalar_width(self) -> Option<usize> {
        match self {
            DeclaredType::I8 | DeclaredType::U8 => Some(1),
            DeclaredType::I16 | DeclaredType::U16 => Some(2),
            DeclaredType::I32 | DeclaredType::U32 | DeclaredType::F32 => Some(4),
            DeclaredType::I64 | DeclaredType::U64 | DeclaredType::F64 => Some(8),
            DeclaredType::String | DeclaredType::Bool | DeclaredType::Char => None,
        }
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            DeclaredType::I8 | DeclaredType::I16 | DeclaredType::I32 | DeclaredType::I64
        )
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            DeclaredType::U8 | DeclaredType::U16 | DeclaredType::U32 | DeclaredType::U64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(self) -> bool {
        matches!(self, DeclaredType::F32 | DeclaredType::F64)
    }
}

/// One declared field of a frame, with its annotations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub declared: DeclaredType,
    pub is_key: bool,
    pub is_ignored: bool,
    pub length: Option<usize>,
    pub string_table_index: bool,
}

impl FieldDecl {
    /// Declare a field with no annotations
    pub fn new(name: impl Into<String>, declared: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared,
            is_key: false,
            is_ignored: false,
            length: None,
            string_table_index: false,
        }
    }

    /// Mark this field as the sort key
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    /// Exclude this field from the binary layout
    pub fn ignored(mut self) -> Self {
        self.is_ignored = true;
        self
    }

    /// Declare the fixed byte length of a string field
    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Mark an integer field as holding a string-table index
    pub fn string_table_index(mut self) -> Self {
        self.string_table_index = true;
        self
    }
}

/// Declared shape of a frame type
///
/// ```
/// use fwob::schema::{DeclaredType, FieldDecl, FrameDefinition};
///
/// let def = FrameDefinition::new("Tick")
///     .field(FieldDecl::new("Time", DeclaredType::I64).key())
///     .field(FieldDecl::new("Price", DeclaredType::F64))
///     .field(FieldDecl::new("Sym", DeclaredType::String).length(4));
/// assert_eq!(def.fields().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDefinition {
    name: String,
    fields: Vec<FieldDecl>,
}

impl FrameDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field declaration
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }
}
