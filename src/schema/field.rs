// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Field definitions for ULog message formats.
//!
//! A field is a named, typed element inside a message format. It can be of
//! a basic type (integers, floats, `bool`, `char`), a fixed-size array of a
//! basic type, or reference another message format (nested field). Nested
//! fields are resolved after the log header has been fully read, once all
//! message formats are known.
//!
//! A field is "resolved" when its byte offset inside the message is
//! assigned and, for nested fields, the child format reference is wired.

use std::fmt;
use std::sync::Arc;

use crate::core::{Result, UlogError};
use crate::schema::format::MessageFormat;

/// Basic type of a field. Arrays carry one of these as element type;
/// `Nested` references a child [`MessageFormat`] by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    /// 8-bit signed integer
    Int8,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit signed integer
    Int16,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit signed integer
    Int32,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Boolean
    Bool,
    /// Character (one byte; `char[N]` is a fixed-length string)
    Char,
    /// Reference to another message format
    Nested,
}

impl BasicType {
    /// Size of one element of this type in bytes. Nested types report 0
    /// until their format is resolved.
    pub const fn size(self) -> usize {
        match self {
            BasicType::Int8 | BasicType::UInt8 | BasicType::Bool | BasicType::Char => 1,
            BasicType::Int16 | BasicType::UInt16 => 2,
            BasicType::Int32 | BasicType::UInt32 | BasicType::Float => 4,
            BasicType::Int64 | BasicType::UInt64 | BasicType::Double => 8,
            BasicType::Nested => 0,
        }
    }

    /// Parse a basic type from its ULog type string. Returns `None` for
    /// anything that is not one of the 12 basic types.
    pub fn from_type_str(s: &str) -> Option<Self> {
        match s {
            "int8_t" => Some(BasicType::Int8),
            "uint8_t" => Some(BasicType::UInt8),
            "int16_t" => Some(BasicType::Int16),
            "uint16_t" => Some(BasicType::UInt16),
            "int32_t" => Some(BasicType::Int32),
            "uint32_t" => Some(BasicType::UInt32),
            "int64_t" => Some(BasicType::Int64),
            "uint64_t" => Some(BasicType::UInt64),
            "float" => Some(BasicType::Float),
            "double" => Some(BasicType::Double),
            "bool" => Some(BasicType::Bool),
            "char" => Some(BasicType::Char),
            _ => None,
        }
    }
}

/// A named, typed element of a message format.
///
/// Fields also appear standalone in info, parameter, and parameter-default
/// records, which are single-field key/value messages.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    type_name: String,
    basic_type: BasicType,
    array_length: Option<usize>,
    offset_in_message: Option<usize>,
    element_size: usize,
    nested_format: Option<Arc<MessageFormat>>,
}

impl Field {
    /// Create a scalar field from a type string and a name. Unknown type
    /// strings produce an unresolved nested field.
    pub fn new(type_str: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_array_length(type_str, name, None)
    }

    /// Create a fixed-size array field.
    pub fn new_array(type_str: impl Into<String>, name: impl Into<String>, len: usize) -> Self {
        Self::with_array_length(type_str, name, Some(len))
    }

    fn with_array_length(
        type_str: impl Into<String>,
        name: impl Into<String>,
        array_length: Option<usize>,
    ) -> Self {
        let type_name = type_str.into();
        let basic_type = BasicType::from_type_str(&type_name).unwrap_or(BasicType::Nested);
        Field {
            name: name.into(),
            type_name,
            basic_type,
            array_length,
            offset_in_message: None,
            element_size: basic_type.size(),
            nested_format: None,
        }
    }

    /// Parse a field from its text form: `"<type> <name>"` or
    /// `"<type>[<len>] <name>"`.
    pub fn parse(text: &str) -> Result<Self> {
        let space = text
            .find(' ')
            .ok_or_else(|| UlogError::parse("Field", format!("invalid field format: '{text}'")))?;
        let (type_part, name) = (&text[..space], &text[space + 1..]);

        let (type_name, array_length) = match type_part.find('[') {
            None => (type_part, None),
            Some(bracket) => {
                if !type_part.ends_with(']') {
                    return Err(UlogError::parse(
                        "Field",
                        format!("invalid field format (missing ']'): '{text}'"),
                    ));
                }
                let len_str = &type_part[bracket + 1..type_part.len() - 1];
                let len = len_str.parse::<usize>().map_err(|_| {
                    UlogError::parse("Field", format!("invalid array length: '{len_str}'"))
                })?;
                (&type_part[..bracket], Some(len))
            }
        };

        Ok(Self::with_array_length(type_name, name, array_length))
    }

    /// Encode the field back into its text form, the inverse of
    /// [`Field::parse`].
    pub fn encode(&self) -> String {
        match self.array_length {
            Some(len) => format!("{}[{}] {}", self.type_name, len, self.name),
            None => format!("{} {}", self.type_name, self.name),
        }
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ULog type string (`"uint64_t"`, `"float"`, or a nested format
    /// name).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The basic type of this field.
    pub fn basic_type(&self) -> BasicType {
        self.basic_type
    }

    /// Array length, `None` for scalar fields.
    pub fn array_length(&self) -> Option<usize> {
        self.array_length
    }

    /// Byte offset of this field inside the message, assigned during
    /// resolution. `None` while unresolved.
    pub fn offset_in_message(&self) -> Option<usize> {
        self.offset_in_message
    }

    /// Size of one element in bytes. For nested fields this is the child
    /// format size, valid only once resolved.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// True once the offset is assigned and, for nested fields, the child
    /// format is wired.
    pub fn is_resolved(&self) -> bool {
        self.offset_in_message.is_some()
            && (self.basic_type != BasicType::Nested || self.nested_format.is_some())
    }

    /// Total size of the field in bytes: element size times array length.
    pub fn size_bytes(&self) -> Result<usize> {
        if !self.is_resolved() {
            return Err(UlogError::parse(
                "Field",
                format!("unresolved type '{}'", self.type_name),
            ));
        }
        Ok(self.element_size * self.array_length.unwrap_or(1))
    }

    /// The child format of a nested field.
    pub fn nested_format(&self) -> Result<&Arc<MessageFormat>> {
        if self.basic_type != BasicType::Nested {
            return Err(UlogError::access(format!(
                "field '{}' is not a nested type",
                self.name
            )));
        }
        self.nested_format.as_ref().ok_or_else(|| {
            UlogError::access(format!("nested field '{}' is not resolved", self.name))
        })
    }

    /// Look up a field of the child format by name, for nested fields.
    pub fn nested_field(&self, name: &str) -> Result<&Field> {
        self.nested_format()?.field(name)
    }

    /// Assign the offset and wire the nested child format, if any.
    /// Idempotent: an already-resolved field is left untouched.
    pub(crate) fn resolve(
        &mut self,
        known_formats: &std::collections::BTreeMap<String, Arc<MessageFormat>>,
        offset: usize,
    ) -> Result<()> {
        if self.is_resolved() {
            return Ok(());
        }
        if self.basic_type != BasicType::Nested {
            self.offset_in_message = Some(offset);
            return Ok(());
        }
        let child = known_formats
            .get(&self.type_name)
            .ok_or_else(|| UlogError::format_not_found(&self.type_name))?
            .clone();
        self.attach_nested(&child, offset)
    }

    /// Wire an already-resolved child format into a nested field.
    pub(crate) fn attach_nested(
        &mut self,
        child: &Arc<MessageFormat>,
        offset: usize,
    ) -> Result<()> {
        if self.is_resolved() {
            return Ok(());
        }
        self.element_size = child.size_bytes()?;
        self.nested_format = Some(Arc::clone(child));
        self.offset_in_message = Some(offset);
        Ok(())
    }

    /// Resolve a field that is known not to be nested, without a registry.
    /// Used for info and parameter fields, which live at offset 0 of their
    /// record value.
    pub(crate) fn resolve_basic(&mut self, offset: usize) -> Result<()> {
        if self.is_resolved() {
            return Ok(());
        }
        if self.basic_type == BasicType::Nested {
            return Err(UlogError::parse(
                "Field",
                format!("nested type '{}' not resolved", self.type_name),
            ));
        }
        self.offset_in_message = Some(offset);
        Ok(())
    }
}

/// Two fields are equal if their type, array length and name match.
/// Resolution state is not part of the comparison.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.array_length == other.array_length
            && self.name == other.name
    }
}

impl Eq for Field {}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
