// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Lazy typed view over raw record bytes.
//!
//! A [`Value`] borrows a field definition and the backing bytes of a
//! sample (or info/parameter value) and decodes on demand:
//!
//! - scalar fields decode little-endian at the field's resolved offset;
//! - whole arrays decode into [`NativeValue::Array`], `char[N]` into a
//!   NUL-terminated string;
//! - indexing (`at_index`) and nested member access (`member`,
//!   `member_by_name`) return new views over the same backing bytes
//!   without copying.
//!
//! Every access is bounds-checked against the backing slice; samples may
//! legally be shorter than their format's nominal size (tail truncation),
//! so failures surface per access, not at ingest.

use byteorder::{ByteOrder, LittleEndian};

use crate::core::{FromValue, NativeValue, Result, UlogError};
use crate::schema::field::{BasicType, Field};

/// A typed view on one field of a backing byte slice.
#[derive(Debug, Clone, Copy)]
pub struct Value<'a> {
    field: &'a Field,
    backing: &'a [u8],
    array_index: Option<usize>,
}

impl<'a> Value<'a> {
    /// Create a view of `field` over `backing`.
    pub fn new(field: &'a Field, backing: &'a [u8]) -> Self {
        Value {
            field,
            backing,
            array_index: None,
        }
    }

    /// The field definition this view decodes with.
    pub fn field(&self) -> &'a Field {
        self.field
    }

    /// Decode the value in the type the message format declares.
    ///
    /// Scalar fields and indexed array elements decode as their scalar
    /// kind. Whole array fields decode as [`NativeValue::Array`], except
    /// `char[N]` which decodes as a string cut at the first NUL byte (or
    /// the full array length when no NUL is present).
    pub fn native(&self) -> Result<NativeValue> {
        let offset = self.resolved_offset()?;

        if self.array_index.is_some() && self.field.array_length().is_none() {
            return Err(UlogError::access(format!(
                "cannot access array element of non-array field '{}'",
                self.field.name()
            )));
        }

        match self.field.array_length() {
            // scalar, or an explicitly selected array element
            None => self.read_scalar(offset, 0),
            Some(_) if self.array_index.is_some() => {
                self.read_scalar(offset, self.array_index.unwrap_or(0))
            }
            Some(len) => {
                if self.field.basic_type() == BasicType::Char {
                    return self.read_string(offset, len);
                }
                let mut items = Vec::with_capacity(len);
                for index in 0..len {
                    items.push(self.read_scalar(offset, index)?);
                }
                Ok(NativeValue::Array(items))
            }
        }
    }

    /// Decode and convert to `T` using the [`FromValue`] coercion rules.
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(&self.native()?)
    }

    /// Access a field of a nested message by field handle. The handle
    /// must belong to this field's child format.
    pub fn member<'b>(&self, field: &'b Field) -> Result<Value<'b>>
    where
        'a: 'b,
    {
        if self.field.basic_type() != BasicType::Nested {
            return Err(UlogError::access(format!(
                "cannot access member of non-nested field '{}'",
                self.field.name()
            )));
        }
        let base = self.resolved_offset()?;
        let submessage_offset = base
            + self
                .array_index
                .map(|index| index * self.field.element_size())
                .unwrap_or(0);
        let backing = self.backing.get(submessage_offset..).ok_or_else(|| {
            UlogError::buffer_too_short(submessage_offset, self.backing.len(), submessage_offset)
        })?;
        Ok(Value {
            field,
            backing,
            array_index: None,
        })
    }

    /// Access a field of a nested message by name.
    pub fn member_by_name(&self, name: &str) -> Result<Value<'a>> {
        let field = self.field.nested_field(name)?;
        self.member(field)
    }

    /// Select one element of an array field. The returned view decodes as
    /// a scalar (or, for nested arrays, as the base of further member
    /// access).
    pub fn at_index(&self, index: usize) -> Result<Value<'a>> {
        let Some(len) = self.field.array_length() else {
            return Err(UlogError::access(format!(
                "cannot index non-array field '{}'",
                self.field.name()
            )));
        };
        if index >= len {
            return Err(UlogError::access(format!(
                "index {index} out of bounds for field '{}' of length {len}",
                self.field.name()
            )));
        }
        Ok(Value {
            field: self.field,
            backing: self.backing,
            array_index: Some(index),
        })
    }

    fn resolved_offset(&self) -> Result<usize> {
        self.field.offset_in_message().ok_or_else(|| {
            UlogError::access(format!("field '{}' is not resolved", self.field.name()))
        })
    }

    fn read_string(&self, offset: usize, len: usize) -> Result<NativeValue> {
        let end = offset + len;
        if end > self.backing.len() {
            return Err(UlogError::buffer_too_short(
                len,
                self.backing.len().saturating_sub(offset),
                offset,
            ));
        }
        let bytes = &self.backing[offset..end];
        let string_len = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        Ok(NativeValue::String(
            String::from_utf8_lossy(&bytes[..string_len]).into_owned(),
        ))
    }

    fn read_scalar(&self, offset: usize, array_offset: usize) -> Result<NativeValue> {
        let basic_type = self.field.basic_type();
        if basic_type == BasicType::Nested {
            return Err(UlogError::access(format!(
                "cannot decode nested field '{}' as a basic type",
                self.field.name()
            )));
        }
        let size = basic_type.size();
        let total_offset = offset + array_offset * size;
        if total_offset + size > self.backing.len() {
            return Err(UlogError::buffer_too_short(
                size,
                self.backing.len().saturating_sub(total_offset),
                total_offset,
            ));
        }
        let bytes = &self.backing[total_offset..total_offset + size];
        Ok(match basic_type {
            BasicType::Int8 => NativeValue::Int8(bytes[0] as i8),
            BasicType::UInt8 => NativeValue::UInt8(bytes[0]),
            BasicType::Int16 => NativeValue::Int16(LittleEndian::read_i16(bytes)),
            BasicType::UInt16 => NativeValue::UInt16(LittleEndian::read_u16(bytes)),
            BasicType::Int32 => NativeValue::Int32(LittleEndian::read_i32(bytes)),
            BasicType::UInt32 => NativeValue::UInt32(LittleEndian::read_u32(bytes)),
            BasicType::Int64 => NativeValue::Int64(LittleEndian::read_i64(bytes)),
            BasicType::UInt64 => NativeValue::UInt64(LittleEndian::read_u64(bytes)),
            BasicType::Float => NativeValue::Float(LittleEndian::read_f32(bytes)),
            BasicType::Double => NativeValue::Double(LittleEndian::read_f64(bytes)),
            BasicType::Bool => NativeValue::Bool(bytes[0] != 0),
            BasicType::Char => NativeValue::Char(bytes[0]),
            BasicType::Nested => unreachable!("checked above"),
        })
    }
}
