// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Native value type system.
//!
//! Provides a unified representation for values decoded from ULog samples,
//! info messages, and parameters. A decoded value always carries the type
//! that the message format declares; cross-type conversion happens
//! explicitly through [`FromValue`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{Result, UlogError};

/// A decoded ULog value in its native (format-declared) type.
///
/// Scalar fields decode into the matching scalar variant. Array fields
/// decode into [`NativeValue::Array`], except `char[N]` which decodes into
/// [`NativeValue::String`] using NUL-terminated string semantics. `char`
/// values are carried as their raw byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeValue {
    // Signed integers
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),

    // Unsigned integers
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),

    // Floating point
    Float(f32),
    Double(f64),

    // Boolean
    Bool(bool),

    // Char, kept as the raw byte
    Char(u8),

    // char[N] fields, NUL-terminated
    String(String),

    // Fixed-size array fields
    Array(Vec<NativeValue>),
}

impl NativeValue {
    /// Check if this value is a numeric type (integers or floats).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            NativeValue::Int8(_)
                | NativeValue::Int16(_)
                | NativeValue::Int32(_)
                | NativeValue::Int64(_)
                | NativeValue::UInt8(_)
                | NativeValue::UInt16(_)
                | NativeValue::UInt32(_)
                | NativeValue::UInt64(_)
                | NativeValue::Float(_)
                | NativeValue::Double(_)
        )
    }

    /// Check if this value is an integer type (signed or unsigned).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            NativeValue::Int8(_)
                | NativeValue::Int16(_)
                | NativeValue::Int32(_)
                | NativeValue::Int64(_)
                | NativeValue::UInt8(_)
                | NativeValue::UInt16(_)
                | NativeValue::UInt32(_)
                | NativeValue::UInt64(_)
        )
    }

    /// Check if this value is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, NativeValue::Float(_) | NativeValue::Double(_))
    }

    /// Check if this value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, NativeValue::Array(_))
    }

    /// Check if this value is a string.
    pub fn is_string(&self) -> bool {
        matches!(self, NativeValue::String(_))
    }

    /// Try to convert this value to f64 (for numeric values only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Int8(v) => Some(*v as f64),
            NativeValue::Int16(v) => Some(*v as f64),
            NativeValue::Int32(v) => Some(*v as f64),
            NativeValue::Int64(v) => Some(*v as f64),
            NativeValue::UInt8(v) => Some(*v as f64),
            NativeValue::UInt16(v) => Some(*v as f64),
            NativeValue::UInt32(v) => Some(*v as f64),
            NativeValue::UInt64(v) => Some(*v as f64),
            NativeValue::Float(v) => Some(*v as f64),
            NativeValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get the inner string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the inner array.
    pub fn as_array(&self) -> Option<&[NativeValue]> {
        match self {
            NativeValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get the type name of this value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Int8(_) => "int8_t",
            NativeValue::Int16(_) => "int16_t",
            NativeValue::Int32(_) => "int32_t",
            NativeValue::Int64(_) => "int64_t",
            NativeValue::UInt8(_) => "uint8_t",
            NativeValue::UInt16(_) => "uint16_t",
            NativeValue::UInt32(_) => "uint32_t",
            NativeValue::UInt64(_) => "uint64_t",
            NativeValue::Float(_) => "float",
            NativeValue::Double(_) => "double",
            NativeValue::Bool(_) => "bool",
            NativeValue::Char(_) => "char",
            NativeValue::String(_) => "string",
            NativeValue::Array(_) => "array",
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Int8(v) => write!(f, "{v}"),
            NativeValue::Int16(v) => write!(f, "{v}"),
            NativeValue::Int32(v) => write!(f, "{v}"),
            NativeValue::Int64(v) => write!(f, "{v}"),
            NativeValue::UInt8(v) => write!(f, "{v}"),
            NativeValue::UInt16(v) => write!(f, "{v}"),
            NativeValue::UInt32(v) => write!(f, "{v}"),
            NativeValue::UInt64(v) => write!(f, "{v}"),
            NativeValue::Float(v) => write!(f, "{v}"),
            NativeValue::Double(v) => write!(f, "{v}"),
            NativeValue::Bool(v) => write!(f, "{v}"),
            NativeValue::Char(v) => write!(f, "{}", *v as char),
            NativeValue::String(v) => write!(f, "\"{v}\""),
            NativeValue::Array(v) => write!(f, "[{} elements]", v.len()),
        }
    }
}

/// Conversion out of a [`NativeValue`] into a concrete Rust type.
///
/// The conversion rules match what downstream ULog tooling expects:
/// - String values convert to `String` only; mixing string and non-string
///   types fails.
/// - An array converts to `Vec<T>` element-wise, casting each element.
/// - An array requested as a scalar yields its first element; an empty
///   array fails.
/// - A scalar requested as `Vec<T>` yields a one-element vector.
/// - Numeric casts use `as` semantics; `char` is reinterpreted as an
///   unsigned byte first, so `char` to integer yields the ASCII code.
pub trait FromValue: Sized {
    /// Convert from the native value representation.
    fn from_value(value: &NativeValue) -> Result<Self>;
}

fn string_mismatch() -> UlogError {
    UlogError::access("cannot convert between string and non-string types")
}

macro_rules! impl_from_value_numeric {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &NativeValue) -> Result<Self> {
                    match value {
                        NativeValue::Int8(v) => Ok(*v as $t),
                        NativeValue::Int16(v) => Ok(*v as $t),
                        NativeValue::Int32(v) => Ok(*v as $t),
                        NativeValue::Int64(v) => Ok(*v as $t),
                        NativeValue::UInt8(v) => Ok(*v as $t),
                        NativeValue::UInt16(v) => Ok(*v as $t),
                        NativeValue::UInt32(v) => Ok(*v as $t),
                        NativeValue::UInt64(v) => Ok(*v as $t),
                        NativeValue::Float(v) => Ok(*v as $t),
                        NativeValue::Double(v) => Ok(*v as $t),
                        NativeValue::Bool(v) => Ok(*v as u8 as $t),
                        // char acts as an unsigned byte in numeric context
                        NativeValue::Char(v) => Ok(*v as $t),
                        NativeValue::String(_) => Err(string_mismatch()),
                        NativeValue::Array(items) => match items.first() {
                            Some(first) => Self::from_value(first),
                            None => Err(UlogError::access(
                                "cannot convert empty array to a scalar",
                            )),
                        },
                    }
                }
            }
        )*
    };
}

impl_from_value_numeric!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl FromValue for bool {
    fn from_value(value: &NativeValue) -> Result<Self> {
        match value {
            NativeValue::Bool(v) => Ok(*v),
            NativeValue::Int8(v) => Ok(*v != 0),
            NativeValue::Int16(v) => Ok(*v != 0),
            NativeValue::Int32(v) => Ok(*v != 0),
            NativeValue::Int64(v) => Ok(*v != 0),
            NativeValue::UInt8(v) => Ok(*v != 0),
            NativeValue::UInt16(v) => Ok(*v != 0),
            NativeValue::UInt32(v) => Ok(*v != 0),
            NativeValue::UInt64(v) => Ok(*v != 0),
            NativeValue::Float(v) => Ok(*v != 0.0),
            NativeValue::Double(v) => Ok(*v != 0.0),
            NativeValue::Char(v) => Ok(*v != 0),
            NativeValue::String(_) => Err(string_mismatch()),
            NativeValue::Array(items) => match items.first() {
                Some(first) => Self::from_value(first),
                None => Err(UlogError::access("cannot convert empty array to a scalar")),
            },
        }
    }
}

impl FromValue for String {
    fn from_value(value: &NativeValue) -> Result<Self> {
        match value {
            NativeValue::String(s) => Ok(s.clone()),
            _ => Err(string_mismatch()),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &NativeValue) -> Result<Self> {
        match value {
            NativeValue::Array(items) => items.iter().map(T::from_value).collect(),
            NativeValue::String(_) => Err(string_mismatch()),
            scalar => Ok(vec![T::from_value(scalar)?]),
        }
    }
}
