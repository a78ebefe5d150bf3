// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for ulogcodec.
//!
//! Provides error types for ULog operations:
//! - Record and schema parsing
//! - Typed value access
//! - Writer API usage
//! - Write-sink I/O

use std::fmt;

/// Errors that can occur during ULog read/write operations.
#[derive(Debug, Clone)]
pub enum UlogError {
    /// Parse error in a record, schema, or the surrounding stream
    ParseError {
        /// What was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// Buffer too short for requested read
    BufferTooShort {
        /// Requested bytes
        requested: usize,
        /// Available bytes
        available: usize,
        /// Byte offset where the read was attempted
        offset: usize,
    },

    /// Message format not found in the registry
    FormatNotFound {
        /// Format name that was not found
        format_name: String,
    },

    /// Field lookup, index, or conversion failure on a typed value
    AccessError {
        /// Error message
        message: String,
    },

    /// API called in the wrong order or with invalid arguments
    UsageError {
        /// Error message
        message: String,
    },

    /// Write-sink I/O failure
    Io {
        /// Error message from the underlying sink
        message: String,
    },
}

impl UlogError {
    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        UlogError::ParseError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a buffer too short error.
    pub fn buffer_too_short(requested: usize, available: usize, offset: usize) -> Self {
        UlogError::BufferTooShort {
            requested,
            available,
            offset,
        }
    }

    /// Create a "format not found" error.
    pub fn format_not_found(format_name: impl Into<String>) -> Self {
        UlogError::FormatNotFound {
            format_name: format_name.into(),
        }
    }

    /// Create an access error.
    pub fn access(message: impl Into<String>) -> Self {
        UlogError::AccessError {
            message: message.into(),
        }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        UlogError::UsageError {
            message: message.into(),
        }
    }

    /// True for errors raised by misusing the writer API, as opposed to
    /// malformed data. Usage errors are surfaced to the caller and never
    /// converted into recoverable stream errors.
    pub fn is_usage(&self) -> bool {
        matches!(self, UlogError::UsageError { .. })
    }
}

impl fmt::Display for UlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UlogError::ParseError { context, message } => {
                write!(f, "Parse error in {context}: {message}")
            }
            UlogError::BufferTooShort {
                requested,
                available,
                offset,
            } => write!(
                f,
                "Buffer too short: requested {requested} bytes at offset {offset}, but only {available} bytes available"
            ),
            UlogError::FormatNotFound { format_name } => {
                write!(f, "Message format not found: '{format_name}'")
            }
            UlogError::AccessError { message } => {
                write!(f, "Access error: {message}")
            }
            UlogError::UsageError { message } => {
                write!(f, "Usage error: {message}")
            }
            UlogError::Io { message } => {
                write!(f, "I/O error: {message}")
            }
        }
    }
}

impl std::error::Error for UlogError {}

impl From<std::io::Error> for UlogError {
    fn from(err: std::io::Error) -> Self {
        UlogError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for ulogcodec operations.
pub type Result<T> = std::result::Result<T, UlogError>;
