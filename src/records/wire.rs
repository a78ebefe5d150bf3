// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Raw on-wire layout constants for the ULog format.
//!
//! Every record on the wire is a 3-byte header `{u16 msg_size, u8
//! msg_type}` followed by `msg_size` payload bytes. The file starts with a
//! 16-byte file header (7 magic bytes, 1 version byte, 8-byte timestamp),
//! optionally followed by a flag-bits record. All multi-byte integers are
//! little-endian.

/// The 7 magic bytes at the start of every ULog file. Byte 8 of the file
/// header is the file version.
pub const FILE_MAGIC: [u8; 7] = [b'U', b'L', b'o', b'g', 0x01, 0x12, 0x35];

/// ULog file format version written by this crate.
pub const FILE_VERSION: u8 = 1;

/// Length of the file header: 8 magic/version bytes plus a u64 timestamp.
pub const FILE_HEADER_LEN: usize = 16;

/// Length of the per-record header: u16 `msg_size` plus u8 `msg_type`.
pub const MSG_HEADER_LEN: usize = 3;

/// Payload length of a flag-bits record: 8 compat bytes, 8 incompat
/// bytes, 3 appended-data offsets.
pub const FLAG_BITS_PAYLOAD_LEN: usize = 40;

/// Full wire length of a flag-bits record including its header.
pub const FLAG_BITS_MSG_LEN: usize = MSG_HEADER_LEN + FLAG_BITS_PAYLOAD_LEN;

/// Magic payload of a sync record, used as a resync anchor.
pub const SYNC_MAGIC: [u8; 8] = [0x2F, 0x73, 0x13, 0x20, 0x25, 0x0C, 0xBB, 0x12];

/// Compat flag (byte 0): the log contains default parameters.
pub const COMPAT_FLAG0_DEFAULT_PARAMETERS: u8 = 1 << 0;

/// Incompat flag (byte 0): the log contains appended data. The only
/// incompatible feature flag this implementation tolerates.
pub const INCOMPAT_FLAG0_DATA_APPENDED: u8 = 1 << 0;

/// Parameter-default type bit: system-wide default.
pub const PARAM_DEFAULT_SYSTEM_WIDE: u8 = 1 << 0;

/// Parameter-default type bit: default for the current setup.
pub const PARAM_DEFAULT_CURRENT_SETUP: u8 = 1 << 1;

/// Upper bound on `msg_size` accepted by the corruption-recovery scan.
pub const MAX_RECOVERY_MSG_SIZE: u16 = 10_000;

/// Record type byte of every known ULog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Message format definition (header section)
    Format = b'F',
    /// Data sample on a subscription
    Data = b'D',
    /// Key/value info message
    Info = b'I',
    /// List-valued info message, possibly continued
    InfoMultiple = b'M',
    /// Parameter value (initial or changed)
    Parameter = b'P',
    /// Parameter default value
    ParameterDefault = b'Q',
    /// Subscription registration
    AddLoggedMsg = b'A',
    /// Subscription removal (recognized but not modeled)
    RemoveLoggedMsg = b'R',
    /// Resync anchor
    Sync = b'S',
    /// Logging gap marker
    Dropout = b'O',
    /// Log text message
    Logging = b'L',
    /// Log text message with a tag
    LoggingTagged = b'C',
    /// File flag bits (directly after the file header)
    FlagBits = b'B',
}

impl MessageType {
    /// Map a wire byte onto a known message type.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'F' => Some(MessageType::Format),
            b'D' => Some(MessageType::Data),
            b'I' => Some(MessageType::Info),
            b'M' => Some(MessageType::InfoMultiple),
            b'P' => Some(MessageType::Parameter),
            b'Q' => Some(MessageType::ParameterDefault),
            b'A' => Some(MessageType::AddLoggedMsg),
            b'R' => Some(MessageType::RemoveLoggedMsg),
            b'S' => Some(MessageType::Sync),
            b'O' => Some(MessageType::Dropout),
            b'L' => Some(MessageType::Logging),
            b'C' => Some(MessageType::LoggingTagged),
            b'B' => Some(MessageType::FlagBits),
            _ => None,
        }
    }

    /// The wire byte of this message type.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}
