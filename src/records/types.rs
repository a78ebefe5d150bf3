// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-memory record model for every ULog record kind.
//!
//! Each record type has a `from_bytes` constructor taking the record
//! payload (the bytes after the 3-byte record header) and a `serialize`
//! method that re-emits the record, header included, byte-identically.
//! Constructors validate minimum payload lengths and structural sanity;
//! serializers validate the on-wire size limits (`msg_size` fits u16,
//! `key_len` fits u8).

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::core::{Result, UlogError};
use crate::records::wire::{
    MessageType, COMPAT_FLAG0_DEFAULT_PARAMETERS, FILE_MAGIC, FILE_VERSION,
    FLAG_BITS_PAYLOAD_LEN, INCOMPAT_FLAG0_DATA_APPENDED, MSG_HEADER_LEN, SYNC_MAGIC,
};
use crate::schema::field::{BasicType, Field};
use crate::schema::format::MessageFormat;
use crate::value::Value;

/// Byte sink that serialized records are written into.
///
/// Implemented for `Vec<u8>` (in-memory logs) and `std::fs::File`.
pub trait DataSink {
    /// Write all of `bytes` to the sink.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush buffered data through to durable storage, where applicable.
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

impl DataSink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl DataSink for std::fs::File {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.flush()?;
        self.sync_all()?;
        Ok(())
    }
}

fn check_min_size(payload: &[u8], required: usize) -> Result<()> {
    if payload.len() < required {
        return Err(UlogError::buffer_too_short(required, payload.len(), 0));
    }
    Ok(())
}

fn write_record_header(out: &mut dyn DataSink, msg_size: usize, msg_type: MessageType) -> Result<()> {
    if msg_size > u16::MAX as usize {
        return Err(UlogError::parse("Record", "message too long"));
    }
    let mut header = Vec::with_capacity(MSG_HEADER_LEN);
    header.write_u16::<LittleEndian>(msg_size as u16)?;
    header.push(msg_type.as_byte());
    out.write_bytes(&header)
}

// ============================================================================
// File header and flag bits
// ============================================================================

/// The flag-bits record that optionally follows the file header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagBits {
    /// Compatible feature flags; unknown bits may be ignored.
    pub compat_flags: [u8; 8],
    /// Incompatible feature flags; unknown bits make the log unreadable.
    pub incompat_flags: [u8; 8],
    /// File offsets of appended data regions, 0 when unused.
    pub appended_offsets: [u64; 3],
}

impl FlagBits {
    /// Parse a flag-bits record payload.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        check_min_size(payload, FLAG_BITS_PAYLOAD_LEN)?;
        let mut flag_bits = FlagBits::default();
        flag_bits.compat_flags.copy_from_slice(&payload[0..8]);
        flag_bits.incompat_flags.copy_from_slice(&payload[8..16]);
        for (index, offset) in flag_bits.appended_offsets.iter_mut().enumerate() {
            *offset = LittleEndian::read_u64(&payload[16 + index * 8..24 + index * 8]);
        }
        Ok(flag_bits)
    }

    /// True if any incompatible flag besides `DATA_APPENDED` is set. Such
    /// a log cannot be parsed.
    pub fn has_unknown_incompat_flags(&self) -> bool {
        self.incompat_flags[0] & !INCOMPAT_FLAG0_DATA_APPENDED != 0
            || self.incompat_flags[1..].iter().any(|&flag| flag != 0)
    }

    /// True if the log carries appended data regions.
    pub fn has_appended_data(&self) -> bool {
        self.appended_offsets[0] != 0
    }
}

/// The ULog file header: magic, version, start timestamp, and the
/// optional flag bits.
#[derive(Debug, Clone)]
pub struct FileHeader {
    magic: [u8; 8],
    timestamp: u64,
    flag_bits: Option<FlagBits>,
}

impl FileHeader {
    /// Create a file header for writing a new log.
    pub fn new(timestamp_us: u64, has_default_parameters: bool) -> Self {
        let mut magic = [0u8; 8];
        magic[..7].copy_from_slice(&FILE_MAGIC);
        magic[7] = FILE_VERSION;
        let mut flag_bits = FlagBits::default();
        if has_default_parameters {
            flag_bits.compat_flags[0] |= COMPAT_FLAG0_DEFAULT_PARAMETERS;
        }
        FileHeader {
            magic,
            timestamp: timestamp_us,
            flag_bits: Some(flag_bits),
        }
    }

    pub(crate) fn from_wire(magic: [u8; 8], timestamp: u64) -> Self {
        FileHeader {
            magic,
            timestamp,
            flag_bits: None,
        }
    }

    pub(crate) fn attach_flag_bits(&mut self, flag_bits: FlagBits) {
        self.flag_bits = Some(flag_bits);
    }

    /// Log start timestamp in microseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// ULog file format version.
    pub fn version(&self) -> u8 {
        self.magic[7]
    }

    /// The flag bits, if the file carried a flag-bits record.
    pub fn flag_bits(&self) -> Option<&FlagBits> {
        self.flag_bits.as_ref()
    }

    /// True if the compat flags mark the log as containing default
    /// parameters.
    pub fn has_default_parameters(&self) -> bool {
        self.flag_bits
            .as_ref()
            .map(|f| f.compat_flags[0] & COMPAT_FLAG0_DEFAULT_PARAMETERS != 0)
            .unwrap_or(false)
    }

    /// Serialize the file header, and the flag-bits record when present.
    pub fn serialize(&self, out: &mut dyn DataSink) -> Result<()> {
        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(&self.magic);
        bytes.write_u64::<LittleEndian>(self.timestamp)?;
        out.write_bytes(&bytes)?;

        if let Some(flag_bits) = &self.flag_bits {
            write_record_header(out, FLAG_BITS_PAYLOAD_LEN, MessageType::FlagBits)?;
            let mut payload = Vec::with_capacity(FLAG_BITS_PAYLOAD_LEN);
            payload.extend_from_slice(&flag_bits.compat_flags);
            payload.extend_from_slice(&flag_bits.incompat_flags);
            for offset in &flag_bits.appended_offsets {
                payload.write_u64::<LittleEndian>(*offset)?;
            }
            out.write_bytes(&payload)?;
        }
        Ok(())
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new(0, false)
    }
}

/// Headers compare by magic and timestamp; a header without a flag-bits
/// record compares equal to one carrying all-default flag bits.
impl PartialEq for FileHeader {
    fn eq(&self, other: &Self) -> bool {
        self.magic == other.magic
            && self.timestamp == other.timestamp
            && self.flag_bits.clone().unwrap_or_default()
                == other.flag_bits.clone().unwrap_or_default()
    }
}

impl Eq for FileHeader {}

// ============================================================================
// Info messages and parameters
// ============================================================================

/// A key/value info message: a single typed field plus its raw value
/// bytes. Also represents parameters, which share the layout.
///
/// Info-multi messages additionally carry a continuation flag; logically
/// consecutive continued messages with the same key form one value list.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageInfo {
    field: Field,
    value: Vec<u8>,
    is_multi: bool,
    continued: bool,
}

/// Parameters share the key/value layout of info messages.
pub type Parameter = MessageInfo;

impl MessageInfo {
    /// Parse an info (or info-multi) record payload.
    pub fn from_bytes(payload: &[u8], is_multi: bool) -> Result<Self> {
        let (continued, key_len, key_start) = if is_multi {
            check_min_size(payload, 3)?;
            (payload[0] != 0, payload[1] as usize, 2)
        } else {
            check_min_size(payload, 2)?;
            (false, payload[0] as usize, 1)
        };
        if key_len > payload.len() - key_start {
            return Err(UlogError::parse("MessageInfo", "key too long"));
        }
        let key = std::str::from_utf8(&payload[key_start..key_start + key_len])
            .map_err(|_| UlogError::parse("MessageInfo", "key is not valid UTF-8"))?;
        let mut field = Field::parse(key)?;
        if field.basic_type() != BasicType::Nested {
            field.resolve_basic(0)?;
        }
        Ok(MessageInfo {
            field,
            value: payload[key_start + key_len..].to_vec(),
            is_multi,
            continued,
        })
    }

    /// Construct an info message from a field definition and raw value
    /// bytes.
    pub fn from_field(field: Field, value: Vec<u8>) -> Self {
        MessageInfo {
            field,
            value,
            is_multi: false,
            continued: false,
        }
    }

    /// Construct an info-multi message.
    pub fn from_field_multi(field: Field, value: Vec<u8>, continued: bool) -> Self {
        MessageInfo {
            field,
            value,
            is_multi: true,
            continued,
        }
    }

    /// Construct a string-valued info message (`char[N]` key encoding).
    pub fn new_string(key: impl Into<String>, value: &str) -> Result<Self> {
        let mut field = Field::new_array("char", key, value.len());
        field.resolve_basic(0)?;
        Ok(Self::from_field(field, value.as_bytes().to_vec()))
    }

    /// Construct an `int32_t`-valued info message.
    pub fn new_i32(key: impl Into<String>, value: i32) -> Result<Self> {
        let mut field = Field::new("int32_t", key);
        field.resolve_basic(0)?;
        Ok(Self::from_field(field, value.to_le_bytes().to_vec()))
    }

    /// Construct a `float`-valued info message.
    pub fn new_f32(key: impl Into<String>, value: f32) -> Result<Self> {
        let mut field = Field::new("float", key);
        field.resolve_basic(0)?;
        Ok(Self::from_field(field, value.to_le_bytes().to_vec()))
    }

    /// The field definition (key).
    pub fn field(&self) -> &Field {
        &self.field
    }

    pub(crate) fn field_mut(&mut self) -> &mut Field {
        &mut self.field
    }

    /// The key name.
    pub fn key(&self) -> &str {
        self.field.name()
    }

    /// The raw value bytes.
    pub fn value_raw(&self) -> &[u8] {
        &self.value
    }

    /// A typed view over the value bytes.
    pub fn value(&self) -> Value<'_> {
        Value::new(&self.field, &self.value)
    }

    /// True for info-multi messages.
    pub fn is_multi(&self) -> bool {
        self.is_multi
    }

    /// True if this info-multi message continues the previous one for the
    /// same key.
    pub fn is_continued(&self) -> bool {
        self.continued
    }

    /// Serialize as the given message type (`Info` or `Parameter`);
    /// info-multi messages always serialize as `InfoMultiple`.
    pub fn serialize_as(&self, out: &mut dyn DataSink, msg_type: MessageType) -> Result<()> {
        let key = self.field.encode();
        if key.len() > u8::MAX as usize {
            return Err(UlogError::parse("MessageInfo", "message too long"));
        }
        if self.is_multi {
            let msg_size = key.len() + self.value.len() + 2;
            write_record_header(out, msg_size, MessageType::InfoMultiple)?;
            out.write_bytes(&[self.continued as u8, key.len() as u8])?;
        } else {
            let msg_size = key.len() + self.value.len() + 1;
            write_record_header(out, msg_size, msg_type)?;
            out.write_bytes(&[key.len() as u8])?;
        }
        out.write_bytes(key.as_bytes())?;
        out.write_bytes(&self.value)
    }

    /// Serialize as an info record.
    pub fn serialize(&self, out: &mut dyn DataSink) -> Result<()> {
        self.serialize_as(out, MessageType::Info)
    }
}

/// A parameter default value: a key/value pair plus the default-type
/// bitfield (system-wide and/or current-setup).
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefault {
    field: Field,
    value: Vec<u8>,
    default_types: u8,
}

impl ParameterDefault {
    /// Parse a parameter-default record payload.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        check_min_size(payload, 3)?;
        let default_types = payload[0];
        let key_len = payload[1] as usize;
        if key_len > payload.len() - 2 {
            return Err(UlogError::parse("ParameterDefault", "key too long"));
        }
        let key = std::str::from_utf8(&payload[2..2 + key_len])
            .map_err(|_| UlogError::parse("ParameterDefault", "key is not valid UTF-8"))?;
        let mut field = Field::parse(key)?;
        if field.basic_type() != BasicType::Nested {
            field.resolve_basic(0)?;
        }
        Ok(ParameterDefault {
            field,
            value: payload[2 + key_len..].to_vec(),
            default_types,
        })
    }

    /// Construct a parameter default from a field definition, raw value
    /// bytes, and the default-type bitfield.
    pub fn from_field(field: Field, value: Vec<u8>, default_types: u8) -> Self {
        ParameterDefault {
            field,
            value,
            default_types,
        }
    }

    /// The field definition (key).
    pub fn field(&self) -> &Field {
        &self.field
    }

    pub(crate) fn field_mut(&mut self) -> &mut Field {
        &mut self.field
    }

    /// The key name.
    pub fn key(&self) -> &str {
        self.field.name()
    }

    /// The raw value bytes.
    pub fn value_raw(&self) -> &[u8] {
        &self.value
    }

    /// A typed view over the value bytes.
    pub fn value(&self) -> Value<'_> {
        Value::new(&self.field, &self.value)
    }

    /// The default-type bitfield.
    pub fn default_types(&self) -> u8 {
        self.default_types
    }

    /// Serialize as a parameter-default record.
    pub fn serialize(&self, out: &mut dyn DataSink) -> Result<()> {
        let key = self.field.encode();
        if key.len() > u8::MAX as usize {
            return Err(UlogError::parse("ParameterDefault", "message too long"));
        }
        let msg_size = key.len() + self.value.len() + 2;
        write_record_header(out, msg_size, MessageType::ParameterDefault)?;
        out.write_bytes(&[self.default_types, key.len() as u8])?;
        out.write_bytes(key.as_bytes())?;
        out.write_bytes(&self.value)
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Registration of a subscription: binds a runtime `msg_id` to a message
/// format name and a multi-instance index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLoggedMessage {
    multi_id: u8,
    msg_id: u16,
    message_name: String,
}

impl AddLoggedMessage {
    /// Construct a subscription registration.
    pub fn new(multi_id: u8, msg_id: u16, message_name: impl Into<String>) -> Self {
        AddLoggedMessage {
            multi_id,
            msg_id,
            message_name: message_name.into(),
        }
    }

    /// Parse an add-logged-message record payload.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        check_min_size(payload, 4)?;
        let message_name = std::str::from_utf8(&payload[3..])
            .map_err(|_| UlogError::parse("AddLoggedMessage", "name is not valid UTF-8"))?;
        Ok(AddLoggedMessage {
            multi_id: payload[0],
            msg_id: LittleEndian::read_u16(&payload[1..3]),
            message_name: message_name.to_string(),
        })
    }

    /// Multi-instance index of this subscription.
    pub fn multi_id(&self) -> u8 {
        self.multi_id
    }

    /// Runtime message id, referenced by data records.
    pub fn msg_id(&self) -> u16 {
        self.msg_id
    }

    /// Name of the message format this subscription uses.
    pub fn message_name(&self) -> &str {
        &self.message_name
    }

    /// Serialize as an add-logged-message record.
    pub fn serialize(&self, out: &mut dyn DataSink) -> Result<()> {
        let msg_size = self.message_name.len() + 3;
        write_record_header(out, msg_size, MessageType::AddLoggedMsg)?;
        let mut bytes = Vec::with_capacity(3);
        bytes.push(self.multi_id);
        bytes.write_u16::<LittleEndian>(self.msg_id)?;
        out.write_bytes(&bytes)?;
        out.write_bytes(self.message_name.as_bytes())
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Log level of a text message, using the syslog-style levels encoded as
/// ASCII digits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// System is unusable
    Emergency = b'0',
    /// Action must be taken immediately
    Alert = b'1',
    /// Critical conditions
    Critical = b'2',
    /// Error conditions
    Error = b'3',
    /// Warning conditions
    Warning = b'4',
    /// Normal but significant
    Notice = b'5',
    /// Informational
    Info = b'6',
    /// Debug-level messages
    Debug = b'7',
}

impl LogLevel {
    /// Map a wire byte onto a log level. Out-of-range bytes clamp to
    /// `Debug`.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' => LogLevel::Emergency,
            b'1' => LogLevel::Alert,
            b'2' => LogLevel::Critical,
            b'3' => LogLevel::Error,
            b'4' => LogLevel::Warning,
            b'5' => LogLevel::Notice,
            b'6' => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    /// The wire byte of this level.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Human-readable level name.
    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Emergency => "Emergency",
            LogLevel::Alert => "Alert",
            LogLevel::Critical => "Critical",
            LogLevel::Error => "Error",
            LogLevel::Warning => "Warning",
            LogLevel::Notice => "Notice",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
        }
    }
}

/// A log text message, optionally tagged with a 16-bit source tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logging {
    level: LogLevel,
    tag: Option<u16>,
    timestamp: u64,
    message: String,
}

impl Logging {
    /// Construct an untagged log message.
    pub fn new(level: LogLevel, message: impl Into<String>, timestamp: u64) -> Self {
        Logging {
            level,
            tag: None,
            timestamp,
            message: message.into(),
        }
    }

    /// Construct a tagged log message.
    pub fn new_tagged(
        level: LogLevel,
        tag: u16,
        message: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Logging {
            level,
            tag: Some(tag),
            timestamp,
            message: message.into(),
        }
    }

    /// Parse a logging (or tagged-logging) record payload.
    pub fn from_bytes(payload: &[u8], is_tagged: bool) -> Result<Self> {
        let (tag, timestamp_start) = if is_tagged {
            check_min_size(payload, 12)?;
            (Some(LittleEndian::read_u16(&payload[1..3])), 3)
        } else {
            check_min_size(payload, 10)?;
            (None, 1)
        };
        let timestamp = LittleEndian::read_u64(&payload[timestamp_start..timestamp_start + 8]);
        let message = std::str::from_utf8(&payload[timestamp_start + 8..])
            .map_err(|_| UlogError::parse("Logging", "message is not valid UTF-8"))?;
        Ok(Logging {
            level: LogLevel::from_byte(payload[0]),
            tag,
            timestamp,
            message: message.to_string(),
        })
    }

    /// The log level.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// The source tag, for tagged log messages.
    pub fn tag(&self) -> Option<u16> {
        self.tag
    }

    /// Message timestamp in microseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Serialize as a logging or tagged-logging record.
    pub fn serialize(&self, out: &mut dyn DataSink) -> Result<()> {
        match self.tag {
            Some(tag) => {
                let msg_size = self.message.len() + 11;
                write_record_header(out, msg_size, MessageType::LoggingTagged)?;
                let mut bytes = Vec::with_capacity(11);
                bytes.push(self.level.as_byte());
                bytes.write_u16::<LittleEndian>(tag)?;
                bytes.write_u64::<LittleEndian>(self.timestamp)?;
                out.write_bytes(&bytes)?;
            }
            None => {
                let msg_size = self.message.len() + 9;
                write_record_header(out, msg_size, MessageType::Logging)?;
                let mut bytes = Vec::with_capacity(9);
                bytes.push(self.level.as_byte());
                bytes.write_u64::<LittleEndian>(self.timestamp)?;
                out.write_bytes(&bytes)?;
            }
        }
        out.write_bytes(self.message.as_bytes())
    }
}

// ============================================================================
// Data, dropout, sync
// ============================================================================

/// A data sample: a `msg_id` referencing a subscription plus the opaque
/// sample bytes, decoded on demand through the subscription's format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    msg_id: u16,
    data: Vec<u8>,
}

impl Data {
    /// Construct a data sample.
    pub fn new(msg_id: u16, data: Vec<u8>) -> Self {
        Data { msg_id, data }
    }

    /// Parse a data record payload.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        check_min_size(payload, 3)?;
        Ok(Data {
            msg_id: LittleEndian::read_u16(&payload[0..2]),
            data: payload[2..].to_vec(),
        })
    }

    /// The subscription this sample belongs to.
    pub fn msg_id(&self) -> u16 {
        self.msg_id
    }

    /// The raw sample bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serialize as a data record.
    pub fn serialize(&self, out: &mut dyn DataSink) -> Result<()> {
        let msg_size = self.data.len() + 2;
        write_record_header(out, msg_size, MessageType::Data)?;
        let mut bytes = Vec::with_capacity(2);
        bytes.write_u16::<LittleEndian>(self.msg_id)?;
        out.write_bytes(&bytes)?;
        out.write_bytes(&self.data)
    }
}

/// A logging gap: the logger dropped data for the given duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dropout {
    duration_ms: u16,
}

impl Dropout {
    /// Construct a dropout marker.
    pub fn new(duration_ms: u16) -> Self {
        Dropout { duration_ms }
    }

    /// Parse a dropout record payload.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        check_min_size(payload, 2)?;
        Ok(Dropout {
            duration_ms: LittleEndian::read_u16(&payload[0..2]),
        })
    }

    /// Duration of the gap in milliseconds.
    pub fn duration_ms(&self) -> u16 {
        self.duration_ms
    }

    /// Serialize as a dropout record.
    pub fn serialize(&self, out: &mut dyn DataSink) -> Result<()> {
        write_record_header(out, 2, MessageType::Dropout)?;
        let mut bytes = Vec::with_capacity(2);
        bytes.write_u16::<LittleEndian>(self.duration_ms)?;
        out.write_bytes(&bytes)
    }
}

/// A sync record: fixed magic bytes usable as a resync anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sync;

impl Sync {
    /// Parse a sync record payload, validating the magic bytes.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        check_min_size(payload, SYNC_MAGIC.len())?;
        if payload[..SYNC_MAGIC.len()] != SYNC_MAGIC {
            return Err(UlogError::parse("Sync", "invalid sync magic bytes"));
        }
        Ok(Sync)
    }

    /// Serialize as a sync record.
    pub fn serialize(&self, out: &mut dyn DataSink) -> Result<()> {
        write_record_header(out, SYNC_MAGIC.len(), MessageType::Sync)?;
        out.write_bytes(&SYNC_MAGIC)
    }
}

// ============================================================================
// Message format serialization
// ============================================================================

impl MessageFormat {
    /// Serialize as a format record.
    pub fn serialize(&self, out: &mut dyn DataSink) -> Result<()> {
        let text = self.encode();
        write_record_header(out, text.len(), MessageType::Format)?;
        out.write_bytes(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::wire::MSG_HEADER_LEN;

    fn split_record(bytes: &[u8]) -> (u16, u8, &[u8]) {
        let msg_size = LittleEndian::read_u16(&bytes[0..2]);
        let msg_type = bytes[2];
        (msg_size, msg_type, &bytes[MSG_HEADER_LEN..])
    }

    #[test]
    fn test_file_header_round_trip() {
        let header = FileHeader::new(1234567, true);
        let mut out = Vec::new();
        header.serialize(&mut out).unwrap();
        assert_eq!(out.len(), 16 + 43);
        assert_eq!(&out[..7], &FILE_MAGIC);
        assert_eq!(out[7], FILE_VERSION);
        assert_eq!(LittleEndian::read_u64(&out[8..16]), 1234567);
        // flag bits record follows
        let (msg_size, msg_type, payload) = split_record(&out[16..]);
        assert_eq!(msg_size, 40);
        assert_eq!(msg_type, b'B');
        let flag_bits = FlagBits::from_bytes(payload).unwrap();
        assert_eq!(flag_bits.compat_flags[0], COMPAT_FLAG0_DEFAULT_PARAMETERS);
        assert!(!flag_bits.has_unknown_incompat_flags());
        assert!(!flag_bits.has_appended_data());
    }

    #[test]
    fn test_flag_bits_incompat_detection() {
        let mut flag_bits = FlagBits::default();
        flag_bits.incompat_flags[0] = INCOMPAT_FLAG0_DATA_APPENDED;
        assert!(!flag_bits.has_unknown_incompat_flags());
        flag_bits.incompat_flags[0] |= 1 << 3;
        assert!(flag_bits.has_unknown_incompat_flags());

        let mut flag_bits = FlagBits::default();
        flag_bits.incompat_flags[5] = 1;
        assert!(flag_bits.has_unknown_incompat_flags());
    }

    #[test]
    fn test_flag_bits_too_short() {
        assert!(FlagBits::from_bytes(&[0u8; 39]).is_err());
    }

    #[test]
    fn test_message_info_round_trip() {
        let info = MessageInfo::new_string("sys_name", "ULogWriter").unwrap();
        let mut out = Vec::new();
        info.serialize(&mut out).unwrap();
        let (msg_size, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'I');
        assert_eq!(msg_size as usize, payload.len());
        let parsed = MessageInfo::from_bytes(payload, false).unwrap();
        assert_eq!(parsed, info);
        assert_eq!(parsed.key(), "sys_name");
        assert_eq!(parsed.value_raw(), b"ULogWriter");
    }

    #[test]
    fn test_message_info_multi_round_trip() {
        let field = Field::new_array("char", "log_chunk", 5);
        let info = MessageInfo::from_field_multi(field, b"abcde".to_vec(), true);
        let mut out = Vec::new();
        info.serialize(&mut out).unwrap();
        let (_, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'M');
        let parsed = MessageInfo::from_bytes(payload, true).unwrap();
        assert!(parsed.is_multi());
        assert!(parsed.is_continued());
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_message_info_key_too_long_rejected() {
        // key_len claims more bytes than the payload holds
        let payload = [10u8, b'a', b'b'];
        assert!(MessageInfo::from_bytes(&payload, false).is_err());
    }

    #[test]
    fn test_message_info_too_short() {
        assert!(MessageInfo::from_bytes(&[1u8], false).is_err());
        assert!(MessageInfo::from_bytes(&[0u8, 1], true).is_err());
    }

    #[test]
    fn test_typed_info_values() {
        let info = MessageInfo::new_i32("ver", -42).unwrap();
        assert_eq!(info.value().get::<i32>().unwrap(), -42);
        let info = MessageInfo::new_f32("ratio", 1.5).unwrap();
        assert_eq!(info.value().get::<f32>().unwrap(), 1.5);
        let info = MessageInfo::new_string("name", "px4").unwrap();
        assert_eq!(info.value().get::<String>().unwrap(), "px4");
    }

    #[test]
    fn test_parameter_default_round_trip() {
        let mut field = Field::new("float", "PARAM_A");
        field.resolve_basic(0).unwrap();
        let default = ParameterDefault::from_field(
            field,
            2.5f32.to_le_bytes().to_vec(),
            PARAM_DEFAULT_SYSTEM_WIDE_TEST,
        );
        let mut out = Vec::new();
        default.serialize(&mut out).unwrap();
        let (_, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'Q');
        let parsed = ParameterDefault::from_bytes(payload).unwrap();
        assert_eq!(parsed, default);
        assert_eq!(parsed.default_types(), PARAM_DEFAULT_SYSTEM_WIDE_TEST);
        assert_eq!(parsed.value().get::<f32>().unwrap(), 2.5);
    }

    const PARAM_DEFAULT_SYSTEM_WIDE_TEST: u8 = crate::records::wire::PARAM_DEFAULT_SYSTEM_WIDE;

    #[test]
    fn test_add_logged_message_round_trip() {
        let msg = AddLoggedMessage::new(1, 42, "sensor_accel");
        let mut out = Vec::new();
        msg.serialize(&mut out).unwrap();
        let (msg_size, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'A');
        assert_eq!(msg_size as usize, "sensor_accel".len() + 3);
        let parsed = AddLoggedMessage::from_bytes(payload).unwrap();
        assert_eq!(parsed, msg);
        assert_eq!(parsed.multi_id(), 1);
        assert_eq!(parsed.msg_id(), 42);
        assert_eq!(parsed.message_name(), "sensor_accel");
    }

    #[test]
    fn test_add_logged_message_too_short() {
        assert!(AddLoggedMessage::from_bytes(&[0, 1, 0]).is_err());
    }

    #[test]
    fn test_logging_round_trip() {
        let logging = Logging::new(LogLevel::Warning, "low battery", 3_834_732);
        let mut out = Vec::new();
        logging.serialize(&mut out).unwrap();
        let (_, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'L');
        let parsed = Logging::from_bytes(payload, false).unwrap();
        assert_eq!(parsed, logging);
        assert_eq!(parsed.level(), LogLevel::Warning);
        assert_eq!(parsed.level().name(), "Warning");
        assert_eq!(parsed.tag(), None);
    }

    #[test]
    fn test_tagged_logging_round_trip() {
        let logging = Logging::new_tagged(LogLevel::Error, 7, "actuator failure", 99);
        let mut out = Vec::new();
        logging.serialize(&mut out).unwrap();
        let (_, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'C');
        let parsed = Logging::from_bytes(payload, true).unwrap();
        assert_eq!(parsed, logging);
        assert_eq!(parsed.tag(), Some(7));
    }

    #[test]
    fn test_logging_level_clamps() {
        assert_eq!(LogLevel::from_byte(0x00), LogLevel::Debug);
        assert_eq!(LogLevel::from_byte(b'9'), LogLevel::Debug);
        assert_eq!(LogLevel::from_byte(b'4'), LogLevel::Warning);
    }

    #[test]
    fn test_data_round_trip() {
        let data = Data::new(3, vec![1, 2, 3, 4, 5]);
        let mut out = Vec::new();
        data.serialize(&mut out).unwrap();
        let (msg_size, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'D');
        assert_eq!(msg_size, 7);
        let parsed = Data::from_bytes(payload).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn test_data_too_short() {
        assert!(Data::from_bytes(&[1, 0]).is_err());
    }

    #[test]
    fn test_dropout_round_trip() {
        let dropout = Dropout::new(250);
        let mut out = Vec::new();
        dropout.serialize(&mut out).unwrap();
        let (msg_size, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'O');
        assert_eq!(msg_size, 2);
        assert_eq!(Dropout::from_bytes(payload).unwrap(), dropout);
    }

    #[test]
    fn test_sync_round_trip() {
        let mut out = Vec::new();
        Sync.serialize(&mut out).unwrap();
        let (msg_size, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'S');
        assert_eq!(msg_size, 8);
        assert!(Sync::from_bytes(payload).is_ok());
    }

    #[test]
    fn test_sync_rejects_bad_magic() {
        assert!(Sync::from_bytes(&[0u8; 8]).is_err());
        assert!(Sync::from_bytes(&SYNC_MAGIC[..7]).is_err());
    }

    #[test]
    fn test_message_format_record_round_trip() {
        let format =
            MessageFormat::from_bytes(b"msg:uint64_t timestamp;float[3] accel;").unwrap();
        let mut out = Vec::new();
        format.serialize(&mut out).unwrap();
        let (msg_size, msg_type, payload) = split_record(&out);
        assert_eq!(msg_type, b'F');
        assert_eq!(msg_size as usize, payload.len());
        let parsed = MessageFormat::from_bytes(payload).unwrap();
        assert_eq!(parsed, format);
    }

    #[test]
    fn test_file_header_equality() {
        let a = FileHeader::new(5, false);
        let b = FileHeader::new(5, false);
        let c = FileHeader::new(6, false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        // a header parsed without flag bits matches one that has default
        // flag bits, in both directions
        let without_flags = FileHeader::from_wire(*a.magic_for_tests(), 5);
        assert_eq!(without_flags, a);
        assert_eq!(a, without_flags);
        // but not one with non-default flag bits, in either direction
        let with_compat = FileHeader::new(5, true);
        assert_ne!(without_flags, with_compat);
        assert_ne!(with_compat, without_flags);
    }

    impl FileHeader {
        fn magic_for_tests(&self) -> &[u8; 8] {
            &self.magic
        }
    }
}
