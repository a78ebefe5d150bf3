// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ULog serialization.
//!
//! [`Writer`] is the low-level serializer: it exposes the full record
//! model and performs only ordering checks (formats before, subscriptions
//! after header completion). [`SimpleWriter`] layers integrity validation
//! on top for library users: schema naming rules, the mandatory
//! `uint64_t timestamp` first field, the no-padding layout rule, and
//! sequential message-id assignment.
//!
//! Both write through a [`DataSink`]; `Vec<u8>` builds in-memory logs,
//! `std::fs::File` writes straight to disk with working `fsync`.

use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::core::{Result, UlogError};
use crate::records::types::DataSink;
use crate::records::wire::MessageType;
use crate::records::{
    AddLoggedMessage, Data, Dropout, FileHeader, LogLevel, Logging, MessageInfo, Parameter,
    ParameterDefault, Sync,
};
use crate::schema::field::BasicType;
use crate::schema::{Field, MessageFormat};

// ============================================================================
// Low-level writer
// ============================================================================

/// Low-level ULog serializer.
///
/// Exposes the full ULog record set without integrity checks beyond
/// record ordering. Use [`SimpleWriter`] for a validated API.
pub struct Writer<S: DataSink> {
    sink: S,
    header_complete: bool,
}

impl<S: DataSink> Writer<S> {
    /// Create a writer emitting into `sink`.
    pub fn new(sink: S) -> Self {
        Writer {
            sink,
            header_complete: false,
        }
    }

    /// The underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the underlying sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the writer, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Mark the header section as complete.
    pub fn header_complete(&mut self) {
        self.header_complete = true;
    }

    /// Write the file header (and flag bits, when present).
    pub fn file_header(&mut self, header: &FileHeader) -> Result<()> {
        header.serialize(&mut self.sink)
    }

    /// Write an info message.
    pub fn message_info(&mut self, info: &MessageInfo) -> Result<()> {
        info.serialize(&mut self.sink)
    }

    /// Write a message format. Formats belong to the header section.
    pub fn message_format(&mut self, format: &MessageFormat) -> Result<()> {
        if self.header_complete {
            return Err(UlogError::parse(
                "Writer",
                "header completed, cannot write formats",
            ));
        }
        format.serialize(&mut self.sink)
    }

    /// Write a parameter.
    pub fn parameter(&mut self, parameter: &Parameter) -> Result<()> {
        parameter.serialize_as(&mut self.sink, MessageType::Parameter)
    }

    /// Write a parameter default.
    pub fn parameter_default(&mut self, parameter_default: &ParameterDefault) -> Result<()> {
        parameter_default.serialize(&mut self.sink)
    }

    /// Write a subscription registration. Requires a completed header.
    pub fn add_logged_message(&mut self, add_logged_message: &AddLoggedMessage) -> Result<()> {
        if !self.header_complete {
            return Err(UlogError::parse(
                "Writer",
                "header not yet completed, cannot write subscriptions",
            ));
        }
        add_logged_message.serialize(&mut self.sink)
    }

    /// Write a log text message.
    pub fn logging(&mut self, logging: &Logging) -> Result<()> {
        logging.serialize(&mut self.sink)
    }

    /// Write a data sample.
    pub fn data(&mut self, data: &Data) -> Result<()> {
        data.serialize(&mut self.sink)
    }

    /// Write a dropout marker.
    pub fn dropout(&mut self, dropout: &Dropout) -> Result<()> {
        dropout.serialize(&mut self.sink)
    }

    /// Write a sync record.
    pub fn sync(&mut self) -> Result<()> {
        Sync.serialize(&mut self.sink)
    }
}

/// The low-level writer doubles as a [`crate::LogHandler`], so a
/// [`crate::Reader`] can be piped straight into it to re-serialize a
/// parsed stream byte-identically.
impl<S: DataSink> crate::handler::LogHandler for Writer<S> {
    fn file_header(&mut self, header: FileHeader) -> Result<()> {
        Writer::file_header(self, &header)
    }

    fn message_info(&mut self, info: MessageInfo) -> Result<()> {
        Writer::message_info(self, &info)
    }

    fn message_format(&mut self, format: MessageFormat) -> Result<()> {
        Writer::message_format(self, &format)
    }

    fn parameter(&mut self, parameter: Parameter) -> Result<()> {
        Writer::parameter(self, &parameter)
    }

    fn parameter_default(&mut self, parameter_default: ParameterDefault) -> Result<()> {
        Writer::parameter_default(self, &parameter_default)
    }

    fn add_logged_message(&mut self, add_logged_message: AddLoggedMessage) -> Result<()> {
        Writer::add_logged_message(self, &add_logged_message)
    }

    fn logging(&mut self, logging: Logging) -> Result<()> {
        Writer::logging(self, &logging)
    }

    fn data(&mut self, data: Data) -> Result<()> {
        Writer::data(self, &data)
    }

    fn dropout(&mut self, dropout: Dropout) -> Result<()> {
        Writer::dropout(self, &dropout)
    }

    fn sync(&mut self, _sync: Sync) -> Result<()> {
        Writer::sync(self)
    }

    fn header_complete(&mut self) -> Result<()> {
        Writer::header_complete(self);
        Ok(())
    }
}

// ============================================================================
// Validating writer
// ============================================================================

/// Values accepted as info and parameter payloads.
pub trait InfoValue {
    /// Build the key/value record for this value.
    fn into_message_info(self, key: &str) -> Result<MessageInfo>;
}

impl InfoValue for &str {
    fn into_message_info(self, key: &str) -> Result<MessageInfo> {
        MessageInfo::new_string(key, self)
    }
}

impl InfoValue for i32 {
    fn into_message_info(self, key: &str) -> Result<MessageInfo> {
        MessageInfo::new_i32(key, self)
    }
}

impl InfoValue for f32 {
    fn into_message_info(self, key: &str) -> Result<MessageInfo> {
        MessageInfo::new_f32(key, self)
    }
}

/// ULog serializer that checks integrity and calling order.
///
/// Misuse surfaces as [`UlogError::UsageError`] at the call site, leaving
/// the output stream consistent (no partial record is emitted for a
/// rejected call).
pub struct SimpleWriter<S: DataSink> {
    writer: Writer<S>,
    header_complete: bool,
    formats: HashMap<String, usize>,
    subscription_sizes: Vec<usize>,
    format_name_re: Regex,
    field_name_re: Regex,
}

impl SimpleWriter<File> {
    /// Create a writer for a log file at `path` (overwritten if it
    /// exists).
    pub fn create_file(path: impl AsRef<Path>, timestamp_us: u64) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(file, timestamp_us)
    }
}

impl<S: DataSink> SimpleWriter<S> {
    /// Create a writer emitting into `sink`, starting the log at
    /// `timestamp_us`.
    pub fn new(sink: S, timestamp_us: u64) -> Result<Self> {
        let format_name_re = Regex::new(r"^[a-zA-Z0-9_\-/]+$")
            .map_err(|e| UlogError::usage(format!("format name pattern: {e}")))?;
        let field_name_re = Regex::new(r"^[a-z0-9_]+$")
            .map_err(|e| UlogError::usage(format!("field name pattern: {e}")))?;
        let mut writer = Writer::new(sink);
        writer.file_header(&FileHeader::new(timestamp_us, false))?;
        Ok(SimpleWriter {
            writer,
            header_complete: false,
            formats: HashMap::new(),
            subscription_sizes: Vec::new(),
            format_name_re,
            field_name_re,
        })
    }

    /// Write a key/value info message, typically versioning information
    /// in the header.
    pub fn write_info<V: InfoValue>(&mut self, key: &str, value: V) -> Result<()> {
        self.writer.message_info(&value.into_message_info(key)?)
    }

    /// Write an initial parameter value. Header section only.
    pub fn write_parameter<V: InfoValue>(&mut self, key: &str, value: V) -> Result<()> {
        if self.header_complete {
            return Err(UlogError::usage("header already complete"));
        }
        self.writer.parameter(&value.into_message_info(key)?)
    }

    /// Write a message format definition to the header.
    ///
    /// The first field must be `uint64_t timestamp`. Field types must be
    /// basic (nested formats are not supported here), and the layout must
    /// need no padding: each field's offset must be a multiple of its
    /// element size. The simplest way to achieve this is ordering fields
    /// by decreasing type size.
    pub fn write_message_format(&mut self, name: &str, fields: Vec<Field>) -> Result<()> {
        if self.header_complete {
            return Err(UlogError::usage("header already complete"));
        }
        let timestamp_ok = fields.first().is_some_and(|first| {
            first.name() == "timestamp"
                && first.basic_type() == BasicType::UInt64
                && first.array_length().is_none()
        });
        if !timestamp_ok {
            return Err(UlogError::usage(
                "first message field must be 'uint64_t timestamp'",
            ));
        }
        if self.formats.contains_key(name) {
            return Err(UlogError::usage(format!("duplicate format: '{name}'")));
        }
        if !self.format_name_re.is_match(name) {
            return Err(UlogError::usage(format!(
                "invalid format name: '{name}', valid pattern: [a-zA-Z0-9_\\-/]+"
            )));
        }

        let mut message_size = 0usize;
        for field in &fields {
            if !self.field_name_re.is_match(field.name()) {
                return Err(UlogError::usage(format!(
                    "invalid field name: '{}', valid pattern: [a-z0-9_]+",
                    field.name()
                )));
            }
            if field.basic_type() == BasicType::Nested {
                return Err(UlogError::usage(format!(
                    "invalid field type (nested formats are not supported): '{}'",
                    field.type_name()
                )));
            }
            let element_size = field.basic_type().size();
            if message_size % element_size != 0 {
                return Err(UlogError::usage(format!(
                    "format requires padding, reorder fields by decreasing type size \
                     (padding before field '{}')",
                    field.name()
                )));
            }
            message_size += element_size * field.array_length().unwrap_or(1);
        }

        self.formats.insert(name.to_string(), message_size);
        self.writer.message_format(&MessageFormat::new(name, fields))
    }

    /// Complete the header section. Required before subscriptions and
    /// data can be written.
    pub fn complete_header(&mut self) -> Result<()> {
        if self.header_complete {
            return Err(UlogError::usage("header already complete"));
        }
        self.writer.header_complete();
        self.header_complete = true;
        Ok(())
    }

    /// Register a time series for a previously written format. Returns
    /// the message id for [`SimpleWriter::write_data`].
    pub fn write_add_logged_message(&mut self, format_name: &str, multi_id: u8) -> Result<u16> {
        if !self.header_complete {
            return Err(UlogError::usage("header not yet complete"));
        }
        let message_size = *self
            .formats
            .get(format_name)
            .ok_or_else(|| UlogError::usage(format!("format not found: '{format_name}'")))?;
        let msg_id = self.subscription_sizes.len() as u16;
        self.subscription_sizes.push(message_size);
        self.writer
            .add_logged_message(&AddLoggedMessage::new(multi_id, msg_id, format_name))?;
        Ok(msg_id)
    }

    /// Write one sample for a registered time series. Exactly the
    /// format's size is written; trailing padding bytes in `data` are
    /// ignored.
    pub fn write_data(&mut self, msg_id: u16, data: &[u8]) -> Result<()> {
        if !self.header_complete {
            return Err(UlogError::usage("header not yet complete"));
        }
        let message_size = *self
            .subscription_sizes
            .get(msg_id as usize)
            .ok_or_else(|| UlogError::usage(format!("invalid msg_id {msg_id}")))?;
        if data.len() < message_size {
            return Err(UlogError::usage(format!(
                "data too small: {} bytes, format needs {message_size}",
                data.len()
            )));
        }
        self.writer
            .data(&Data::new(msg_id, data[..message_size].to_vec()))
    }

    /// Write a log text message.
    pub fn write_text_message(
        &mut self,
        level: LogLevel,
        message: &str,
        timestamp: u64,
    ) -> Result<()> {
        if !self.header_complete {
            return Err(UlogError::usage("header not yet complete"));
        }
        self.writer.logging(&Logging::new(level, message, timestamp))
    }

    /// Write a parameter change. Data section only.
    pub fn write_parameter_change<V: InfoValue>(&mut self, key: &str, value: V) -> Result<()> {
        if !self.header_complete {
            return Err(UlogError::usage("header not yet complete"));
        }
        self.writer.parameter(&value.into_message_info(key)?)
    }

    /// Write a sync record, a resync anchor for readers.
    pub fn write_sync(&mut self) -> Result<()> {
        if !self.header_complete {
            return Err(UlogError::usage("header not yet complete"));
        }
        self.writer.sync()
    }

    /// Flush buffered data through to durable storage.
    pub fn fsync(&mut self) -> Result<()> {
        self.writer.sink_mut().sync()
    }

    /// The underlying sink.
    pub fn sink(&self) -> &S {
        self.writer.sink()
    }

    /// Consume the writer, returning the sink.
    pub fn into_sink(self) -> S {
        self.writer.into_sink()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_rejects_format_after_header() {
        let mut writer = Writer::new(Vec::new());
        writer.header_complete();
        let format = MessageFormat::from_bytes(b"m:uint64_t timestamp;").unwrap();
        assert!(writer.message_format(&format).is_err());
    }

    #[test]
    fn test_writer_rejects_subscription_before_header() {
        let mut writer = Writer::new(Vec::new());
        assert!(writer
            .add_logged_message(&AddLoggedMessage::new(0, 0, "m"))
            .is_err());
    }

    #[test]
    fn test_simple_writer_rejects_missing_timestamp() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        let result = writer.write_message_format("bad", vec![Field::new("int8_t", "a")]);
        assert!(result.unwrap_err().is_usage());
    }

    #[test]
    fn test_simple_writer_rejects_timestamp_array() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        let result = writer.write_message_format(
            "bad",
            vec![Field::new_array("uint64_t", "timestamp", 2)],
        );
        assert!(result.unwrap_err().is_usage());
    }

    #[test]
    fn test_simple_writer_rejects_padding() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        let result = writer.write_message_format(
            "bad",
            vec![
                Field::new("uint64_t", "timestamp"),
                Field::new("int8_t", "a"),
                Field::new("float", "b"),
            ],
        );
        assert!(result.unwrap_err().is_usage());
    }

    #[test]
    fn test_simple_writer_rejects_nested_field() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        let result = writer.write_message_format(
            "bad",
            vec![
                Field::new("uint64_t", "timestamp"),
                Field::new("my_type", "a"),
            ],
        );
        assert!(result.unwrap_err().is_usage());
    }

    #[test]
    fn test_simple_writer_rejects_bad_field_name() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        let result = writer.write_message_format(
            "bad",
            vec![
                Field::new("uint64_t", "timestamp"),
                Field::new("int8_t", "a/b"),
            ],
        );
        assert!(result.unwrap_err().is_usage());
    }

    #[test]
    fn test_simple_writer_rejects_bad_format_name() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        let result = writer.write_message_format(
            "bad name!",
            vec![Field::new("uint64_t", "timestamp")],
        );
        assert!(result.unwrap_err().is_usage());
    }

    #[test]
    fn test_simple_writer_rejects_duplicate_format() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        writer
            .write_message_format("m", vec![Field::new("uint64_t", "timestamp")])
            .unwrap();
        let result = writer.write_message_format("m", vec![Field::new("uint64_t", "timestamp")]);
        assert!(result.unwrap_err().is_usage());
    }

    #[test]
    fn test_simple_writer_ordering_checks() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        assert!(writer.write_add_logged_message("m", 0).is_err());
        assert!(writer.write_data(0, &[]).is_err());
        assert!(writer.write_text_message(LogLevel::Info, "x", 0).is_err());
        assert!(writer.write_parameter_change("P", 1i32).is_err());
        assert!(writer.write_sync().is_err());

        writer
            .write_message_format("m", vec![Field::new("uint64_t", "timestamp")])
            .unwrap();
        writer.complete_header().unwrap();
        assert!(writer.complete_header().is_err());
        assert!(writer.write_parameter("P", 1i32).is_err());
        assert!(writer
            .write_message_format("late", vec![Field::new("uint64_t", "timestamp")])
            .is_err());
    }

    #[test]
    fn test_simple_writer_sequential_msg_ids() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        writer
            .write_message_format("m", vec![Field::new("uint64_t", "timestamp")])
            .unwrap();
        writer.complete_header().unwrap();
        assert_eq!(writer.write_add_logged_message("m", 0).unwrap(), 0);
        assert_eq!(writer.write_add_logged_message("m", 1).unwrap(), 1);
        assert!(writer.write_add_logged_message("missing", 0).is_err());
    }

    #[test]
    fn test_simple_writer_data_size_checks() {
        let mut writer = SimpleWriter::new(Vec::new(), 0).unwrap();
        writer
            .write_message_format(
                "m",
                vec![
                    Field::new("uint64_t", "timestamp"),
                    Field::new("uint32_t", "x"),
                ],
            )
            .unwrap();
        writer.complete_header().unwrap();
        let msg_id = writer.write_add_logged_message("m", 0).unwrap();

        assert!(writer.write_data(msg_id, &[0u8; 11]).is_err());
        assert!(writer.write_data(msg_id + 1, &[0u8; 12]).is_err());
        // trailing struct padding is cut off
        writer.write_data(msg_id, &[0u8; 16]).unwrap();
        let bytes = writer.into_sink();
        let data_record_size = 3 + 2 + 12;
        assert_eq!(bytes[bytes.len() - data_record_size + 2], b'D');
    }
}
