// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Streaming ULog parser.
//!
//! [`Reader`] consumes byte chunks of arbitrary size (down to a single
//! byte) and dispatches exactly one [`LogHandler`] call per complete
//! record, in file order. Parsing is strictly synchronous: every
//! `read_chunk` call completes before returning, and all handler calls
//! happen on the caller's thread.
//!
//! State machine: `ReadMagic → ReadFlagBits → ReadHeader → ReadData`,
//! with `InvalidData` as the terminal state for fatal format violations
//! (bad magic, unknown incompatible flags, too little data for the magic
//! or flag-bits probe in one chunk).
//!
//! A partial-record buffer holds at most one in-progress record between
//! chunks; records fully contained in the current chunk are consumed in
//! place without copying. On corruption (`msg_size == 0`, `msg_type ==
//! 0`, or a record that fails to construct or is rejected by the
//! handler), the reader reports one recoverable error per episode and
//! scans forward byte-by-byte for the next plausible record header.

use byteorder::{ByteOrder, LittleEndian};

use crate::core::Result;
use crate::handler::LogHandler;
use crate::records::types::{
    AddLoggedMessage, Data, Dropout, FileHeader, FlagBits, Logging, MessageInfo,
    ParameterDefault, Sync,
};
use crate::records::wire::{
    MessageType, FILE_HEADER_LEN, FILE_MAGIC, FLAG_BITS_MSG_LEN, MAX_RECOVERY_MSG_SIZE,
    MSG_HEADER_LEN,
};
use crate::schema::MessageFormat;

const BUFFER_SIZE_INIT: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadMagic,
    ReadFlagBits,
    ReadHeader,
    ReadData,
    InvalidData,
}

/// Streaming parser dispatching records into a [`LogHandler`].
pub struct Reader<H: LogHandler> {
    handler: H,
    state: State,
    partial: Vec<u8>,
    partial_capacity: usize,
    need_recovery: bool,
    corruption_reported: bool,
    total_bytes_read: usize,
    file_header: Option<FileHeader>,
}

impl<H: LogHandler> Reader<H> {
    /// Create a reader dispatching into `handler`.
    pub fn new(handler: H) -> Self {
        Reader {
            handler,
            state: State::ReadMagic,
            partial: Vec::with_capacity(BUFFER_SIZE_INIT),
            partial_capacity: BUFFER_SIZE_INIT,
            need_recovery: false,
            corruption_reported: false,
            total_bytes_read: 0,
            file_header: None,
        }
    }

    /// The handler this reader dispatches into.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutable access to the handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the reader, returning the handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Total number of bytes consumed so far, including buffered partial
    /// data.
    pub fn total_bytes_read(&self) -> usize {
        self.total_bytes_read
    }

    /// Parse the next chunk of serialized ULog data. Call iteratively over
    /// the file; handler methods are invoked synchronously for each
    /// complete record.
    pub fn read_chunk(&mut self, mut data: &[u8]) {
        if self.state == State::InvalidData {
            return;
        }

        if self.state == State::ReadMagic {
            let consumed = self.read_magic(data);
            data = &data[consumed..];
            self.total_bytes_read += consumed;
        }

        if self.state == State::ReadFlagBits && !data.is_empty() {
            let consumed = self.read_flag_bits(data);
            data = &data[consumed..];
            self.total_bytes_read += consumed;
        }

        if self.state == State::InvalidData {
            return;
        }

        while !data.is_empty() && !self.need_recovery {
            if !self.partial.is_empty() {
                // Finish the buffered record before touching the chunk
                // head.
                if !self.ensure_partial(MSG_HEADER_LEN, &mut data) {
                    break;
                }
                let msg_size = LittleEndian::read_u16(&self.partial[0..2]) as usize;
                if !self.ensure_partial(msg_size + MSG_HEADER_LEN, &mut data) {
                    break;
                }
                let record = std::mem::take(&mut self.partial);
                self.handle_record(&record[..msg_size + MSG_HEADER_LEN]);
                let mut rest = record;
                rest.drain(..msg_size + MSG_HEADER_LEN);
                self.partial = rest;
            } else if data.len() > MSG_HEADER_LEN {
                let msg_size = LittleEndian::read_u16(&data[0..2]) as usize;
                if data.len() >= msg_size + MSG_HEADER_LEN {
                    // Whole record sits in the chunk: consume in place.
                    let (record, rest) = data.split_at(msg_size + MSG_HEADER_LEN);
                    data = rest;
                    self.total_bytes_read += record.len();
                    self.handle_record(record);
                } else {
                    let appended = self.append_to_partial(data);
                    data = &data[appended..];
                    self.total_bytes_read += appended;
                }
            } else {
                let appended = self.append_to_partial(data);
                data = &data[appended..];
                self.total_bytes_read += appended;
            }
        }

        if self.need_recovery {
            self.try_to_recover(data);
        }
    }

    /// Append from `data` into the partial buffer until it holds
    /// `required` bytes, growing the capacity bound when a single record
    /// exceeds it. Returns whether the requirement was met.
    fn ensure_partial(&mut self, required: usize, data: &mut &[u8]) -> bool {
        if self.partial.len() < required {
            let num_append = (required - self.partial.len()).min(data.len());
            if self.partial.len() + num_append > self.partial_capacity {
                self.partial_capacity = self.partial.len() + num_append;
                tracing::debug!(
                    capacity = self.partial_capacity,
                    "resized partial record buffer"
                );
            }
            self.partial.extend_from_slice(&data[..num_append]);
            *data = &data[num_append..];
            self.total_bytes_read += num_append;
        }
        self.partial.len() >= required
    }

    /// Append as much of `data` as the capacity bound allows. Returns the
    /// number of bytes taken.
    fn append_to_partial(&mut self, data: &[u8]) -> usize {
        let num_append = data.len().min(self.partial_capacity - self.partial.len());
        self.partial.extend_from_slice(&data[..num_append]);
        num_append
    }

    fn handle_record(&mut self, record: &[u8]) {
        let msg_size = LittleEndian::read_u16(&record[0..2]);
        let msg_type = record[2];

        if msg_size == 0 || msg_type == 0 {
            self.corruption_detected("message corruption detected");
            return;
        }

        if let Err(error) = self.dispatch_record(msg_type, &record[MSG_HEADER_LEN..]) {
            tracing::debug!(error = %error, offset = self.total_bytes_read, "record rejected");
            self.corruption_detected(&error.to_string());
        }
    }

    fn dispatch_record(&mut self, msg_type: u8, payload: &[u8]) -> Result<()> {
        if self.state == State::ReadHeader {
            self.read_header_message(msg_type, payload)?;
        }
        if self.state == State::ReadData {
            self.read_data_message(msg_type, payload)?;
        }
        Ok(())
    }

    fn read_header_message(&mut self, msg_type: u8, payload: &[u8]) -> Result<()> {
        match MessageType::from_byte(msg_type) {
            Some(MessageType::Info) => self
                .handler
                .message_info(MessageInfo::from_bytes(payload, false)?),
            Some(MessageType::InfoMultiple) => self
                .handler
                .message_info(MessageInfo::from_bytes(payload, true)?),
            Some(MessageType::Format) => self
                .handler
                .message_format(MessageFormat::from_bytes(payload)?),
            Some(MessageType::Parameter) => self
                .handler
                .parameter(MessageInfo::from_bytes(payload, false)?),
            Some(MessageType::ParameterDefault) => self
                .handler
                .parameter_default(ParameterDefault::from_bytes(payload)?),
            Some(
                MessageType::AddLoggedMsg | MessageType::Logging | MessageType::LoggingTagged,
            ) => {
                // First data-section record: the header is complete. The
                // record itself is dispatched by the ReadData path.
                self.state = State::ReadData;
                self.handler.header_complete()
            }
            _ => Ok(()),
        }
    }

    fn read_data_message(&mut self, msg_type: u8, payload: &[u8]) -> Result<()> {
        match MessageType::from_byte(msg_type) {
            Some(MessageType::Info) => self
                .handler
                .message_info(MessageInfo::from_bytes(payload, false)?),
            Some(MessageType::InfoMultiple) => self
                .handler
                .message_info(MessageInfo::from_bytes(payload, true)?),
            Some(MessageType::Parameter) => self
                .handler
                .parameter(MessageInfo::from_bytes(payload, false)?),
            Some(MessageType::ParameterDefault) => self
                .handler
                .parameter_default(ParameterDefault::from_bytes(payload)?),
            Some(MessageType::AddLoggedMsg) => self
                .handler
                .add_logged_message(AddLoggedMessage::from_bytes(payload)?),
            Some(MessageType::Logging) => {
                self.handler.logging(Logging::from_bytes(payload, false)?)
            }
            Some(MessageType::LoggingTagged) => {
                self.handler.logging(Logging::from_bytes(payload, true)?)
            }
            Some(MessageType::Data) => self.handler.data(Data::from_bytes(payload)?),
            Some(MessageType::Dropout) => self.handler.dropout(Dropout::from_bytes(payload)?),
            Some(MessageType::Sync) => self.handler.sync(Sync::from_bytes(payload)?),
            _ => Ok(()),
        }
    }

    fn corruption_detected(&mut self, msg: &str) {
        if !self.corruption_reported {
            tracing::warn!(
                message = msg,
                offset = self.total_bytes_read,
                "stream corruption detected"
            );
            self.handler.error(msg, true);
            self.corruption_reported = true;
        }
        self.need_recovery = true;
    }

    /// Scan forward for the next plausible record header: a known message
    /// type with a non-zero size below the recovery bound. Bytes before
    /// the match are discarded; parsing resumes behind it.
    fn try_to_recover(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let appended = self.append_to_partial(data);
            data = &data[appended..];
            self.total_bytes_read += appended;

            if self.partial.len() >= MSG_HEADER_LEN {
                let mut found = false;
                // If the buffer was already full nothing new arrived;
                // skip the first index to guarantee forward progress.
                let mut index = if appended == 0 { 1 } else { 0 };
                while index + MSG_HEADER_LEN < self.partial.len() {
                    let msg_size = LittleEndian::read_u16(&self.partial[index..index + 2]);
                    let msg_type = self.partial[index + 2];
                    if msg_size != 0
                        && msg_type != 0
                        && msg_size < MAX_RECOVERY_MSG_SIZE
                        && MessageType::from_byte(msg_type).is_some()
                    {
                        found = true;
                        break;
                    }
                    index += 1;
                }

                if index > 0 {
                    self.partial.drain(..index);
                }

                if found {
                    tracing::debug!(
                        offset = self.total_bytes_read,
                        skipped = index,
                        "resynchronized after corruption"
                    );
                    self.need_recovery = false;
                    self.corruption_reported = false;
                    self.read_chunk(data);
                    return;
                }
            }
        }
    }

    fn read_magic(&mut self, data: &[u8]) -> usize {
        // The magic and timestamp must arrive in one chunk; anything less
        // also covers truncated files.
        if data.len() < FILE_HEADER_LEN {
            self.handler
                .error("not enough data to read file magic", false);
            self.state = State::InvalidData;
            return 0;
        }

        if data[..FILE_MAGIC.len()] != FILE_MAGIC {
            self.handler
                .error("invalid file format (incorrect magic bytes)", false);
            self.state = State::InvalidData;
            return 0;
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&data[..8]);
        let timestamp = LittleEndian::read_u64(&data[8..FILE_HEADER_LEN]);
        self.file_header = Some(FileHeader::from_wire(magic, timestamp));
        self.state = State::ReadFlagBits;
        FILE_HEADER_LEN
    }

    fn read_flag_bits(&mut self, data: &[u8]) -> usize {
        // The probe window must arrive in one chunk, whether or not the
        // optional flag-bits record is present.
        if data.len() < FLAG_BITS_MSG_LEN {
            self.handler
                .error("not enough data to read file flags", false);
            self.state = State::InvalidData;
            return 0;
        }

        let Some(mut header) = self.file_header.take() else {
            self.state = State::InvalidData;
            return 0;
        };

        if data[2] == MessageType::FlagBits.as_byte() {
            let msg_size = LittleEndian::read_u16(&data[0..2]) as usize;
            let flag_bits = match FlagBits::from_bytes(&data[MSG_HEADER_LEN..FLAG_BITS_MSG_LEN]) {
                Ok(flag_bits) => flag_bits,
                Err(error) => {
                    self.handler.error(&error.to_string(), false);
                    self.state = State::InvalidData;
                    return 0;
                }
            };
            if flag_bits.has_appended_data() {
                self.handler
                    .error("file contains appended data, which is not supported", true);
            }
            if flag_bits.has_unknown_incompat_flags() {
                self.handler
                    .error("unknown incompatible flag set: cannot parse the log", false);
                self.state = State::InvalidData;
                return 0;
            }
            header.attach_flag_bits(flag_bits);
            self.emit_file_header(header);
            self.state = State::ReadHeader;
            (msg_size + MSG_HEADER_LEN).min(data.len())
        } else {
            self.emit_file_header(header);
            self.state = State::ReadHeader;
            0
        }
    }

    fn emit_file_header(&mut self, header: FileHeader) {
        if let Err(error) = self.handler.file_header(header) {
            self.handler.error(&error.to_string(), true);
        }
    }
}
