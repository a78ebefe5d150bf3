// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Sink interface the streaming reader dispatches parsed records into.
//!
//! Every method has a no-op default, so a consumer only implements the
//! record kinds it cares about. [`DataContainer`](crate::DataContainer)
//! is the batteries-included implementation; streaming consumers
//! implement their own.
//!
//! Record methods return a `Result`: an `Err` tells the reader the record
//! was rejected, which the reader reports as a recoverable stream error
//! before resuming.

use crate::core::Result;
use crate::records::{
    AddLoggedMessage, Data, Dropout, FileHeader, Logging, MessageInfo, Parameter,
    ParameterDefault, Sync,
};
use crate::schema::MessageFormat;

/// Receiver of parsed ULog stream events, in file order.
#[allow(unused_variables)]
pub trait LogHandler {
    /// The file header, with flag bits when the file carries them. Always
    /// the first event of a valid stream.
    fn file_header(&mut self, header: FileHeader) -> Result<()> {
        Ok(())
    }

    /// A key/value info message (plain or multi).
    fn message_info(&mut self, info: MessageInfo) -> Result<()> {
        Ok(())
    }

    /// A message format definition from the header section.
    fn message_format(&mut self, format: MessageFormat) -> Result<()> {
        Ok(())
    }

    /// A parameter value; initial while the header is open, a change
    /// afterwards.
    fn parameter(&mut self, parameter: Parameter) -> Result<()> {
        Ok(())
    }

    /// A parameter default value.
    fn parameter_default(&mut self, parameter_default: ParameterDefault) -> Result<()> {
        Ok(())
    }

    /// A subscription registration.
    fn add_logged_message(&mut self, add_logged_message: AddLoggedMessage) -> Result<()> {
        Ok(())
    }

    /// A log text message.
    fn logging(&mut self, logging: Logging) -> Result<()> {
        Ok(())
    }

    /// A data sample.
    fn data(&mut self, data: Data) -> Result<()> {
        Ok(())
    }

    /// A dropout marker.
    fn dropout(&mut self, dropout: Dropout) -> Result<()> {
        Ok(())
    }

    /// A sync record.
    fn sync(&mut self, sync: Sync) -> Result<()> {
        Ok(())
    }

    /// The header section ended; dispatched exactly once, before the
    /// first data-section record.
    fn header_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// A stream error. Non-recoverable errors terminate parsing.
    fn error(&mut self, msg: &str, recoverable: bool) {}
}
