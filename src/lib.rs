// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # ulogcodec
//!
//! Library for reading and writing ULog, the self-describing binary
//! telemetry log format used by flight-control systems.
//!
//! A ULog file carries its own schema: message formats define the byte
//! layout of samples, subscriptions bind runtime message ids to formats,
//! and data records reference subscriptions. This crate parses that
//! structure from arbitrarily-chunked byte input, offers typed
//! random-access decoding of samples whose layout is only known at run
//! time, and serializes the same model back byte-identically.
//!
//! ## Architecture
//!
//! - `records/` - raw wire constants and the record model (parse +
//!   serialize per record kind)
//! - `schema/` - fields, message formats, nested-type resolution
//! - `reader` - streaming parser: chunked bytes in, handler events out,
//!   with corruption recovery
//! - `container` - [`DataContainer`], the handler that accumulates a
//!   whole log and indexes subscriptions
//! - `value` / `subscription` - lazy typed views over raw sample bytes
//! - `writer` - low-level [`Writer`] and the validating [`SimpleWriter`]
//!
//! ## Example: reading a log
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ulogcodec::{DataContainer, Reader, StorageConfig};
//!
//! let bytes = std::fs::read("flight.ulg")?;
//! let mut reader = Reader::new(DataContainer::new(StorageConfig::FullLog));
//! reader.read_chunk(&bytes);
//!
//! let log = reader.into_handler();
//! for (name, _) in log.subscriptions_by_name_and_multi_id() {
//!     println!("topic: {} (instance {})", name.0, name.1);
//! }
//! let position = log.subscription("vehicle_local_position")?;
//! for sample in position.iter() {
//!     let timestamp: u64 = sample.value("timestamp")?.get()?;
//!     println!("t={timestamp}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: writing a log
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ulogcodec::{Field, LogLevel, SimpleWriter};
//!
//! let mut writer = SimpleWriter::create_file("out.ulg", 0)?;
//! writer.write_info("sys_name", "ulogcodec")?;
//! writer.write_message_format(
//!     "cpu_load",
//!     vec![Field::new("uint64_t", "timestamp"), Field::new("float", "load")],
//! )?;
//! writer.complete_header()?;
//!
//! let msg_id = writer.write_add_logged_message("cpu_load", 0)?;
//! let mut sample = 1000u64.to_le_bytes().to_vec();
//! sample.extend_from_slice(&0.25f32.to_le_bytes());
//! writer.write_data(msg_id, &sample)?;
//! writer.write_text_message(LogLevel::Info, "logger started", 1000)?;
//! writer.fsync()?;
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{FromValue, NativeValue, Result, UlogError};

// Schema system
pub mod schema;

pub use schema::{BasicType, Field, FormatRegistry, MessageFormat};

// Record model and wire constants
pub mod records;

pub use records::{
    AddLoggedMessage, Data, DataSink, Dropout, FileHeader, FlagBits, LogLevel, Logging,
    MessageInfo, MessageType, Parameter, ParameterDefault, Sync,
};

// Sink interface for stream consumers
pub mod handler;

pub use handler::LogHandler;

// Typed value access
pub mod value;

pub use value::Value;

pub mod subscription;

pub use subscription::{Subscription, TypedDataView};

// Log accumulation
pub mod container;

pub use container::{DataContainer, StorageConfig};

// Streaming parser
pub mod reader;

pub use reader::Reader;

// Serialization
pub mod writer;

pub use writer::{InfoValue, SimpleWriter, Writer};
