// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common fixtures for integration tests: in-memory log streams and
//! chunked feeding helpers.

#![allow(dead_code)]

use ulogcodec::{
    AddLoggedMessage, Data, DataContainer, Field, FileHeader, LogLevel, Logging, MessageFormat,
    MessageInfo, Reader, StorageConfig, Writer,
};

// ============================================================================
// Parsing helpers
// ============================================================================

/// Parse a whole stream in one chunk.
pub fn parse(bytes: &[u8]) -> DataContainer {
    let mut reader = Reader::new(DataContainer::new(StorageConfig::FullLog));
    reader.read_chunk(bytes);
    reader.into_handler()
}

/// Parse a stream split into chunks: `first_chunk` bytes first (the
/// magic and flag-bits probe must arrive together), then `chunk_size`
/// bytes per call.
pub fn parse_in_chunks(bytes: &[u8], first_chunk: usize, chunk_size: usize) -> DataContainer {
    let mut reader = Reader::new(DataContainer::new(StorageConfig::FullLog));
    feed_in_chunks(&mut reader, bytes, first_chunk, chunk_size);
    reader.into_handler()
}

/// Feed a stream into any reader in chunks.
pub fn feed_in_chunks<H: ulogcodec::LogHandler>(
    reader: &mut Reader<H>,
    bytes: &[u8],
    first_chunk: usize,
    chunk_size: usize,
) {
    let mut offset = first_chunk.min(bytes.len());
    reader.read_chunk(&bytes[..offset]);
    while offset < bytes.len() {
        let end = (offset + chunk_size).min(bytes.len());
        reader.read_chunk(&bytes[offset..end]);
        offset = end;
    }
}

// ============================================================================
// Basic fixture: scalar + array format
// ============================================================================

pub fn other_message_format() -> MessageFormat {
    MessageFormat::new(
        "other_message",
        vec![
            Field::new("uint64_t", "timestamp"),
            Field::new_array("uint32_t", "array", 3),
            Field::new("uint16_t", "x"),
        ],
    )
}

pub fn message_name_format() -> MessageFormat {
    MessageFormat::new(
        "message_name",
        vec![
            Field::new("uint64_t", "timestamp"),
            Field::new("float", "float_value"),
        ],
    )
}

/// 22-byte sample for `other_message`: byte 0 is 32 (timestamp low
/// byte), byte 20 is 49 (x low byte), everything else zero.
pub fn other_message_sample() -> Vec<u8> {
    let mut bytes = vec![0u8; 22];
    bytes[0] = 32;
    bytes[20] = 49;
    bytes
}

pub fn basic_logging() -> Logging {
    Logging::new(LogLevel::Warning, "logging message", 3_834_732)
}

pub const BASIC_MSG_ID: u16 = 1;

/// A complete small log: header, one info, two formats, one logging
/// record, one subscription on `other_message`, two data samples.
pub fn basic_log() -> Vec<u8> {
    let mut writer = Writer::new(Vec::new());
    writer.file_header(&FileHeader::default()).unwrap();
    writer
        .message_info(&MessageInfo::new_string("info", "test_value").unwrap())
        .unwrap();
    writer.message_format(&message_name_format()).unwrap();
    writer.message_format(&other_message_format()).unwrap();
    writer.header_complete();
    writer.logging(&basic_logging()).unwrap();
    writer
        .add_logged_message(&AddLoggedMessage::new(0, BASIC_MSG_ID, "other_message"))
        .unwrap();
    writer
        .data(&Data::new(BASIC_MSG_ID, other_message_sample()))
        .unwrap();
    writer
        .data(&Data::new(BASIC_MSG_ID, other_message_sample()))
        .unwrap();
    writer.into_sink()
}

// ============================================================================
// Nested fixture
// ============================================================================
//
// Sample layout of root_type:
//   [0-8]    timestamp
//   [8-12]   integer
//   [12-29]  string (char[17])
//   [29-37]  double
//   [37-41]  child_1 / unsigned_int
//   [41-42]  child_1 / child_1_1 / byte
//   [42-61]  child_1 / child_1_1 / string (char[19])
//   [61-65]  child_1 / child_1_1 / child_1_1_1 / integer
//   [65-71]  child_1 / child_1_2[0..3] / {byte_a, byte_b}
//   [71-103] child_1 / unsigned_long[4]

pub const T00_TIMESTAMP: u64 = 0xdead_beef_dead_beef;
pub const T01_INTEGER: i32 = -123_456;
pub const T02_STRING: &str = "Hello World!";
pub const T03_DOUBLE: f64 = std::f64::consts::PI;
pub const T04_UNSIGNED_INT: u32 = 0xdead_beef;
pub const T05_BYTE: u8 = b'a';
pub const T06_STRING: &str = "Hello World! 2----";
pub const T07_INTEGER: i32 = 123_456;
pub const T08_BYTE_A0: u8 = 0x12;
pub const T09_BYTE_B0: u8 = 0x34;
pub const T10_BYTE_A1: u8 = 0x56;
pub const T11_BYTE_B1: u8 = 0x78;
pub const T12_BYTE_A2: u8 = 0x9a;
pub const T13_BYTE_B2: u8 = 0xbc;
pub const T14_UNSIGNED_LONG: [u64; 4] = [
    0xfeed_c0de_feed_c0d0,
    0xfeed_c0de_feed_c0d1,
    0xfeed_c0de_feed_c0d2,
    0xfeed_c0de_feed_c0d3,
];

pub fn nested_formats() -> Vec<MessageFormat> {
    vec![
        MessageFormat::new(
            "child_1_1_1_type",
            vec![Field::new("int32_t", "integer")],
        ),
        MessageFormat::new(
            "root_type",
            vec![
                Field::new("uint64_t", "timestamp"),
                Field::new("int32_t", "integer"),
                Field::new_array("char", "string", 17),
                Field::new("double", "double"),
                Field::new("child_1_type", "child_1"),
            ],
        ),
        MessageFormat::new(
            "child_1_type",
            vec![
                Field::new("uint32_t", "unsigned_int"),
                Field::new("child_1_1_type", "child_1_1"),
                Field::new_array("child_1_2_type", "child_1_2", 3),
                Field::new_array("uint64_t", "unsigned_long", 4),
            ],
        ),
        MessageFormat::new(
            "child_1_1_type",
            vec![
                Field::new("char", "byte"),
                Field::new_array("char", "string", 19),
                Field::new("child_1_1_1_type", "child_1_1_1"),
            ],
        ),
        MessageFormat::new(
            "child_1_2_type",
            vec![Field::new("uint8_t", "byte_a"), Field::new("uint8_t", "byte_b")],
        ),
    ]
}

pub fn nested_sample_bytes() -> Vec<u8> {
    let mut bytes = vec![0u8; 103];
    bytes[0..8].copy_from_slice(&T00_TIMESTAMP.to_le_bytes());
    bytes[8..12].copy_from_slice(&T01_INTEGER.to_le_bytes());
    bytes[12..12 + T02_STRING.len()].copy_from_slice(T02_STRING.as_bytes());
    bytes[29..37].copy_from_slice(&T03_DOUBLE.to_le_bytes());
    bytes[37..41].copy_from_slice(&T04_UNSIGNED_INT.to_le_bytes());
    bytes[41] = T05_BYTE;
    bytes[42..42 + T06_STRING.len()].copy_from_slice(T06_STRING.as_bytes());
    bytes[61..65].copy_from_slice(&T07_INTEGER.to_le_bytes());
    bytes[65] = T08_BYTE_A0;
    bytes[66] = T09_BYTE_B0;
    bytes[67] = T10_BYTE_A1;
    bytes[68] = T11_BYTE_B1;
    bytes[69] = T12_BYTE_A2;
    bytes[70] = T13_BYTE_B2;
    for (index, value) in T14_UNSIGNED_LONG.iter().enumerate() {
        bytes[71 + index * 8..79 + index * 8].copy_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// A log with the nested format tree, a nested-typed info message before
/// and after the header, and two `root_type` subscriptions (multi ids 0
/// and 1) with 2 and 3 samples.
pub fn nested_log() -> Vec<u8> {
    let sample = nested_sample_bytes();
    let info = MessageInfo::from_field(
        Field::new("root_type", "info"),
        sample.clone(),
    );

    let mut writer = Writer::new(Vec::new());
    writer.file_header(&FileHeader::default()).unwrap();
    writer.message_info(&info).unwrap();
    for format in nested_formats() {
        writer.message_format(&format).unwrap();
    }
    writer.header_complete();
    writer.message_info(&info).unwrap();
    writer
        .add_logged_message(&AddLoggedMessage::new(0, 1, "root_type"))
        .unwrap();
    writer
        .add_logged_message(&AddLoggedMessage::new(1, 2, "root_type"))
        .unwrap();
    writer.data(&Data::new(1, sample.clone())).unwrap();
    writer.data(&Data::new(1, sample.clone())).unwrap();
    writer.data(&Data::new(2, sample.clone())).unwrap();
    writer.data(&Data::new(2, sample.clone())).unwrap();
    writer.data(&Data::new(2, sample)).unwrap();
    writer.into_sink()
}
