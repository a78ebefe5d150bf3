// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ULog record model: raw wire constants and the in-memory representation
//! of every record kind, with parse and serialize paths.

pub mod types;
pub mod wire;

pub use types::{
    AddLoggedMessage, Data, DataSink, Dropout, FileHeader, FlagBits, LogLevel, Logging,
    MessageInfo, Parameter, ParameterDefault, Sync,
};
pub use wire::MessageType;
