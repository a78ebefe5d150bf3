// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types shared across the crate: errors and the native value system.

pub mod error;
pub mod value;

pub use error::{Result, UlogError};
pub use value::{FromValue, NativeValue};
