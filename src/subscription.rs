// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Subscriptions and typed access to their samples.
//!
//! A subscription binds a runtime `msg_id` to a message format and
//! accumulates the raw data samples logged on it. Samples stay opaque in
//! storage; [`TypedDataView`] joins one sample with the subscription's
//! format so fields can be decoded on demand.

use std::sync::Arc;

use crate::core::{Result, UlogError};
use crate::records::{AddLoggedMessage, Data};
use crate::schema::{Field, MessageFormat};
use crate::value::Value;

/// A short-lived view joining one data sample with its message format.
///
/// Valid as long as the subscription (and thus the sample bytes and the
/// format) is alive; the borrow checker enforces this.
#[derive(Debug, Clone, Copy)]
pub struct TypedDataView<'a> {
    data: &'a Data,
    format: &'a MessageFormat,
}

impl<'a> TypedDataView<'a> {
    /// Create a view of `data` decoded through `format`.
    pub fn new(data: &'a Data, format: &'a MessageFormat) -> Self {
        TypedDataView { data, format }
    }

    /// Name of the message format this sample uses.
    pub fn name(&self) -> &str {
        self.format.name()
    }

    /// The message format.
    pub fn format(&self) -> &'a MessageFormat {
        self.format
    }

    /// The raw sample bytes.
    pub fn raw_data(&self) -> &'a [u8] {
        self.data.data()
    }

    /// Typed access to a top-level field by name.
    pub fn value(&self, field_name: &str) -> Result<Value<'a>> {
        self.value_at(self.format.field(field_name)?)
    }

    /// Typed access through a field handle obtained from the format.
    pub fn value_at<'b>(&self, field: &'b Field) -> Result<Value<'b>>
    where
        'a: 'b,
    {
        if !field.is_resolved() {
            return Err(UlogError::parse(
                "TypedDataView",
                format!("field '{}' definition not resolved", field.name()),
            ));
        }
        Ok(Value::new(field, self.data.data()))
    }

    /// True if the format has a resolved field with this name.
    pub fn has_field(&self, field_name: &str) -> bool {
        self.format
            .field(field_name)
            .map(|f| f.is_resolved())
            .unwrap_or(false)
    }
}

/// A subscription: registration record, message format, and the samples
/// logged on it, in file order.
#[derive(Debug, Clone)]
pub struct Subscription {
    add_logged_message: AddLoggedMessage,
    format: Arc<MessageFormat>,
    samples: Vec<Data>,
}

impl Subscription {
    /// Create a subscription for a registration and its resolved format.
    pub fn new(add_logged_message: AddLoggedMessage, format: Arc<MessageFormat>) -> Self {
        Subscription {
            add_logged_message,
            format,
            samples: Vec::new(),
        }
    }

    pub(crate) fn push_sample(&mut self, sample: Data) {
        self.samples.push(sample);
    }

    /// The registration record.
    pub fn add_logged_message(&self) -> &AddLoggedMessage {
        &self.add_logged_message
    }

    /// The message format name.
    pub fn name(&self) -> &str {
        self.add_logged_message.message_name()
    }

    /// Runtime message id.
    pub fn msg_id(&self) -> u16 {
        self.add_logged_message.msg_id()
    }

    /// Multi-instance index.
    pub fn multi_id(&self) -> u8 {
        self.add_logged_message.multi_id()
    }

    /// The message format samples decode with.
    pub fn format(&self) -> &Arc<MessageFormat> {
        &self.format
    }

    /// The raw samples, in file order.
    pub fn raw_samples(&self) -> &[Data] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples were logged.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Typed view of the sample at `index`.
    pub fn get(&self, index: usize) -> Result<TypedDataView<'_>> {
        let data = self.samples.get(index).ok_or_else(|| {
            UlogError::access(format!(
                "sample index {index} out of range ({} samples)",
                self.samples.len()
            ))
        })?;
        Ok(TypedDataView::new(data, &self.format))
    }

    /// Iterate over all samples as typed views.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = TypedDataView<'_>> {
        self.samples
            .iter()
            .map(move |data| TypedDataView::new(data, &self.format))
    }

    /// Field handle lookup on the underlying format.
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.format.field(name)
    }

    /// Field names of the underlying format, in order.
    pub fn field_names(&self) -> Vec<&str> {
        self.format.field_names()
    }
}
