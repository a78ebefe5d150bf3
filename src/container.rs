// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-memory accumulation of a parsed log.
//!
//! [`DataContainer`] is the [`LogHandler`] implementation that keeps
//! everything the stream delivers: message formats, info messages,
//! parameters, subscriptions with their samples, log text, dropouts, and
//! parsing errors. It is append-only while the reader drives it and
//! read-only to callers afterwards.
//!
//! When the header section ends, the container resolves all message
//! formats (offsets, nested references) and the single fields of stored
//! info and parameter messages. Schema records arriving after that point
//! are rejected.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::core::{Result, UlogError};
use crate::handler::LogHandler;
use crate::records::{
    AddLoggedMessage, Data, Dropout, FileHeader, Logging, MessageInfo, Parameter,
    ParameterDefault, Sync,
};
use crate::schema::field::BasicType;
use crate::schema::format::{FormatRegistry, MessageFormat};
use crate::subscription::Subscription;

/// How much of the log the container keeps in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageConfig {
    /// Keep only the header: formats, initial info and parameters.
    /// Post-header info, parameter, subscription, logging, data, and
    /// dropout records are discarded.
    HeaderOnly,
    /// Keep the full log in memory.
    FullLog,
}

/// Container accumulating all records of a parsed ULog stream.
#[derive(Debug)]
pub struct DataContainer {
    storage_config: StorageConfig,

    header_complete: bool,
    had_fatal_error: bool,
    parsing_errors: Vec<String>,

    file_header: FileHeader,
    formats: FormatRegistry,
    message_info: BTreeMap<String, MessageInfo>,
    message_info_multi: BTreeMap<String, Vec<Vec<MessageInfo>>>,
    initial_parameters: BTreeMap<String, Parameter>,
    default_parameters: BTreeMap<String, ParameterDefault>,
    changed_parameters: Vec<Parameter>,
    subscriptions: Vec<Subscription>,
    by_msg_id: BTreeMap<u16, usize>,
    by_name_and_multi_id: BTreeMap<(String, u8), usize>,
    logging: Vec<Logging>,
    dropouts: Vec<Dropout>,
    sync_count: usize,
}

impl DataContainer {
    /// Create an empty container with the given storage policy.
    pub fn new(storage_config: StorageConfig) -> Self {
        DataContainer {
            storage_config,
            header_complete: false,
            had_fatal_error: false,
            parsing_errors: Vec::new(),
            file_header: FileHeader::default(),
            formats: FormatRegistry::new(),
            message_info: BTreeMap::new(),
            message_info_multi: BTreeMap::new(),
            initial_parameters: BTreeMap::new(),
            default_parameters: BTreeMap::new(),
            changed_parameters: Vec::new(),
            subscriptions: Vec::new(),
            by_msg_id: BTreeMap::new(),
            by_name_and_multi_id: BTreeMap::new(),
            logging: Vec::new(),
            dropouts: Vec::new(),
            sync_count: 0,
        }
    }

    /// The storage policy this container was created with.
    pub fn storage_config(&self) -> StorageConfig {
        self.storage_config
    }

    /// True once the header section ended and formats are resolved.
    pub fn is_header_complete(&self) -> bool {
        self.header_complete
    }

    /// True if a non-recoverable error was reported.
    pub fn had_fatal_error(&self) -> bool {
        self.had_fatal_error
    }

    /// All reported parsing errors, recoverable and fatal.
    pub fn parsing_errors(&self) -> &[String] {
        &self.parsing_errors
    }

    /// The file header.
    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// The resolved message formats, keyed by name.
    pub fn message_formats(&self) -> &BTreeMap<String, Arc<MessageFormat>> {
        self.formats.resolved()
    }

    /// Info messages, keyed by name.
    pub fn message_info(&self) -> &BTreeMap<String, MessageInfo> {
        &self.message_info
    }

    /// Multi info messages: per key, a list of logical values, each the
    /// list of its continuation parts.
    pub fn message_info_multi(&self) -> &BTreeMap<String, Vec<Vec<MessageInfo>>> {
        &self.message_info_multi
    }

    /// Parameters seen before the header completed, keyed by name. Later
    /// writes for the same name win.
    pub fn initial_parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.initial_parameters
    }

    /// Parameter defaults, keyed by name.
    pub fn default_parameters(&self) -> &BTreeMap<String, ParameterDefault> {
        &self.default_parameters
    }

    /// Parameter changes seen after the header completed, in file order.
    pub fn changed_parameters(&self) -> &[Parameter] {
        &self.changed_parameters
    }

    /// Log text messages.
    pub fn logging(&self) -> &[Logging] {
        &self.logging
    }

    /// Dropout markers.
    pub fn dropouts(&self) -> &[Dropout] {
        &self.dropouts
    }

    /// Number of sync records seen in the data section.
    pub fn sync_count(&self) -> usize {
        self.sync_count
    }

    /// Subscriptions keyed by runtime message id.
    pub fn subscriptions_by_message_id(
        &self,
    ) -> impl Iterator<Item = (u16, &Subscription)> {
        self.by_msg_id
            .iter()
            .map(move |(&msg_id, &index)| (msg_id, &self.subscriptions[index]))
    }

    /// Subscriptions keyed by format name and multi-instance id.
    pub fn subscriptions_by_name_and_multi_id(
        &self,
    ) -> impl Iterator<Item = (&(String, u8), &Subscription)> {
        self.by_name_and_multi_id
            .iter()
            .map(move |(key, &index)| (key, &self.subscriptions[index]))
    }

    /// The distinct subscription names, sorted.
    pub fn subscription_names(&self) -> BTreeSet<&str> {
        self.by_name_and_multi_id
            .keys()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The subscription with the given message id.
    pub fn subscription_by_msg_id(&self, msg_id: u16) -> Result<&Subscription> {
        self.by_msg_id
            .get(&msg_id)
            .map(|&index| &self.subscriptions[index])
            .ok_or_else(|| UlogError::access(format!("subscription not found: msg_id {msg_id}")))
    }

    /// The subscription with the given name and multi id 0.
    pub fn subscription(&self, name: &str) -> Result<&Subscription> {
        self.subscription_multi(name, 0)
    }

    /// The subscription with the given name and multi id.
    pub fn subscription_multi(&self, name: &str, multi_id: u8) -> Result<&Subscription> {
        self.by_name_and_multi_id
            .get(&(name.to_string(), multi_id))
            .map(|&index| &self.subscriptions[index])
            .ok_or_else(|| UlogError::access(format!("subscription not found: '{name}'")))
    }

    fn discard_post_header(&self) -> bool {
        self.header_complete && self.storage_config == StorageConfig::HeaderOnly
    }

    /// Resolve the single field of an info/parameter record. Basic-typed
    /// fields resolve at construction; only nested ones need the registry.
    fn resolve_single_field(
        formats: &FormatRegistry,
        field: &mut crate::schema::Field,
    ) -> Result<()> {
        if field.basic_type() == BasicType::Nested && !field.is_resolved() {
            field.resolve(formats.resolved(), 0)?;
        }
        Ok(())
    }
}

impl LogHandler for DataContainer {
    fn file_header(&mut self, header: FileHeader) -> Result<()> {
        self.file_header = header;
        Ok(())
    }

    fn message_info(&mut self, mut info: MessageInfo) -> Result<()> {
        if self.discard_post_header() {
            return Ok(());
        }
        if self.header_complete {
            Self::resolve_single_field(&self.formats, info.field_mut())?;
        }
        if info.is_multi() {
            if info.is_continued() {
                let last = self
                    .message_info_multi
                    .get_mut(info.key())
                    .and_then(|values| values.last_mut())
                    .ok_or_else(|| {
                        UlogError::parse(
                            "MessageInfo",
                            "continued info-multi message without a previous entry",
                        )
                    })?;
                last.push(info);
            } else {
                self.message_info_multi
                    .entry(info.key().to_string())
                    .or_default()
                    .push(vec![info]);
            }
        } else {
            self.message_info
                .entry(info.key().to_string())
                .or_insert(info);
        }
        Ok(())
    }

    fn message_format(&mut self, format: MessageFormat) -> Result<()> {
        if self.header_complete {
            return Err(UlogError::parse(
                "MessageFormat",
                format!(
                    "message format '{}' after header completion",
                    format.name()
                ),
            ));
        }
        self.formats.insert(format)
    }

    fn parameter(&mut self, mut parameter: Parameter) -> Result<()> {
        if self.discard_post_header() {
            return Ok(());
        }
        if self.header_complete {
            Self::resolve_single_field(&self.formats, parameter.field_mut())?;
            self.changed_parameters.push(parameter);
        } else {
            self.initial_parameters
                .insert(parameter.key().to_string(), parameter);
        }
        Ok(())
    }

    fn parameter_default(&mut self, mut parameter_default: ParameterDefault) -> Result<()> {
        if self.header_complete {
            Self::resolve_single_field(&self.formats, parameter_default.field_mut())?;
        }
        self.default_parameters
            .entry(parameter_default.key().to_string())
            .or_insert(parameter_default);
        Ok(())
    }

    fn add_logged_message(&mut self, add_logged_message: AddLoggedMessage) -> Result<()> {
        if self.discard_post_header() {
            return Ok(());
        }
        let msg_id = add_logged_message.msg_id();
        if self.by_msg_id.contains_key(&msg_id) {
            return Err(UlogError::parse(
                "AddLoggedMessage",
                format!("duplicate msg_id {msg_id}"),
            ));
        }
        let format = self
            .formats
            .get(add_logged_message.message_name())
            .ok_or_else(|| UlogError::format_not_found(add_logged_message.message_name()))?;
        if format.size_bytes()? == 0 {
            return Err(UlogError::parse(
                "AddLoggedMessage",
                format!(
                    "subscription to zero-size message format '{}'",
                    add_logged_message.message_name()
                ),
            ));
        }
        let key = (
            add_logged_message.message_name().to_string(),
            add_logged_message.multi_id(),
        );
        let subscription = Subscription::new(add_logged_message, Arc::clone(format));
        let index = self.subscriptions.len();
        self.subscriptions.push(subscription);
        self.by_msg_id.insert(msg_id, index);
        self.by_name_and_multi_id.insert(key, index);
        Ok(())
    }

    fn logging(&mut self, logging: Logging) -> Result<()> {
        if self.discard_post_header() {
            return Ok(());
        }
        self.logging.push(logging);
        Ok(())
    }

    fn data(&mut self, data: Data) -> Result<()> {
        if self.storage_config == StorageConfig::HeaderOnly {
            return Ok(());
        }
        let index = *self.by_msg_id.get(&data.msg_id()).ok_or_else(|| {
            UlogError::parse(
                "Data",
                format!("data record for unknown msg_id {}", data.msg_id()),
            )
        })?;
        self.subscriptions[index].push_sample(data);
        Ok(())
    }

    fn dropout(&mut self, dropout: Dropout) -> Result<()> {
        if self.discard_post_header() {
            return Ok(());
        }
        self.dropouts.push(dropout);
        Ok(())
    }

    fn sync(&mut self, _sync: Sync) -> Result<()> {
        if self.discard_post_header() {
            return Ok(());
        }
        self.sync_count += 1;
        Ok(())
    }

    fn header_complete(&mut self) -> Result<()> {
        // A format that fails to resolve is dropped from the registry and
        // recorded; the rest of the log stays readable.
        for error in self.formats.resolve_all() {
            tracing::warn!(error = %error, "message format resolution failed");
            self.parsing_errors.push(error.to_string());
        }

        // Lazily resolve the single fields of stored info and parameter
        // messages now that all formats are known.
        let formats = &self.formats;
        let mut resolution_errors = Vec::new();
        let single_fields = self
            .message_info
            .values_mut()
            .map(MessageInfo::field_mut)
            .chain(
                self.message_info_multi
                    .values_mut()
                    .flatten()
                    .flatten()
                    .map(MessageInfo::field_mut),
            )
            .chain(
                self.initial_parameters
                    .values_mut()
                    .map(MessageInfo::field_mut),
            )
            .chain(
                self.default_parameters
                    .values_mut()
                    .map(ParameterDefault::field_mut),
            );
        for field in single_fields {
            if let Err(error) = Self::resolve_single_field(formats, field) {
                resolution_errors.push(error.to_string());
            }
        }
        self.parsing_errors.append(&mut resolution_errors);

        self.header_complete = true;
        Ok(())
    }

    fn error(&mut self, msg: &str, recoverable: bool) {
        if !recoverable {
            self.had_fatal_error = true;
        }
        self.parsing_errors.push(msg.to_string());
    }
}
