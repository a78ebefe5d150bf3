// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message formats and the format registry.
//!
//! A message format is a named, ordered list of fields defining the byte
//! layout of samples on a topic: fields are laid out contiguously with no
//! padding, so offsets are the prefix sum of field sizes.
//!
//! Formats can be recursive: a field may reference another format by name
//! (nested field). Since formats arrive in arbitrary order in the log
//! header, nested references are resolved once, after the header is
//! complete, by [`FormatRegistry::resolve_all`]. The resolver is
//! depth-first and memoized; a re-entrant resolve of the same name (a
//! cycle) fails that format.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::core::{Result, UlogError};
use crate::schema::field::{BasicType, Field};

/// A named, ordered list of fields defining the layout of a sample.
#[derive(Debug, Clone)]
pub struct MessageFormat {
    name: String,
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
}

impl MessageFormat {
    /// Manually construct a message format from a field list.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        let mut by_name = HashMap::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            by_name.entry(field.name().to_string()).or_insert(index);
        }
        MessageFormat {
            name: name.into(),
            fields,
            by_name,
        }
    }

    /// Parse a format record payload: `"<name>:<field0>;<field1>;…;"`.
    /// Every field must be terminated by `';'`.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| UlogError::parse("MessageFormat", "definition is not valid UTF-8"))?;
        let colon = text
            .find(':')
            .ok_or_else(|| UlogError::parse("MessageFormat", "invalid format (missing ':')"))?;
        let name = &text[..colon];
        let mut rest = &text[colon + 1..];

        let mut fields = Vec::new();
        while !rest.is_empty() {
            let semicolon = rest.find(';').ok_or_else(|| {
                UlogError::parse("MessageFormat", "invalid format (missing ';')")
            })?;
            fields.push(Field::parse(&rest[..semicolon])?);
            rest = &rest[semicolon + 1..];
        }

        Ok(Self::new(name, fields))
    }

    /// Encode the format back into its text form, the inverse of
    /// [`MessageFormat::from_bytes`].
    pub fn encode(&self) -> String {
        let mut text = format!("{}:", self.name);
        for field in &self.fields {
            text.push_str(&field.encode());
            text.push(';');
        }
        text
    }

    /// The format name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fields, in definition order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.by_name
            .get(name)
            .map(|&index| &self.fields[index])
            .ok_or_else(|| UlogError::access(format!("field not found: '{name}'")))
    }

    /// True if the format contains a field with the given name.
    pub fn has_field(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The field names, in definition order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    /// Total size of one sample in bytes. Valid only once all fields are
    /// resolved.
    pub fn size_bytes(&self) -> Result<usize> {
        self.fields.iter().map(|f| f.size_bytes()).sum()
    }

    /// True once every field is resolved.
    pub fn is_resolved(&self) -> bool {
        self.fields.iter().all(|f| f.is_resolved())
    }
}

/// Two formats are equal if their names match and their field sequences
/// are element-wise equal.
impl PartialEq for MessageFormat {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl Eq for MessageFormat {}

/// Registry of message formats collected from the log header.
///
/// Formats are inserted unresolved while the header is read, then resolved
/// in one pass at header completion. Resolved formats are shared as
/// `Arc<MessageFormat>` between the registry, subscriptions, and nested
/// field references.
#[derive(Debug, Default)]
pub struct FormatRegistry {
    unresolved: BTreeMap<String, MessageFormat>,
    resolved: BTreeMap<String, Arc<MessageFormat>>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a format parsed from the header. Duplicate names are
    /// rejected.
    pub fn insert(&mut self, format: MessageFormat) -> Result<()> {
        let name = format.name().to_string();
        if self.unresolved.contains_key(&name) || self.resolved.contains_key(&name) {
            return Err(UlogError::parse(
                "MessageFormat",
                format!("duplicate message format: '{name}'"),
            ));
        }
        self.unresolved.insert(name, format);
        Ok(())
    }

    /// Resolve every registered format: assign field offsets and wire
    /// nested references. Formats that fail (unknown nested name, cycle)
    /// are dropped from the registry; one error per failed format is
    /// returned. Resolution is idempotent.
    pub fn resolve_all(&mut self) -> Vec<UlogError> {
        let mut errors = Vec::new();
        let names: Vec<String> = self.unresolved.keys().cloned().collect();
        for name in names {
            // May already have been resolved as a dependency of an earlier
            // format, or consumed by a failing parent.
            if self.resolved.contains_key(&name) || !self.unresolved.contains_key(&name) {
                continue;
            }
            let mut visiting = BTreeSet::new();
            if let Err(e) =
                Self::resolve_one(&name, &mut self.unresolved, &mut self.resolved, &mut visiting)
            {
                errors.push(e);
            }
        }
        errors
    }

    fn resolve_one(
        name: &str,
        unresolved: &mut BTreeMap<String, MessageFormat>,
        resolved: &mut BTreeMap<String, Arc<MessageFormat>>,
        visiting: &mut BTreeSet<String>,
    ) -> Result<Arc<MessageFormat>> {
        if let Some(format) = resolved.get(name) {
            return Ok(Arc::clone(format));
        }
        if visiting.contains(name) {
            return Err(UlogError::parse(
                "MessageFormat",
                format!("recursive message format definition: '{name}'"),
            ));
        }
        let mut format = unresolved
            .remove(name)
            .ok_or_else(|| UlogError::format_not_found(name))?;
        visiting.insert(name.to_string());

        let mut offset = 0;
        for index in 0..format.fields.len() {
            let needs_child = format.fields[index].basic_type() == BasicType::Nested
                && !format.fields[index].is_resolved();
            if needs_child {
                let child_name = format.fields[index].type_name().to_string();
                let child = Self::resolve_one(&child_name, unresolved, resolved, visiting)?;
                format.fields[index].attach_nested(&child, offset)?;
            } else {
                format.fields[index].resolve_basic(offset)?;
            }
            offset += format.fields[index].size_bytes()?;
        }

        visiting.remove(name);
        let format = Arc::new(format);
        resolved.insert(name.to_string(), Arc::clone(&format));
        Ok(format)
    }

    /// Look up a resolved format by name.
    pub fn get(&self, name: &str) -> Option<&Arc<MessageFormat>> {
        self.resolved.get(name)
    }

    /// The resolved formats, keyed by name.
    pub fn resolved(&self) -> &BTreeMap<String, Arc<MessageFormat>> {
        &self.resolved
    }

    /// Number of registered formats, resolved or not.
    pub fn len(&self) -> usize {
        self.unresolved.len() + self.resolved.len()
    }

    /// True when no formats are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(definitions: &[&str]) -> FormatRegistry {
        let mut registry = FormatRegistry::new();
        for definition in definitions {
            registry
                .insert(MessageFormat::from_bytes(definition.as_bytes()).unwrap())
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_parse_format() {
        let format =
            MessageFormat::from_bytes(b"sensor_accel:uint64_t timestamp;float[3] accel;").unwrap();
        assert_eq!(format.name(), "sensor_accel");
        assert_eq!(format.fields().len(), 2);
        assert_eq!(format.field_names(), vec!["timestamp", "accel"]);
        assert_eq!(format.field("accel").unwrap().array_length(), Some(3));
        assert!(format.field("missing").is_err());
    }

    #[test]
    fn test_parse_format_missing_colon() {
        assert!(MessageFormat::from_bytes(b"no_fields_here").is_err());
    }

    #[test]
    fn test_parse_format_missing_semicolon() {
        assert!(MessageFormat::from_bytes(b"bad:uint64_t timestamp").is_err());
    }

    #[test]
    fn test_encode_round_trip() {
        let text = "sensor_accel:uint64_t timestamp;float[3] accel;uint8_t id;";
        let format = MessageFormat::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(format.encode(), text);
    }

    #[test]
    fn test_resolution_offsets_are_prefix_sums() {
        let mut registry =
            registry_with(&["msg:uint64_t timestamp;uint32_t[3] array;uint16_t x;"]);
        assert!(registry.resolve_all().is_empty());

        let format = registry.get("msg").unwrap();
        assert!(format.is_resolved());
        assert_eq!(format.field("timestamp").unwrap().offset_in_message(), Some(0));
        assert_eq!(format.field("array").unwrap().offset_in_message(), Some(8));
        assert_eq!(format.field("x").unwrap().offset_in_message(), Some(20));
        assert_eq!(format.size_bytes().unwrap(), 22);
    }

    #[test]
    fn test_nested_resolution() {
        let mut registry = registry_with(&[
            "outer:uint64_t timestamp;inner child;uint8_t tail;",
            "inner:int32_t a;int32_t b;",
        ]);
        assert!(registry.resolve_all().is_empty());

        let outer = registry.get("outer").unwrap();
        let child = outer.field("child").unwrap();
        assert!(child.is_resolved());
        assert_eq!(child.offset_in_message(), Some(8));
        assert_eq!(child.element_size(), 8);
        assert_eq!(outer.field("tail").unwrap().offset_in_message(), Some(16));
        assert_eq!(outer.size_bytes().unwrap(), 17);
        assert_eq!(child.nested_field("b").unwrap().offset_in_message(), Some(4));
    }

    #[test]
    fn test_nested_array_sizing() {
        let mut registry = registry_with(&[
            "outer:pair[3] pairs;uint8_t tail;",
            "pair:uint8_t a;uint8_t b;",
        ]);
        assert!(registry.resolve_all().is_empty());

        let outer = registry.get("outer").unwrap();
        assert_eq!(outer.field("pairs").unwrap().size_bytes().unwrap(), 6);
        assert_eq!(outer.field("tail").unwrap().offset_in_message(), Some(6));
    }

    #[test]
    fn test_unknown_nested_format_fails() {
        let mut registry = registry_with(&["outer:uint64_t timestamp;missing child;"]);
        let errors = registry.resolve_all();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], UlogError::FormatNotFound { .. }));
        assert!(registry.get("outer").is_none());
    }

    #[test]
    fn test_cycle_fails() {
        let mut registry = registry_with(&["a:b child;", "b:a child;"]);
        let errors = registry.resolve_all();
        assert!(!errors.is_empty());
        assert!(registry.get("a").is_none());
        assert!(registry.get("b").is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut registry = registry_with(&["msg:uint64_t timestamp;"]);
        let dup = MessageFormat::from_bytes(b"msg:uint64_t timestamp;").unwrap();
        assert!(registry.insert(dup).is_err());
    }

    #[test]
    fn test_resolve_all_is_idempotent() {
        let mut registry = registry_with(&["msg:uint64_t timestamp;uint16_t x;"]);
        assert!(registry.resolve_all().is_empty());
        assert!(registry.resolve_all().is_empty());
        assert_eq!(registry.get("msg").unwrap().size_bytes().unwrap(), 10);
    }

    #[test]
    fn test_format_equality() {
        let a = MessageFormat::from_bytes(b"m:uint64_t timestamp;uint16_t x;").unwrap();
        let b = MessageFormat::from_bytes(b"m:uint64_t timestamp;uint16_t x;").unwrap();
        let c = MessageFormat::from_bytes(b"m:uint64_t timestamp;uint32_t x;").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_format_has_zero_size() {
        let mut registry = registry_with(&["empty:"]);
        assert!(registry.resolve_all().is_empty());
        assert_eq!(registry.get("empty").unwrap().size_bytes().unwrap(), 0);
    }
}
