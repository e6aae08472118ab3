//! Generic field storage shared by every message type.
//!
//! A [`FieldSet`] maps field numbers to set values. Only present fields
//! are stored; a missing key means "unset". Iteration is always in
//! ascending field number, which fixes the serialized byte order.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::codec::{compute_field_size, write_field};
use crate::descriptor::{FieldDescriptor, FieldType, MessageDescriptor};
use crate::error::FieldError;
use crate::message::{DynamicMessage, Message, MessageBuilder};
use crate::model::{FieldValue, Value};
use crate::wire::Writer;

#[derive(Debug, Clone)]
struct FieldEntry {
    descriptor: Arc<FieldDescriptor>,
    value: FieldValue,
}

/// Ordered mapping from field to value.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: BTreeMap<u32, FieldEntry>,
}

impl FieldSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of set fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterates set fields in ascending field-number order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<FieldDescriptor>, &FieldValue)> {
        self.fields.values().map(|e| (&e.descriptor, &e.value))
    }

    pub fn has_field(&self, field: &FieldDescriptor) -> bool {
        self.fields.contains_key(&field.number())
    }

    pub fn get(&self, field: &FieldDescriptor) -> Option<&FieldValue> {
        self.fields.get(&field.number()).map(|e| &e.value)
    }

    /// Number of elements of a repeated field; 0 if unset.
    pub fn repeated_count(&self, field: &FieldDescriptor) -> usize {
        match self.get(field) {
            Some(FieldValue::RepeatedScalar(v)) => v.len(),
            Some(FieldValue::RepeatedMessage(v)) => v.len(),
            _ => 0,
        }
    }

    /// Replaces a field's value.
    ///
    /// The value's shape must match the field's cardinality and kind.
    /// Setting an empty list clears a repeated field.
    pub fn set(&mut self, field: &Arc<FieldDescriptor>, value: FieldValue) -> Result<(), FieldError> {
        check_value(field, &value)?;
        if value.is_empty() {
            self.clear(field);
            return Ok(());
        }
        self.insert(field, value);
        Ok(())
    }

    /// Appends a scalar to a repeated field.
    pub fn add_repeated_scalar(&mut self, field: &Arc<FieldDescriptor>, value: Value) -> Result<(), FieldError> {
        check_repeated(field)?;
        check_scalar(field, &value)?;
        self.push_scalar(field, value);
        Ok(())
    }

    /// Appends a message to a repeated message field.
    pub fn add_repeated_message(
        &mut self,
        field: &Arc<FieldDescriptor>,
        message: DynamicMessage,
    ) -> Result<(), FieldError> {
        check_repeated(field)?;
        check_message(field, &message)?;
        self.push_message(field, message);
        Ok(())
    }

    /// Replaces one element of a repeated scalar field.
    pub fn set_repeated_scalar(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        value: Value,
    ) -> Result<(), FieldError> {
        check_repeated(field)?;
        check_scalar(field, &value)?;
        let len = self.repeated_count(field);
        match self.fields.get_mut(&field.number()).map(|e| &mut e.value) {
            Some(FieldValue::RepeatedScalar(values)) if index < len => {
                values[index] = value;
                Ok(())
            }
            _ => Err(out_of_bounds(field, index, len)),
        }
    }

    /// Replaces one element of a repeated message field.
    pub fn set_repeated_message(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        message: DynamicMessage,
    ) -> Result<(), FieldError> {
        check_repeated(field)?;
        check_message(field, &message)?;
        let len = self.repeated_count(field);
        match self.fields.get_mut(&field.number()).map(|e| &mut e.value) {
            Some(FieldValue::RepeatedMessage(values)) if index < len => {
                values[index] = message;
                Ok(())
            }
            _ => Err(out_of_bounds(field, index, len)),
        }
    }

    /// Removes a field.
    pub fn clear(&mut self, field: &FieldDescriptor) {
        self.fields.remove(&field.number());
    }

    // -------------------------------------------------------------------------
    // Unchecked stores used by the parser, which has already matched the
    // wire data against the field's type.
    // -------------------------------------------------------------------------

    pub(crate) fn store_scalar(&mut self, field: &Arc<FieldDescriptor>, value: Value) {
        if field.is_repeated() {
            self.push_scalar(field, value);
        } else {
            self.insert(field, FieldValue::Scalar(value));
        }
    }

    pub(crate) fn store_message(&mut self, field: &Arc<FieldDescriptor>, message: DynamicMessage) {
        if field.is_repeated() {
            self.push_message(field, message);
        } else {
            self.insert(field, FieldValue::Message(message));
        }
    }

    pub(crate) fn extend_repeated_scalars(&mut self, field: &Arc<FieldDescriptor>, values: Vec<Value>) {
        if values.is_empty() {
            return;
        }
        match self.fields.get_mut(&field.number()).map(|e| &mut e.value) {
            Some(FieldValue::RepeatedScalar(existing)) => existing.extend(values),
            _ => self.insert(field, FieldValue::RepeatedScalar(values)),
        }
    }

    fn insert(&mut self, field: &Arc<FieldDescriptor>, value: FieldValue) {
        self.fields.insert(
            field.number(),
            FieldEntry {
                descriptor: field.clone(),
                value,
            },
        );
    }

    fn push_scalar(&mut self, field: &Arc<FieldDescriptor>, value: Value) {
        match self.fields.get_mut(&field.number()).map(|e| &mut e.value) {
            Some(FieldValue::RepeatedScalar(values)) => values.push(value),
            _ => self.insert(field, FieldValue::RepeatedScalar(vec![value])),
        }
    }

    fn push_message(&mut self, field: &Arc<FieldDescriptor>, message: DynamicMessage) {
        match self.fields.get_mut(&field.number()).map(|e| &mut e.value) {
            Some(FieldValue::RepeatedMessage(values)) => values.push(message),
            _ => self.insert(field, FieldValue::RepeatedMessage(vec![message])),
        }
    }

    // -------------------------------------------------------------------------
    // Merge
    // -------------------------------------------------------------------------

    /// Merges every set field of `other` into this set.
    ///
    /// - Repeated fields: `other`'s elements are appended after ours.
    /// - Singular scalars: `other`'s value overwrites ours.
    /// - Singular messages: taken as-is if ours is unset, otherwise the
    ///   two are merged recursively into a new value.
    pub fn merge_from(&mut self, other: &FieldSet) {
        for (number, entry) in &other.fields {
            let existing = self.fields.get_mut(number).map(|e| &mut e.value);
            match (&entry.value, existing) {
                (FieldValue::RepeatedScalar(src), Some(FieldValue::RepeatedScalar(dst))) => {
                    dst.extend(src.iter().cloned());
                }
                (FieldValue::RepeatedMessage(src), Some(FieldValue::RepeatedMessage(dst))) => {
                    dst.extend(src.iter().cloned());
                }
                (FieldValue::Message(src), Some(FieldValue::Message(dst))) => {
                    let mut builder = dst.to_builder();
                    builder.fields_mut().merge_from(src.fields());
                    builder.unknown_fields_mut().merge_from(src.unknown_fields());
                    *dst = builder.build_partial();
                }
                _ => self.insert(&entry.descriptor, entry.value.clone()),
            }
        }
    }

    // -------------------------------------------------------------------------
    // Initialization
    // -------------------------------------------------------------------------

    /// Returns true if every required field of `descriptor` is set and
    /// every embedded message, singular or repeated, is itself
    /// initialized. Stops at the first failure.
    pub fn is_initialized(&self, descriptor: &MessageDescriptor) -> bool {
        let required_present = descriptor
            .fields()
            .iter()
            .filter(|f| f.is_required())
            .all(|f| self.has_field(f));
        if !required_present {
            return false;
        }
        self.fields.values().all(|entry| match &entry.value {
            FieldValue::Message(m) => m.is_initialized(),
            FieldValue::RepeatedMessage(ms) => ms.iter().all(|m| m.is_initialized()),
            FieldValue::Scalar(_) | FieldValue::RepeatedScalar(_) => true,
        })
    }

    // -------------------------------------------------------------------------
    // Size and serialization
    // -------------------------------------------------------------------------

    /// Encoded size of all set fields.
    pub fn compute_size(&self) -> usize {
        self.iter()
            .map(|(field, value)| compute_field_size(field, value))
            .sum()
    }

    /// Writes all set fields in ascending field-number order.
    pub fn write_to(&self, writer: &mut Writer) {
        for (field, value) in self.iter() {
            write_field(writer, field, value);
        }
    }

    /// Deterministic hash of the field content.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|((na, a), (nb, b))| na == nb && a.value == b.value)
    }
}

impl Eq for FieldSet {}

impl Hash for FieldSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields.len().hash(state);
        for (number, entry) in &self.fields {
            number.hash(state);
            entry.value.hash(state);
        }
    }
}

fn check_value(field: &FieldDescriptor, value: &FieldValue) -> Result<(), FieldError> {
    match value {
        FieldValue::Scalar(v) => {
            check_singular(field)?;
            check_scalar(field, v)
        }
        FieldValue::Message(m) => {
            check_singular(field)?;
            check_message(field, m)
        }
        FieldValue::RepeatedScalar(vs) => {
            check_repeated(field)?;
            vs.iter().try_for_each(|v| check_scalar(field, v))
        }
        FieldValue::RepeatedMessage(ms) => {
            check_repeated(field)?;
            ms.iter().try_for_each(|m| check_message(field, m))
        }
    }
}

fn check_singular(field: &FieldDescriptor) -> Result<(), FieldError> {
    if field.is_repeated() {
        return Err(FieldError::Repeated {
            field: field.full_name(),
        });
    }
    Ok(())
}

fn check_repeated(field: &FieldDescriptor) -> Result<(), FieldError> {
    if !field.is_repeated() {
        return Err(FieldError::NotRepeated {
            field: field.full_name(),
        });
    }
    Ok(())
}

fn check_scalar(field: &FieldDescriptor, value: &Value) -> Result<(), FieldError> {
    match field.field_type() {
        FieldType::Scalar(t) if value.is_valid_for(*t) => Ok(()),
        other => Err(FieldError::KindMismatch {
            field: field.full_name(),
            expected: other.name(),
            found: value.kind_name(),
        }),
    }
}

fn check_message(field: &FieldDescriptor, message: &DynamicMessage) -> Result<(), FieldError> {
    match field.field_type().message_type() {
        Some(expected) if MessageDescriptor::same_type(expected, message.descriptor()) => Ok(()),
        Some(expected) => Err(FieldError::MessageTypeMismatch {
            field: field.full_name(),
            expected: expected.full_name().to_string(),
            found: message.descriptor().full_name().to_string(),
        }),
        None => Err(FieldError::KindMismatch {
            field: field.full_name(),
            expected: field.field_type().name(),
            found: "message",
        }),
    }
}

fn out_of_bounds(field: &FieldDescriptor, index: usize, len: usize) -> FieldError {
    FieldError::IndexOutOfBounds {
        field: field.full_name(),
        index,
        len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{foreign_message, test_all_types};

    #[test]
    fn test_iteration_is_in_number_order() {
        let desc = test_all_types();
        let mut set = FieldSet::new();
        for name in ["optional_string", "optional_int32", "repeated_int32", "optional_int64"] {
            let field = desc.field_by_name(name).unwrap();
            let value = match field.default_value() {
                FieldValue::RepeatedScalar(_) => FieldValue::RepeatedScalar(vec![Value::I32(1)]),
                other => other,
            };
            set.set(field, value).unwrap();
        }
        let numbers: Vec<u32> = set.iter().map(|(f, _)| f.number()).collect();
        let mut sorted = numbers.clone();
        sorted.sort_unstable();
        assert_eq!(numbers, sorted);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_set_checks_shape() {
        let desc = test_all_types();
        let int32 = desc.field_by_name("optional_int32").unwrap();
        let repeated = desc.field_by_name("repeated_int32").unwrap();
        let message = desc.field_by_name("optional_foreign_message").unwrap();
        let mut set = FieldSet::new();

        assert!(matches!(
            set.set(int32, FieldValue::Scalar(Value::I64(1))),
            Err(FieldError::KindMismatch { .. })
        ));
        assert!(matches!(
            set.set(int32, FieldValue::RepeatedScalar(vec![Value::I32(1)])),
            Err(FieldError::NotRepeated { .. })
        ));
        assert!(matches!(
            set.set(repeated, FieldValue::Scalar(Value::I32(1))),
            Err(FieldError::Repeated { .. })
        ));
        let wrong_type = DynamicMessage::default_instance(&desc);
        assert!(matches!(
            set.set(message, FieldValue::Message(wrong_type)),
            Err(FieldError::MessageTypeMismatch { .. })
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_empty_list_clears() {
        let desc = test_all_types();
        let repeated = desc.field_by_name("repeated_int32").unwrap();
        let mut set = FieldSet::new();
        set.add_repeated_scalar(repeated, Value::I32(1)).unwrap();
        assert!(set.has_field(repeated));
        set.set(repeated, FieldValue::RepeatedScalar(Vec::new())).unwrap();
        assert!(!set.has_field(repeated));
    }

    #[test]
    fn test_set_repeated_index() {
        let desc = test_all_types();
        let repeated = desc.field_by_name("repeated_int32").unwrap();
        let mut set = FieldSet::new();
        set.add_repeated_scalar(repeated, Value::I32(1)).unwrap();
        set.add_repeated_scalar(repeated, Value::I32(2)).unwrap();
        set.set_repeated_scalar(repeated, 1, Value::I32(5)).unwrap();
        assert_eq!(
            set.get(repeated),
            Some(&FieldValue::RepeatedScalar(vec![Value::I32(1), Value::I32(5)]))
        );
        assert!(matches!(
            set.set_repeated_scalar(repeated, 2, Value::I32(0)),
            Err(FieldError::IndexOutOfBounds { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn test_merge_appends_repeated_and_overwrites_singular() {
        let desc = test_all_types();
        let repeated = desc.field_by_name("repeated_string").unwrap();
        let singular = desc.field_by_name("optional_int32").unwrap();

        let mut dest = FieldSet::new();
        dest.add_repeated_scalar(repeated, "b".into()).unwrap();
        dest.set(singular, FieldValue::Scalar(Value::I32(2))).unwrap();

        let mut source = FieldSet::new();
        source.add_repeated_scalar(repeated, "a".into()).unwrap();
        source.set(singular, FieldValue::Scalar(Value::I32(1))).unwrap();

        dest.merge_from(&source);
        assert_eq!(
            dest.get(repeated),
            Some(&FieldValue::RepeatedScalar(vec!["b".into(), "a".into()]))
        );
        assert_eq!(dest.get(singular), Some(&FieldValue::Scalar(Value::I32(1))));
    }

    #[test]
    fn test_merge_recurses_into_messages() {
        let desc = test_all_types();
        let foreign = foreign_message();
        let field = desc.field_by_name("optional_foreign_message").unwrap();
        let c = foreign.field_by_name("c").unwrap();
        let d = foreign.field_by_name("d").unwrap();

        let mut x = DynamicMessage::builder(&foreign);
        x.set_scalar(c, 1).unwrap();
        let mut y = DynamicMessage::builder(&foreign);
        y.set_scalar(d, 2).unwrap();

        let mut dest = FieldSet::new();
        dest.set(field, FieldValue::Message(x.build_partial())).unwrap();
        let mut source = FieldSet::new();
        source.set(field, FieldValue::Message(y.build_partial())).unwrap();

        dest.merge_from(&source);
        let merged = dest.get(field).and_then(FieldValue::as_message).unwrap();
        assert_eq!(merged.get_field(c), Some(&FieldValue::Scalar(Value::I32(1))));
        assert_eq!(merged.get_field(d), Some(&FieldValue::Scalar(Value::I32(2))));
    }

    #[test]
    fn test_size_matches_written_bytes() {
        let desc = test_all_types();
        let mut set = FieldSet::new();
        set.set(
            desc.field_by_name("optional_int32").unwrap(),
            FieldValue::Scalar(Value::I32(-7)),
        )
        .unwrap();
        for v in [1, 300, 70000] {
            set.add_repeated_scalar(desc.field_by_name("packed_int32").unwrap(), Value::I32(v))
                .unwrap();
        }
        set.add_repeated_scalar(desc.field_by_name("repeated_string").unwrap(), "x".into())
            .unwrap();

        let mut writer = Writer::new();
        set.write_to(&mut writer);
        assert_eq!(writer.len(), set.compute_size());
    }

    #[test]
    fn test_equal_sets_hash_equal() {
        let desc = test_all_types();
        let field = desc.field_by_name("optional_string").unwrap();
        let mut a = FieldSet::new();
        a.set(field, FieldValue::Scalar("x".into())).unwrap();
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());

        let mut c = a.clone();
        c.set(field, FieldValue::Scalar("y".into())).unwrap();
        assert_ne!(a, c);
    }
}
