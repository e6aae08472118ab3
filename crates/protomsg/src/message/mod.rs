//! The message/builder capability pair.
//!
//! [`Message`] is the immutable read side: reflection, initialization
//! checks, size, serialization, equality and hashing. [`MessageBuilder`]
//! is the mutable write side: reflective mutation, merging from messages,
//! bytes and streams, and the `build`/`build_partial` terminals.
//!
//! A built message never changes, so its encoded size is memoized in a
//! [`SizeCache`]. Concurrent readers may both compute the size and store
//! it; the value is a pure function of the content, so the race is benign
//! and no lock is taken.

pub mod dynamic;

pub use dynamic::{DynamicMessage, DynamicMessageBuilder};

use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rustc_hash::FxHasher;

use crate::codec::{ParseTarget, merge_fields_from};
use crate::descriptor::{ExtensionRegistry, FieldDescriptor, MessageDescriptor};
use crate::error::{DecodeError, FieldError, StreamError, TypeMismatchError, UninitializedMessageError};
use crate::limits::ParseOptions;
use crate::model::{FieldSet, FieldValue, UnknownFieldSet, Value};
use crate::wire::{
    END_TAG, LimitedReader, Reader, Writer, compute_raw_varint64_size, read_raw_varint32_from,
};

const UNCOMPUTED: usize = usize::MAX;

/// Memoized encoded size of an immutable message.
pub struct SizeCache(AtomicUsize);

impl SizeCache {
    pub fn new() -> Self {
        Self(AtomicUsize::new(UNCOMPUTED))
    }

    /// Returns the cached size, computing and storing it on first use.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> usize) -> usize {
        let cached = self.0.load(Ordering::Relaxed);
        if cached != UNCOMPUTED {
            return cached;
        }
        let size = compute();
        self.0.store(size, Ordering::Relaxed);
        size
    }
}

impl Default for SizeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SizeCache {
    fn clone(&self) -> Self {
        Self(AtomicUsize::new(self.0.load(Ordering::Relaxed)))
    }
}

impl Debug for SizeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.load(Ordering::Relaxed) {
            UNCOMPUTED => f.write_str("SizeCache(<uncomputed>)"),
            size => write!(f, "SizeCache({})", size),
        }
    }
}

/// Borrowed element of a repeated field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementRef<'a> {
    Scalar(&'a Value),
    Message(&'a DynamicMessage),
}

/// Read side of a message type.
pub trait Message: Clone + Debug + Sized {
    type Builder: MessageBuilder<Message = Self>;

    fn descriptor(&self) -> &Arc<MessageDescriptor>;

    fn fields(&self) -> &FieldSet;

    fn unknown_fields(&self) -> &UnknownFieldSet;

    fn size_cache(&self) -> &SizeCache;

    /// A fresh, empty builder for this message's type.
    fn new_builder_for_type(&self) -> Self::Builder;

    /// A builder seeded with a copy of this message's content.
    fn to_builder(&self) -> Self::Builder;

    /// The empty message of this type.
    fn default_instance_for_type(&self) -> Self;

    // -------------------------------------------------------------------------
    // Reflection
    // -------------------------------------------------------------------------

    fn has_field(&self, field: &FieldDescriptor) -> bool {
        self.fields().has_field(field)
    }

    /// The stored value of a set field.
    fn get_field(&self, field: &FieldDescriptor) -> Option<&FieldValue> {
        self.fields().get(field)
    }

    /// The stored value, or what an unset field reads as.
    fn field_or_default(&self, field: &FieldDescriptor) -> FieldValue {
        self.get_field(field)
            .cloned()
            .unwrap_or_else(|| field.default_value())
    }

    fn repeated_field_count(&self, field: &FieldDescriptor) -> usize {
        self.fields().repeated_count(field)
    }

    /// One element of a repeated field.
    fn get_repeated_field(&self, field: &FieldDescriptor, index: usize) -> Option<ElementRef<'_>> {
        match self.get_field(field)? {
            FieldValue::RepeatedScalar(values) => values.get(index).map(ElementRef::Scalar),
            FieldValue::RepeatedMessage(values) => values.get(index).map(ElementRef::Message),
            FieldValue::Scalar(_) | FieldValue::Message(_) => None,
        }
    }

    /// Returns true if every required field is set, recursively through
    /// embedded messages.
    fn is_initialized(&self) -> bool {
        self.fields().is_initialized(self.descriptor())
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    /// Encoded size in bytes, computed once per message.
    fn serialized_size(&self) -> usize {
        self.size_cache().get_or_compute(|| {
            let unknown = if self.descriptor().message_set_wire_format() {
                self.unknown_fields().serialized_size_as_message_set()
            } else {
                self.unknown_fields().serialized_size()
            };
            self.fields().compute_size() + unknown
        })
    }

    /// Appends the encoded message to `writer`.
    fn write_to_writer(&self, writer: &mut Writer) {
        self.fields().write_to(writer);
        if self.descriptor().message_set_wire_format() {
            self.unknown_fields().write_as_message_set_to(writer);
        } else {
            self.unknown_fields().write_to(writer);
        }
    }

    /// Encodes the message.
    ///
    /// # Panics
    ///
    /// Panics if the number of bytes written differs from
    /// [`serialized_size`](Message::serialized_size), which means the size
    /// and write paths disagree.
    fn to_bytes(&self) -> Vec<u8> {
        let size = self.serialized_size();
        let mut writer = Writer::with_capacity(size);
        self.write_to_writer(&mut writer);
        assert_written(self.descriptor(), size, writer.len());
        writer.into_bytes()
    }

    /// Writes the encoded message to a stream.
    fn write_to<W: io::Write + ?Sized>(&self, output: &mut W) -> io::Result<()> {
        output.write_all(&self.to_bytes())
    }

    /// Writes a varint length prefix followed by the encoded message.
    fn write_delimited_to<W: io::Write + ?Sized>(&self, output: &mut W) -> io::Result<()> {
        let size = self.serialized_size();
        let prefix = compute_raw_varint64_size(size as u64);
        let mut writer = Writer::with_capacity(prefix + size);
        writer.write_raw_varint64(size as u64);
        self.write_to_writer(&mut writer);
        assert_written(self.descriptor(), prefix + size, writer.len());
        output.write_all(writer.as_bytes())
    }

    // -------------------------------------------------------------------------
    // Equality and hashing
    // -------------------------------------------------------------------------

    /// Same type, same fields, same unknown fields.
    fn content_eq<M: Message>(&self, other: &M) -> bool {
        MessageDescriptor::same_type(self.descriptor(), other.descriptor())
            && self.fields() == other.fields()
            && self.unknown_fields() == other.unknown_fields()
    }

    /// Deterministic content hash, stable across runs.
    fn hash_code(&self) -> u64 {
        let mut hash: u64 = 41;
        hash = hash
            .wrapping_mul(19)
            .wrapping_add(self.descriptor().type_hash());
        hash = hash
            .wrapping_mul(53)
            .wrapping_add(self.fields().content_hash());
        hash.wrapping_mul(29)
            .wrapping_add(unknown_fields_hash(self.unknown_fields()))
    }
}

fn unknown_fields_hash(unknown_fields: &UnknownFieldSet) -> u64 {
    let mut hasher = FxHasher::default();
    unknown_fields.hash(&mut hasher);
    hasher.finish()
}

fn assert_written(descriptor: &MessageDescriptor, expected: usize, written: usize) {
    assert_eq!(
        expected,
        written,
        "serializing {} wrote {} bytes but its computed size is {}",
        descriptor.full_name(),
        written,
        expected
    );
}

/// Write side of a message type.
///
/// Mutations check that the field belongs to the builder's type (as a
/// declared field or an extension) and that the value matches the
/// field's cardinality and kind.
pub trait MessageBuilder: Clone + Debug + Sized {
    type Message: Message;

    fn descriptor(&self) -> &Arc<MessageDescriptor>;

    fn fields(&self) -> &FieldSet;

    fn fields_mut(&mut self) -> &mut FieldSet;

    fn unknown_fields(&self) -> &UnknownFieldSet;

    fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet;

    /// Split borrow of the descriptor and both field sets.
    fn parts_mut(&mut self) -> (&Arc<MessageDescriptor>, &mut FieldSet, &mut UnknownFieldSet);

    /// Freezes the current state without checking required fields.
    fn build_partial(self) -> Self::Message;

    /// Freezes the current state.
    ///
    /// Fails if a required field is missing here or in any embedded message.
    fn build(self) -> Result<Self::Message, UninitializedMessageError> {
        if !self.is_initialized() {
            return Err(UninitializedMessageError {
                type_name: self.descriptor().full_name().to_string(),
            });
        }
        Ok(self.build_partial())
    }

    fn is_initialized(&self) -> bool {
        self.fields().is_initialized(self.descriptor())
    }

    fn has_field(&self, field: &FieldDescriptor) -> bool {
        self.fields().has_field(field)
    }

    fn get_field(&self, field: &FieldDescriptor) -> Option<&FieldValue> {
        self.fields().get(field)
    }

    // -------------------------------------------------------------------------
    // Field mutation
    // -------------------------------------------------------------------------

    fn set_field(&mut self, field: &Arc<FieldDescriptor>, value: FieldValue) -> Result<&mut Self, FieldError> {
        check_owned(self.descriptor(), field)?;
        self.fields_mut().set(field, value)?;
        Ok(self)
    }

    fn set_scalar(&mut self, field: &Arc<FieldDescriptor>, value: impl Into<Value>) -> Result<&mut Self, FieldError> {
        self.set_field(field, FieldValue::Scalar(value.into()))
    }

    fn set_message(&mut self, field: &Arc<FieldDescriptor>, message: DynamicMessage) -> Result<&mut Self, FieldError> {
        self.set_field(field, FieldValue::Message(message))
    }

    /// Sets a message field from a builder without checking the builder's
    /// required fields; they are checked when this builder is built.
    fn set_message_builder(
        &mut self,
        field: &Arc<FieldDescriptor>,
        builder: DynamicMessageBuilder,
    ) -> Result<&mut Self, FieldError> {
        self.set_message(field, builder.build_partial())
    }

    fn add_repeated_scalar(
        &mut self,
        field: &Arc<FieldDescriptor>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, FieldError> {
        check_owned(self.descriptor(), field)?;
        self.fields_mut().add_repeated_scalar(field, value.into())?;
        Ok(self)
    }

    fn add_repeated_message(
        &mut self,
        field: &Arc<FieldDescriptor>,
        message: DynamicMessage,
    ) -> Result<&mut Self, FieldError> {
        check_owned(self.descriptor(), field)?;
        self.fields_mut().add_repeated_message(field, message)?;
        Ok(self)
    }

    fn set_repeated_scalar(
        &mut self,
        field: &Arc<FieldDescriptor>,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<&mut Self, FieldError> {
        check_owned(self.descriptor(), field)?;
        self.fields_mut().set_repeated_scalar(field, index, value.into())?;
        Ok(self)
    }

    fn set_repeated_message(
        &mut self,
        field: &Arc<FieldDescriptor>,
        index: usize,
        message: DynamicMessage,
    ) -> Result<&mut Self, FieldError> {
        check_owned(self.descriptor(), field)?;
        self.fields_mut().set_repeated_message(field, index, message)?;
        Ok(self)
    }

    fn clear_field(&mut self, field: &FieldDescriptor) -> Result<&mut Self, FieldError> {
        check_owned(self.descriptor(), field)?;
        self.fields_mut().clear(field);
        Ok(self)
    }

    /// Unsets every field and drops all unknown fields.
    fn clear(&mut self) -> &mut Self {
        let set: Vec<Arc<FieldDescriptor>> = self.fields().iter().map(|(f, _)| f.clone()).collect();
        for field in &set {
            self.fields_mut().clear(field);
        }
        self.unknown_fields_mut().clear();
        self
    }

    fn set_unknown_fields(&mut self, unknown_fields: UnknownFieldSet) -> &mut Self {
        *self.unknown_fields_mut() = unknown_fields;
        self
    }

    fn merge_unknown_fields(&mut self, unknown_fields: &UnknownFieldSet) -> &mut Self {
        self.unknown_fields_mut().merge_from(unknown_fields);
        self
    }

    // -------------------------------------------------------------------------
    // Merging
    // -------------------------------------------------------------------------

    /// Merges another message of the same type into this builder.
    ///
    /// Repeated fields are appended, singular scalars overwritten, and
    /// singular messages merged recursively.
    fn merge_from<M: Message>(&mut self, other: &M) -> Result<&mut Self, TypeMismatchError> {
        if !MessageDescriptor::same_type(self.descriptor(), other.descriptor()) {
            return Err(TypeMismatchError {
                expected: self.descriptor().full_name().to_string(),
                found: other.descriptor().full_name().to_string(),
            });
        }
        self.fields_mut().merge_from(other.fields());
        self.unknown_fields_mut().merge_from(other.unknown_fields());
        Ok(self)
    }

    /// Parses `data` as a complete message and merges it in.
    fn merge_from_bytes(&mut self, data: &[u8]) -> Result<&mut Self, DecodeError> {
        self.merge_from_bytes_with_registry(data, ExtensionRegistry::empty())
    }

    fn merge_from_bytes_with_registry(
        &mut self,
        data: &[u8],
        registry: &ExtensionRegistry,
    ) -> Result<&mut Self, DecodeError> {
        self.merge_from_bytes_with_options(data, registry, ParseOptions::default())
    }

    /// Parses with explicit limits.
    ///
    /// The input must end exactly after a complete field; a stray
    /// end-group tag fails with [`DecodeError::InvalidEndTag`].
    fn merge_from_bytes_with_options(
        &mut self,
        data: &[u8],
        registry: &ExtensionRegistry,
        options: ParseOptions,
    ) -> Result<&mut Self, DecodeError> {
        if data.len() > options.max_message_size {
            return Err(DecodeError::LengthExceedsLimit {
                field: "message",
                len: data.len(),
                max: options.max_message_size,
            });
        }
        let mut reader = Reader::with_options(data, options);
        {
            let (descriptor, fields, unknown_fields) = self.parts_mut();
            let mut target = ParseTarget {
                descriptor,
                fields,
                unknown_fields,
            };
            merge_fields_from(&mut reader, &mut target, registry)?;
        }
        reader.check_last_tag_was(END_TAG)?;
        Ok(self)
    }

    /// Reads `input` to its end and merges the bytes as one message.
    fn merge_from_reader<R: Read + ?Sized>(&mut self, input: &mut R) -> Result<&mut Self, StreamError> {
        self.merge_from_reader_with_registry(input, ExtensionRegistry::empty())
    }

    fn merge_from_reader_with_registry<R: Read + ?Sized>(
        &mut self,
        input: &mut R,
        registry: &ExtensionRegistry,
    ) -> Result<&mut Self, StreamError> {
        self.merge_from_reader_with_options(input, registry, ParseOptions::default())
    }

    /// Reads at most `options.max_message_size` bytes before giving up.
    fn merge_from_reader_with_options<R: Read + ?Sized>(
        &mut self,
        input: &mut R,
        registry: &ExtensionRegistry,
        options: ParseOptions,
    ) -> Result<&mut Self, StreamError> {
        let max = options.max_message_size;
        let mut data = Vec::new();
        (&mut *input).take(max as u64 + 1).read_to_end(&mut data)?;
        if data.len() > max {
            return Err(DecodeError::LengthExceedsLimit {
                field: "message",
                len: data.len(),
                max,
            }
            .into());
        }
        Ok(self.merge_from_bytes_with_options(&data, registry, options)?)
    }

    /// Reads one length-prefixed message and merges it in.
    ///
    /// Consumes exactly the prefix and the declared number of bytes,
    /// leaving anything after them in the stream. Returns `Ok(false)` if
    /// the stream was already at its end.
    fn merge_delimited_from<R: Read + ?Sized>(&mut self, input: &mut R) -> Result<bool, StreamError> {
        self.merge_delimited_from_with_registry(input, ExtensionRegistry::empty())
    }

    fn merge_delimited_from_with_registry<R: Read + ?Sized>(
        &mut self,
        input: &mut R,
        registry: &ExtensionRegistry,
    ) -> Result<bool, StreamError> {
        self.merge_delimited_from_with_options(input, registry, ParseOptions::default())
    }

    /// A declared length above `options.max_message_size` fails before
    /// any payload byte is read.
    fn merge_delimited_from_with_options<R: Read + ?Sized>(
        &mut self,
        input: &mut R,
        registry: &ExtensionRegistry,
        options: ParseOptions,
    ) -> Result<bool, StreamError> {
        let Some(len) = read_raw_varint32_from(input)? else {
            return Ok(false);
        };
        let len = len as usize;
        let max = options.max_message_size;
        if len > max {
            return Err(DecodeError::LengthExceedsLimit {
                field: "delimited message",
                len,
                max,
            }
            .into());
        }
        let data = LimitedReader::new(input, len).read_to_limit()?;
        self.merge_from_bytes_with_options(&data, registry, options)?;
        Ok(true)
    }
}

fn check_owned(descriptor: &MessageDescriptor, field: &FieldDescriptor) -> Result<(), FieldError> {
    if descriptor.owns_field(field) {
        Ok(())
    } else {
        Err(FieldError::NotInMessage {
            field: field.full_name(),
            message_type: descriptor.full_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{foreign_message, test_all_types, test_required};

    #[test]
    fn test_size_cache() {
        let cache = SizeCache::new();
        let mut calls = 0;
        assert_eq!(cache.get_or_compute(|| {
            calls += 1;
            7
        }), 7);
        assert_eq!(cache.get_or_compute(|| 99), 7);
        assert_eq!(calls, 1);
        assert_eq!(cache.clone().get_or_compute(|| 99), 7);
    }

    #[test]
    fn test_foreign_field_rejected() {
        let all = test_all_types();
        let foreign = foreign_message();
        let mut builder = DynamicMessage::builder(&all);
        let c = foreign.field_by_name("c").unwrap();
        assert!(matches!(
            builder.set_scalar(c, 1),
            Err(FieldError::NotInMessage { .. })
        ));
        assert!(builder.fields().is_empty());
    }

    #[test]
    fn test_merge_type_mismatch() {
        let mut builder = DynamicMessage::builder(&test_all_types());
        let other = DynamicMessage::default_instance(&foreign_message());
        let err = builder.merge_from(&other).unwrap_err();
        assert_eq!(err.expected, "protomsg_test.TestAllTypes");
        assert_eq!(err.found, "protomsg_test.ForeignMessage");
    }

    #[test]
    fn test_build_requires_initialized() {
        let desc = test_required();
        let mut builder = DynamicMessage::builder(&desc);
        builder.set_scalar(desc.field_by_name("a").unwrap(), 1).unwrap();
        assert!(!builder.is_initialized());

        let err = builder.clone().build().unwrap_err();
        assert_eq!(err.type_name, "protomsg_test.TestRequired");

        let partial = builder.clone().build_partial();
        assert!(!partial.is_initialized());

        builder.set_scalar(desc.field_by_name("b").unwrap(), 2).unwrap();
        builder.set_scalar(desc.field_by_name("c").unwrap(), 3).unwrap();
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_trailing_end_group_rejected() {
        let mut builder = DynamicMessage::builder(&test_all_types());
        // field 1 varint 1, then a stray end-group for field 9
        let result = builder.merge_from_bytes(&[0x08, 0x01, 0x4C]);
        assert!(matches!(result, Err(DecodeError::InvalidEndTag { last_tag: 0x4C })));
    }

    #[test]
    fn test_truncated_input_rejected() {
        let mut builder = DynamicMessage::builder(&test_all_types());
        let result = builder.merge_from_bytes(&[0x08, 0x96]);
        assert!(matches!(result, Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_size_limit_enforced() {
        let options = ParseOptions {
            max_message_size: 2,
            ..ParseOptions::default()
        };
        let mut builder = DynamicMessage::builder(&test_all_types());
        let result = builder.merge_from_bytes_with_options(
            &[0x08, 0x01, 0x10, 0x01],
            ExtensionRegistry::empty(),
            options,
        );
        assert!(matches!(result, Err(DecodeError::LengthExceedsLimit { len: 4, max: 2, .. })));
    }

    #[test]
    fn test_delimited_at_end_of_stream() {
        let mut builder = DynamicMessage::builder(&test_all_types());
        let mut empty: &[u8] = &[];
        assert!(!builder.merge_delimited_from(&mut empty).unwrap());

        let mut short: &[u8] = &[0x05, 0x08, 0x01];
        let result = builder.merge_delimited_from(&mut short);
        assert!(matches!(
            result,
            Err(StreamError::Decode(DecodeError::TruncatedDelimited { declared: 5, read: 2 }))
        ));
    }

    #[test]
    fn test_stream_limits_follow_options() {
        let options = ParseOptions {
            max_message_size: 3,
            ..ParseOptions::default()
        };
        let registry = ExtensionRegistry::empty();
        let mut builder = DynamicMessage::builder(&test_all_types());

        let mut whole: &[u8] = &[0x08, 0x01, 0x10, 0x01];
        let result = builder.merge_from_reader_with_options(&mut whole, registry, options);
        assert!(matches!(
            result,
            Err(StreamError::Decode(DecodeError::LengthExceedsLimit { len: 4, max: 3, .. }))
        ));

        // The declared length is rejected before the payload is consumed.
        let mut framed: &[u8] = &[0x04, 0x08, 0x01, 0x10, 0x01];
        let result = builder.merge_delimited_from_with_options(&mut framed, registry, options);
        assert!(matches!(
            result,
            Err(StreamError::Decode(DecodeError::LengthExceedsLimit { len: 4, max: 3, .. }))
        ));
        assert_eq!(framed.len(), 4);

        let mut small: &[u8] = &[0x02, 0x08, 0x01];
        assert!(builder.merge_delimited_from_with_options(&mut small, registry, options).unwrap());
        assert!(small.is_empty());
    }

    #[test]
    fn test_stream_recursion_limit_follows_options() {
        let options = ParseOptions {
            recursion_limit: 1,
            ..ParseOptions::default()
        };
        let mut builder = DynamicMessage::builder(&test_all_types());
        // unknown group 1000 holding unknown group 1001
        let mut nested: &[u8] = &[0xC3, 0x3E, 0xCB, 0x3E, 0xCC, 0x3E, 0xC4, 0x3E];
        let result =
            builder.merge_from_reader_with_options(&mut nested, ExtensionRegistry::empty(), options);
        assert!(matches!(
            result,
            Err(StreamError::Decode(DecodeError::RecursionLimitExceeded { limit: 1 }))
        ));
    }

    #[test]
    fn test_clear_resets_to_default() {
        let desc = test_all_types();
        let mut builder = DynamicMessage::builder(&desc);
        builder
            .set_scalar(desc.field_by_name("optional_int32").unwrap(), 5)
            .unwrap()
            .add_repeated_scalar(desc.field_by_name("repeated_string").unwrap(), "x")
            .unwrap();
        builder.unknown_fields_mut().add_varint(999, 1);

        builder.clear();
        let cleared = builder.build_partial();
        assert_eq!(cleared, DynamicMessage::default_instance(&desc));
        assert!(!cleared.has_field(desc.field_by_name("optional_int32").unwrap()));
    }
}
