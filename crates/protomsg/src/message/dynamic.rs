//! Schema-driven message and builder.
//!
//! [`DynamicMessage`] works for any [`MessageDescriptor`]: its content is
//! a [`FieldSet`] plus an [`UnknownFieldSet`], so merge, size, serialize
//! and parse all go through the same generic code.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::sync::Arc;

use crate::descriptor::{ExtensionRegistry, MessageDescriptor};
use crate::error::{DecodeError, StreamError};
use crate::limits::ParseOptions;
use crate::message::{Message, MessageBuilder, SizeCache};
use crate::model::{FieldSet, UnknownFieldSet};
use crate::text;

/// An immutable message of a runtime-described type.
#[derive(Debug, Clone)]
pub struct DynamicMessage {
    descriptor: Arc<MessageDescriptor>,
    fields: FieldSet,
    unknown_fields: UnknownFieldSet,
    size_cache: SizeCache,
}

impl DynamicMessage {
    /// The message of the given type with nothing set.
    pub fn default_instance(descriptor: &Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor: descriptor.clone(),
            fields: FieldSet::new(),
            unknown_fields: UnknownFieldSet::new(),
            size_cache: SizeCache::new(),
        }
    }

    /// An empty builder for the given type.
    pub fn builder(descriptor: &Arc<MessageDescriptor>) -> DynamicMessageBuilder {
        DynamicMessageBuilder::new(descriptor)
    }

    /// Parses a complete message.
    ///
    /// Fails with [`DecodeError::MissingRequiredFields`] if the input
    /// is well-formed but leaves a required field unset.
    pub fn parse_from_bytes(descriptor: &Arc<MessageDescriptor>, data: &[u8]) -> Result<Self, DecodeError> {
        Self::parse_from_bytes_with_registry(descriptor, data, ExtensionRegistry::empty())
    }

    pub fn parse_from_bytes_with_registry(
        descriptor: &Arc<MessageDescriptor>,
        data: &[u8],
        registry: &ExtensionRegistry,
    ) -> Result<Self, DecodeError> {
        Self::parse_from_bytes_with_options(descriptor, data, registry, ParseOptions::default())
    }

    pub fn parse_from_bytes_with_options(
        descriptor: &Arc<MessageDescriptor>,
        data: &[u8],
        registry: &ExtensionRegistry,
        options: ParseOptions,
    ) -> Result<Self, DecodeError> {
        let mut builder = DynamicMessageBuilder::new(descriptor);
        builder.merge_from_bytes_with_options(data, registry, options)?;
        builder.build().map_err(|e| e.into_decode_error())
    }

    /// Reads a stream to its end and parses it as one message.
    pub fn parse_from_reader<R: Read + ?Sized>(
        descriptor: &Arc<MessageDescriptor>,
        input: &mut R,
    ) -> Result<Self, StreamError> {
        Self::parse_from_reader_with_registry(descriptor, input, ExtensionRegistry::empty())
    }

    pub fn parse_from_reader_with_registry<R: Read + ?Sized>(
        descriptor: &Arc<MessageDescriptor>,
        input: &mut R,
        registry: &ExtensionRegistry,
    ) -> Result<Self, StreamError> {
        Self::parse_from_reader_with_options(descriptor, input, registry, ParseOptions::default())
    }

    pub fn parse_from_reader_with_options<R: Read + ?Sized>(
        descriptor: &Arc<MessageDescriptor>,
        input: &mut R,
        registry: &ExtensionRegistry,
        options: ParseOptions,
    ) -> Result<Self, StreamError> {
        let mut builder = DynamicMessageBuilder::new(descriptor);
        builder.merge_from_reader_with_options(input, registry, options)?;
        Ok(builder.build().map_err(|e| e.into_decode_error())?)
    }

    /// Reads one length-prefixed message.
    ///
    /// Returns `Ok(None)` if the stream ends before the length prefix, so
    /// a sequence of delimited messages can be drained in a loop.
    pub fn parse_delimited_from<R: Read + ?Sized>(
        descriptor: &Arc<MessageDescriptor>,
        input: &mut R,
    ) -> Result<Option<Self>, StreamError> {
        Self::parse_delimited_from_with_registry(descriptor, input, ExtensionRegistry::empty())
    }

    pub fn parse_delimited_from_with_registry<R: Read + ?Sized>(
        descriptor: &Arc<MessageDescriptor>,
        input: &mut R,
        registry: &ExtensionRegistry,
    ) -> Result<Option<Self>, StreamError> {
        Self::parse_delimited_from_with_options(descriptor, input, registry, ParseOptions::default())
    }

    pub fn parse_delimited_from_with_options<R: Read + ?Sized>(
        descriptor: &Arc<MessageDescriptor>,
        input: &mut R,
        registry: &ExtensionRegistry,
        options: ParseOptions,
    ) -> Result<Option<Self>, StreamError> {
        let mut builder = DynamicMessageBuilder::new(descriptor);
        if !builder.merge_delimited_from_with_options(input, registry, options)? {
            return Ok(None);
        }
        Ok(Some(builder.build().map_err(|e| e.into_decode_error())?))
    }

    /// Turns this message back into a builder without copying its content.
    pub fn into_builder(self) -> DynamicMessageBuilder {
        DynamicMessageBuilder {
            descriptor: self.descriptor,
            fields: self.fields,
            unknown_fields: self.unknown_fields,
        }
    }
}

impl Message for DynamicMessage {
    type Builder = DynamicMessageBuilder;

    fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    fn fields(&self) -> &FieldSet {
        &self.fields
    }

    fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.unknown_fields
    }

    fn size_cache(&self) -> &SizeCache {
        &self.size_cache
    }

    fn new_builder_for_type(&self) -> DynamicMessageBuilder {
        DynamicMessageBuilder::new(&self.descriptor)
    }

    fn to_builder(&self) -> DynamicMessageBuilder {
        self.clone().into_builder()
    }

    fn default_instance_for_type(&self) -> Self {
        DynamicMessage::default_instance(&self.descriptor)
    }
}

impl PartialEq for DynamicMessage {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Eq for DynamicMessage {}

impl Hash for DynamicMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl fmt::Display for DynamicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        text::print(self, f)
    }
}

/// Mutable accumulator producing a [`DynamicMessage`].
#[derive(Debug, Clone)]
pub struct DynamicMessageBuilder {
    descriptor: Arc<MessageDescriptor>,
    fields: FieldSet,
    unknown_fields: UnknownFieldSet,
}

impl DynamicMessageBuilder {
    /// An empty builder for the given type.
    pub fn new(descriptor: &Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor: descriptor.clone(),
            fields: FieldSet::new(),
            unknown_fields: UnknownFieldSet::new(),
        }
    }
}

impl MessageBuilder for DynamicMessageBuilder {
    type Message = DynamicMessage;

    fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    fn fields(&self) -> &FieldSet {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut FieldSet {
        &mut self.fields
    }

    fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.unknown_fields
    }

    fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet {
        &mut self.unknown_fields
    }

    fn parts_mut(&mut self) -> (&Arc<MessageDescriptor>, &mut FieldSet, &mut UnknownFieldSet) {
        (&self.descriptor, &mut self.fields, &mut self.unknown_fields)
    }

    fn build_partial(self) -> DynamicMessage {
        DynamicMessage {
            descriptor: self.descriptor,
            fields: self.fields,
            unknown_fields: self.unknown_fields,
            size_cache: SizeCache::new(),
        }
    }
}
