//! Schema descriptors.
//!
//! A [`MessageDescriptor`] is the identity of a message type: two messages
//! have the same type only if they point at the same descriptor
//! allocation. Extensions remember the id of the descriptor they extend,
//! so a same-named descriptor built separately does not accept them.
//! Descriptors are built bottom-up, so a message type can embed any type
//! built before it.

pub mod registry;

pub use registry::ExtensionRegistry;

use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::{FxHashMap, FxHasher};

use crate::error::DescriptorError;
use crate::limits::MAX_FIELD_NUMBER;
use crate::message::DynamicMessage;
use crate::model::{FieldValue, Value};
use crate::wire::{WireType, is_valid_field_number};

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Non-message field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Double,
    Float,
    Int64,
    UInt64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    UInt32,
    Enum,
    SFixed32,
    SFixed64,
    SInt32,
    SInt64,
}

impl ScalarType {
    /// Every scalar type, in declaration order.
    pub const ALL: [ScalarType; 16] = [
        ScalarType::Double,
        ScalarType::Float,
        ScalarType::Int64,
        ScalarType::UInt64,
        ScalarType::Int32,
        ScalarType::Fixed64,
        ScalarType::Fixed32,
        ScalarType::Bool,
        ScalarType::String,
        ScalarType::Bytes,
        ScalarType::UInt32,
        ScalarType::Enum,
        ScalarType::SFixed32,
        ScalarType::SFixed64,
        ScalarType::SInt32,
        ScalarType::SInt64,
    ];

    /// Wire type of one unpacked element.
    pub fn wire_type(self) -> WireType {
        match self {
            ScalarType::Double | ScalarType::Fixed64 | ScalarType::SFixed64 => WireType::Fixed64,
            ScalarType::Float | ScalarType::Fixed32 | ScalarType::SFixed32 => WireType::Fixed32,
            ScalarType::String | ScalarType::Bytes => WireType::LengthDelimited,
            ScalarType::Int64
            | ScalarType::UInt64
            | ScalarType::Int32
            | ScalarType::Bool
            | ScalarType::UInt32
            | ScalarType::Enum
            | ScalarType::SInt32
            | ScalarType::SInt64 => WireType::Varint,
        }
    }

    /// Returns true if repeated fields of this type may use packed encoding.
    pub fn is_packable(self) -> bool {
        self.wire_type() != WireType::LengthDelimited
    }

    /// Lowercase schema-language name.
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int64 => "int64",
            ScalarType::UInt64 => "uint64",
            ScalarType::Int32 => "int32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::UInt32 => "uint32",
            ScalarType::Enum => "enum",
            ScalarType::SFixed32 => "sfixed32",
            ScalarType::SFixed64 => "sfixed64",
            ScalarType::SInt32 => "sint32",
            ScalarType::SInt64 => "sint64",
        }
    }
}

/// Value kind of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    Scalar(ScalarType),
    /// Embedded message, length-delimited on the wire.
    Message(Arc<MessageDescriptor>),
    /// Embedded message framed by start-group/end-group tags.
    Group(Arc<MessageDescriptor>),
}

impl FieldType {
    /// Wire type of one unpacked element.
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldType::Scalar(t) => t.wire_type(),
            FieldType::Message(_) => WireType::LengthDelimited,
            FieldType::Group(_) => WireType::StartGroup,
        }
    }

    /// Descriptor of the embedded message type, if any.
    pub fn message_type(&self) -> Option<&Arc<MessageDescriptor>> {
        match self {
            FieldType::Scalar(_) => None,
            FieldType::Message(m) | FieldType::Group(m) => Some(m),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Scalar(t) => t.name(),
            FieldType::Message(_) => "message",
            FieldType::Group(_) => "group",
        }
    }
}

/// Field cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

/// Describes one field of a message type, or an extension.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    number: u32,
    name: String,
    label: Label,
    field_type: FieldType,
    packed: bool,
    default_value: Option<Value>,
    containing_type: String,
    extendee_id: Option<u64>,
}

impl FieldDescriptor {
    /// Creates a scalar field.
    pub fn scalar(number: u32, name: impl Into<String>, label: Label, scalar_type: ScalarType) -> Self {
        Self::new(number, name.into(), label, FieldType::Scalar(scalar_type))
    }

    /// Creates a length-delimited embedded message field.
    pub fn message(
        number: u32,
        name: impl Into<String>,
        label: Label,
        message_type: &Arc<MessageDescriptor>,
    ) -> Self {
        Self::new(number, name.into(), label, FieldType::Message(message_type.clone()))
    }

    /// Creates a group field.
    pub fn group(
        number: u32,
        name: impl Into<String>,
        label: Label,
        message_type: &Arc<MessageDescriptor>,
    ) -> Self {
        Self::new(number, name.into(), label, FieldType::Group(message_type.clone()))
    }

    fn new(number: u32, name: String, label: Label, field_type: FieldType) -> Self {
        Self {
            number,
            name,
            label,
            field_type,
            packed: false,
            default_value: None,
            containing_type: String::new(),
            extendee_id: None,
        }
    }

    /// Marks a repeated scalar field as packed.
    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }

    /// Sets an explicit default for an optional scalar field.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Turns this field into an extension of `extendee`.
    ///
    /// The number must lie in one of the extendee's extension ranges and
    /// must not already name a declared field.
    pub fn into_extension(
        mut self,
        extendee: &MessageDescriptor,
    ) -> Result<Arc<FieldDescriptor>, DescriptorError> {
        self.validate()?;
        if extendee.field_by_number(self.number).is_some() {
            return Err(DescriptorError::ExtensionNumberTaken {
                field: self.name,
                message: extendee.full_name.clone(),
                number: self.number,
            });
        }
        if !extendee.is_extension_number(self.number) {
            return Err(DescriptorError::ExtensionOutOfRange {
                field: self.name,
                message: extendee.full_name.clone(),
                number: self.number,
            });
        }
        self.containing_type = extendee.full_name.clone();
        self.extendee_id = Some(extendee.id);
        Ok(Arc::new(self))
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        if !is_valid_field_number(self.number) {
            return Err(DescriptorError::InvalidFieldNumber {
                field: self.name.clone(),
                number: self.number,
            });
        }
        if self.packed {
            if self.label != Label::Repeated {
                return Err(DescriptorError::InvalidPacked {
                    field: self.name.clone(),
                    reason: "it is not repeated",
                });
            }
            if !matches!(self.field_type, FieldType::Scalar(t) if t.is_packable()) {
                return Err(DescriptorError::InvalidPacked {
                    field: self.name.clone(),
                    reason: "its type is not packable",
                });
            }
        }
        if let Some(default) = &self.default_value {
            let valid = self.label != Label::Repeated
                && matches!(self.field_type, FieldType::Scalar(t) if default.is_valid_for(t));
            if !valid {
                return Err(DescriptorError::InvalidDefault {
                    field: self.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified name: containing type plus field name.
    pub fn full_name(&self) -> String {
        if self.containing_type.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.containing_type, self.name)
        }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn is_required(&self) -> bool {
        self.label == Label::Required
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    pub fn is_extension(&self) -> bool {
        self.extendee_id.is_some()
    }

    /// Id of the extended descriptor, for extensions.
    pub fn extendee_id(&self) -> Option<u64> {
        self.extendee_id
    }

    /// True for message and group fields.
    pub fn is_message(&self) -> bool {
        self.field_type.message_type().is_some()
    }

    /// Full name of the message type this field belongs to (or extends).
    pub fn containing_type(&self) -> &str {
        &self.containing_type
    }

    /// The value a reader sees when this field is unset.
    ///
    /// Repeated fields read as empty lists, message fields as the
    /// type's default instance, scalars as the declared default or zero.
    pub fn default_value(&self) -> FieldValue {
        match (&self.field_type, self.label) {
            (FieldType::Scalar(_), Label::Repeated) => FieldValue::RepeatedScalar(Vec::new()),
            (FieldType::Message(_) | FieldType::Group(_), Label::Repeated) => {
                FieldValue::RepeatedMessage(Vec::new())
            }
            (FieldType::Message(m) | FieldType::Group(m), _) => {
                FieldValue::Message(DynamicMessage::default_instance(m))
            }
            (FieldType::Scalar(t), _) => FieldValue::Scalar(
                self.default_value
                    .clone()
                    .unwrap_or_else(|| Value::default_for(*t)),
            ),
        }
    }
}

/// Describes a message type.
///
/// Field types refer to already-built descriptors, so a type cannot
/// contain a field of its own type, directly or through other types.
#[derive(Debug)]
pub struct MessageDescriptor {
    id: u64,
    full_name: String,
    fields: Vec<Arc<FieldDescriptor>>,
    by_number: FxHashMap<u32, usize>,
    by_name: FxHashMap<String, usize>,
    extension_ranges: Vec<Range<u32>>,
    message_set_wire_format: bool,
}

impl MessageDescriptor {
    /// Starts describing a message type with the given fully qualified name.
    pub fn builder(full_name: impl Into<String>) -> MessageDescriptorBuilder {
        MessageDescriptorBuilder {
            full_name: full_name.into(),
            fields: Vec::new(),
            extension_ranges: Vec::new(),
            message_set_wire_format: false,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Process-unique id, assigned when the descriptor is built.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Last component of the full name.
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.full_name)
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[Arc<FieldDescriptor>] {
        &self.fields
    }

    pub fn field_by_number(&self, number: u32) -> Option<&Arc<FieldDescriptor>> {
        self.by_number.get(&number).map(|&i| &self.fields[i])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn extension_ranges(&self) -> &[Range<u32>] {
        &self.extension_ranges
    }

    /// Returns true if `number` falls in a declared extension range.
    pub fn is_extension_number(&self, number: u32) -> bool {
        self.extension_ranges.iter().any(|r| r.contains(&number))
    }

    /// Unknown fields of this type use message-set framing.
    pub fn message_set_wire_format(&self) -> bool {
        self.message_set_wire_format
    }

    /// Returns true if `field` is a declared field of this type or an
    /// extension of it.
    pub fn owns_field(&self, field: &FieldDescriptor) -> bool {
        if field.is_extension() {
            return field.extendee_id() == Some(self.id) && self.is_extension_number(field.number());
        }
        self.field_by_number(field.number())
            .is_some_and(|declared| std::ptr::eq(Arc::as_ptr(declared), field))
    }

    /// Stable hash of the type's identity.
    ///
    /// Derived from the full name so the value is the same in every run.
    pub fn type_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.full_name.hash(&mut hasher);
        hasher.finish()
    }

    /// Returns true if both handles describe the same type.
    pub fn same_type(a: &Arc<MessageDescriptor>, b: &Arc<MessageDescriptor>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

/// Builder for [`MessageDescriptor`].
#[derive(Debug, Clone)]
pub struct MessageDescriptorBuilder {
    full_name: String,
    fields: Vec<FieldDescriptor>,
    extension_ranges: Vec<Range<u32>>,
    message_set_wire_format: bool,
}

impl MessageDescriptorBuilder {
    /// Adds a declared field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares a half-open range of extension numbers.
    pub fn extension_range(mut self, range: Range<u32>) -> Self {
        self.extension_ranges.push(range);
        self
    }

    /// Declares the full legal extension range (1 through the maximum field number).
    pub fn all_extensions(self) -> Self {
        self.extension_range(1..MAX_FIELD_NUMBER + 1)
    }

    /// Requests message-set framing for unknown fields.
    pub fn message_set_wire_format(mut self, enabled: bool) -> Self {
        self.message_set_wire_format = enabled;
        self
    }

    /// Validates the fields and freezes the descriptor.
    pub fn build(self) -> Result<Arc<MessageDescriptor>, DescriptorError> {
        let mut by_number = FxHashMap::default();
        let mut by_name = FxHashMap::default();
        let mut fields = Vec::with_capacity(self.fields.len());

        for (index, mut field) in self.fields.into_iter().enumerate() {
            field.validate()?;
            if by_number.insert(field.number, index).is_some() {
                return Err(DescriptorError::DuplicateFieldNumber {
                    message: self.full_name.clone(),
                    number: field.number,
                });
            }
            if by_name.insert(field.name.clone(), index).is_some() {
                return Err(DescriptorError::DuplicateFieldName {
                    message: self.full_name.clone(),
                    name: field.name.clone(),
                });
            }
            field.containing_type = self.full_name.clone();
            fields.push(Arc::new(field));
        }

        for range in &self.extension_ranges {
            if let Some(field) = fields.iter().find(|f| range.contains(&f.number)) {
                return Err(DescriptorError::ExtensionRangeOverlapsField {
                    message: self.full_name.clone(),
                    number: field.number,
                    start: range.start,
                    end: range.end,
                });
            }
        }

        Ok(Arc::new(MessageDescriptor {
            id: NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed),
            full_name: self.full_name,
            fields,
            by_number,
            by_name,
            extension_ranges: self.extension_ranges,
            message_set_wire_format: self.message_set_wire_format,
        }))
    }
}
