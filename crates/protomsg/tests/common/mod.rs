//! Test schemas shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use lazy_static::lazy_static;
use protomsg::limits::MAX_FIELD_NUMBER;
use protomsg::{
    DynamicMessage, ExtensionRegistry, FieldDescriptor, Label, MessageBuilder, MessageDescriptor,
    ScalarType,
};

pub struct Schemas {
    pub foreign: Arc<MessageDescriptor>,
    pub optional_group: Arc<MessageDescriptor>,
    pub all_types: Arc<MessageDescriptor>,
    pub required: Arc<MessageDescriptor>,
    pub required_foreign: Arc<MessageDescriptor>,
    pub all_extensions: Arc<MessageDescriptor>,
    pub int32_extension: Arc<FieldDescriptor>,
    pub repeated_string_extension: Arc<FieldDescriptor>,
    pub foreign_extension: Arc<FieldDescriptor>,
    pub message_set: Arc<MessageDescriptor>,
    pub message_set_payload: Arc<MessageDescriptor>,
    pub message_set_extension: Arc<FieldDescriptor>,
    pub registry: ExtensionRegistry,
}

lazy_static! {
    static ref SCHEMAS: Schemas = build_schemas();
}

pub fn schemas() -> &'static Schemas {
    &SCHEMAS
}

/// Looks up a declared field by name.
pub fn field<'d>(descriptor: &'d MessageDescriptor, name: &str) -> &'d Arc<FieldDescriptor> {
    descriptor
        .field_by_name(name)
        .unwrap_or_else(|| panic!("{} has no field {}", descriptor.full_name(), name))
}

fn build_schemas() -> Schemas {
    let foreign = MessageDescriptor::builder("protomsg_test.ForeignMessage")
        .field(FieldDescriptor::scalar(1, "c", Label::Optional, ScalarType::Int32))
        .field(FieldDescriptor::scalar(2, "d", Label::Optional, ScalarType::Int32))
        .build()
        .unwrap();

    let optional_group = MessageDescriptor::builder("protomsg_test.TestAllTypes.OptionalGroup")
        .field(FieldDescriptor::scalar(17, "a", Label::Optional, ScalarType::Int32))
        .build()
        .unwrap();

    let all_types = MessageDescriptor::builder("protomsg_test.TestAllTypes")
        .field(FieldDescriptor::scalar(1, "optional_int32", Label::Optional, ScalarType::Int32))
        .field(FieldDescriptor::scalar(2, "optional_int64", Label::Optional, ScalarType::Int64))
        .field(FieldDescriptor::scalar(3, "optional_uint32", Label::Optional, ScalarType::UInt32))
        .field(FieldDescriptor::scalar(4, "optional_uint64", Label::Optional, ScalarType::UInt64))
        .field(FieldDescriptor::scalar(5, "optional_sint32", Label::Optional, ScalarType::SInt32))
        .field(FieldDescriptor::scalar(6, "optional_sint64", Label::Optional, ScalarType::SInt64))
        .field(FieldDescriptor::scalar(7, "optional_fixed32", Label::Optional, ScalarType::Fixed32))
        .field(FieldDescriptor::scalar(8, "optional_fixed64", Label::Optional, ScalarType::Fixed64))
        .field(FieldDescriptor::scalar(9, "optional_sfixed32", Label::Optional, ScalarType::SFixed32))
        .field(FieldDescriptor::scalar(10, "optional_sfixed64", Label::Optional, ScalarType::SFixed64))
        .field(FieldDescriptor::scalar(11, "optional_float", Label::Optional, ScalarType::Float))
        .field(FieldDescriptor::scalar(12, "optional_double", Label::Optional, ScalarType::Double))
        .field(FieldDescriptor::scalar(13, "optional_bool", Label::Optional, ScalarType::Bool))
        .field(FieldDescriptor::scalar(14, "optional_string", Label::Optional, ScalarType::String))
        .field(FieldDescriptor::scalar(15, "optional_bytes", Label::Optional, ScalarType::Bytes))
        .field(FieldDescriptor::group(16, "optionalgroup", Label::Optional, &optional_group))
        .field(FieldDescriptor::message(19, "optional_foreign_message", Label::Optional, &foreign))
        .field(FieldDescriptor::scalar(22, "optional_foreign_enum", Label::Optional, ScalarType::Enum))
        .field(FieldDescriptor::scalar(31, "repeated_int32", Label::Repeated, ScalarType::Int32))
        .field(FieldDescriptor::scalar(44, "repeated_string", Label::Repeated, ScalarType::String))
        .field(FieldDescriptor::message(49, "repeated_foreign_message", Label::Repeated, &foreign))
        .field(FieldDescriptor::scalar(61, "default_int32", Label::Optional, ScalarType::Int32).with_default(41))
        .field(FieldDescriptor::scalar(90, "packed_int32", Label::Repeated, ScalarType::Int32).packed())
        .field(FieldDescriptor::scalar(91, "packed_sint64", Label::Repeated, ScalarType::SInt64).packed())
        .field(FieldDescriptor::scalar(92, "packed_double", Label::Repeated, ScalarType::Double).packed())
        .build()
        .unwrap();

    let required = MessageDescriptor::builder("protomsg_test.TestRequired")
        .field(FieldDescriptor::scalar(1, "a", Label::Required, ScalarType::Int32))
        .field(FieldDescriptor::scalar(2, "dummy2", Label::Optional, ScalarType::Int32))
        .field(FieldDescriptor::scalar(3, "b", Label::Required, ScalarType::Int32))
        .field(FieldDescriptor::scalar(33, "c", Label::Required, ScalarType::Int32))
        .build()
        .unwrap();

    let required_foreign = MessageDescriptor::builder("protomsg_test.TestRequiredForeign")
        .field(FieldDescriptor::message(1, "optional_message", Label::Optional, &required))
        .field(FieldDescriptor::message(2, "repeated_message", Label::Repeated, &required))
        .field(FieldDescriptor::scalar(3, "dummy", Label::Optional, ScalarType::Int32))
        .build()
        .unwrap();

    let all_extensions = MessageDescriptor::builder("protomsg_test.TestAllExtensions")
        .all_extensions()
        .build()
        .unwrap();
    let int32_extension = FieldDescriptor::scalar(1, "optional_int32_extension", Label::Optional, ScalarType::Int32)
        .into_extension(&all_extensions)
        .unwrap();
    let repeated_string_extension =
        FieldDescriptor::scalar(44, "repeated_string_extension", Label::Repeated, ScalarType::String)
            .into_extension(&all_extensions)
            .unwrap();
    let foreign_extension =
        FieldDescriptor::message(19, "optional_foreign_message_extension", Label::Optional, &foreign)
            .into_extension(&all_extensions)
            .unwrap();

    let message_set = MessageDescriptor::builder("protomsg_test.TestMessageSet")
        .extension_range(4..MAX_FIELD_NUMBER + 1)
        .message_set_wire_format(true)
        .build()
        .unwrap();
    let message_set_payload = MessageDescriptor::builder("protomsg_test.TestMessageSetExtension1")
        .field(FieldDescriptor::scalar(15, "i", Label::Optional, ScalarType::Int32))
        .build()
        .unwrap();
    let message_set_extension =
        FieldDescriptor::message(1545, "message_set_extension", Label::Optional, &message_set_payload)
            .into_extension(&message_set)
            .unwrap();

    let mut registry = ExtensionRegistry::new();
    registry.add(int32_extension.clone());
    registry.add(repeated_string_extension.clone());
    registry.add(foreign_extension.clone());
    registry.add(message_set_extension.clone());

    Schemas {
        foreign,
        optional_group,
        all_types,
        required,
        required_foreign,
        all_extensions,
        int32_extension,
        repeated_string_extension,
        foreign_extension,
        message_set,
        message_set_payload,
        message_set_extension,
        registry,
    }
}

/// A TestAllTypes message with every field set.
pub fn all_fields_set() -> DynamicMessage {
    let s = schemas();
    let d = &s.all_types;

    let mut group = DynamicMessage::builder(&s.optional_group);
    group.set_scalar(field(&s.optional_group, "a"), 117).unwrap();

    let mut foreign = DynamicMessage::builder(&s.foreign);
    foreign.set_scalar(field(&s.foreign, "c"), 119).unwrap();

    let mut builder = DynamicMessage::builder(d);
    builder
        .set_scalar(field(d, "optional_int32"), 101)
        .unwrap()
        .set_scalar(field(d, "optional_int64"), 102i64)
        .unwrap()
        .set_scalar(field(d, "optional_uint32"), 103u32)
        .unwrap()
        .set_scalar(field(d, "optional_uint64"), 104u64)
        .unwrap()
        .set_scalar(field(d, "optional_sint32"), -105)
        .unwrap()
        .set_scalar(field(d, "optional_sint64"), -106i64)
        .unwrap()
        .set_scalar(field(d, "optional_fixed32"), 107u32)
        .unwrap()
        .set_scalar(field(d, "optional_fixed64"), 108u64)
        .unwrap()
        .set_scalar(field(d, "optional_sfixed32"), -109)
        .unwrap()
        .set_scalar(field(d, "optional_sfixed64"), -110i64)
        .unwrap()
        .set_scalar(field(d, "optional_float"), 111.5f32)
        .unwrap()
        .set_scalar(field(d, "optional_double"), 112.5f64)
        .unwrap()
        .set_scalar(field(d, "optional_bool"), true)
        .unwrap()
        .set_scalar(field(d, "optional_string"), "115")
        .unwrap()
        .set_scalar(field(d, "optional_bytes"), b"116".to_vec())
        .unwrap()
        .set_message_builder(field(d, "optionalgroup"), group)
        .unwrap()
        .set_message_builder(field(d, "optional_foreign_message"), foreign.clone())
        .unwrap()
        .set_scalar(field(d, "optional_foreign_enum"), protomsg::Value::EnumNumber(5))
        .unwrap()
        .add_repeated_scalar(field(d, "repeated_int32"), 201)
        .unwrap()
        .add_repeated_scalar(field(d, "repeated_int32"), -301)
        .unwrap()
        .add_repeated_scalar(field(d, "repeated_string"), "215")
        .unwrap()
        .add_repeated_scalar(field(d, "repeated_string"), "315")
        .unwrap()
        .add_repeated_message(field(d, "repeated_foreign_message"), foreign.build_partial())
        .unwrap()
        .set_scalar(field(d, "default_int32"), 401)
        .unwrap()
        .add_repeated_scalar(field(d, "packed_int32"), 601)
        .unwrap()
        .add_repeated_scalar(field(d, "packed_int32"), -701)
        .unwrap()
        .add_repeated_scalar(field(d, "packed_sint64"), -602i64)
        .unwrap()
        .add_repeated_scalar(field(d, "packed_double"), 603.25f64)
        .unwrap();
    builder.build().unwrap()
}
