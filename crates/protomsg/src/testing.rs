//! Shared test schemas for unit tests.

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::descriptor::{FieldDescriptor, Label, MessageDescriptor, ScalarType};

lazy_static! {
    static ref FOREIGN_MESSAGE: Arc<MessageDescriptor> = MessageDescriptor::builder("protomsg_test.ForeignMessage")
        .field(FieldDescriptor::scalar(1, "c", Label::Optional, ScalarType::Int32))
        .field(FieldDescriptor::scalar(2, "d", Label::Optional, ScalarType::Int32))
        .build()
        .unwrap();

    static ref OPTIONAL_GROUP: Arc<MessageDescriptor> = MessageDescriptor::builder("protomsg_test.TestAllTypes.OptionalGroup")
        .field(FieldDescriptor::scalar(17, "a", Label::Optional, ScalarType::Int32))
        .build()
        .unwrap();

    static ref TEST_ALL_TYPES: Arc<MessageDescriptor> = {
        use ScalarType::*;
        let scalars = [
            (1, "optional_int32", Int32),
            (2, "optional_int64", Int64),
            (3, "optional_uint32", UInt32),
            (4, "optional_uint64", UInt64),
            (5, "optional_sint32", SInt32),
            (6, "optional_sint64", SInt64),
            (7, "optional_fixed32", Fixed32),
            (8, "optional_fixed64", Fixed64),
            (9, "optional_sfixed32", SFixed32),
            (10, "optional_sfixed64", SFixed64),
            (11, "optional_float", Float),
            (12, "optional_double", Double),
            (13, "optional_bool", Bool),
            (14, "optional_string", String),
            (15, "optional_bytes", Bytes),
            (22, "optional_foreign_enum", Enum),
        ];
        let mut builder = MessageDescriptor::builder("protomsg_test.TestAllTypes");
        for (number, name, scalar_type) in scalars {
            builder = builder.field(FieldDescriptor::scalar(number, name, Label::Optional, scalar_type));
        }
        builder
            .field(FieldDescriptor::group(16, "optionalgroup", Label::Optional, &OPTIONAL_GROUP))
            .field(FieldDescriptor::message(19, "optional_foreign_message", Label::Optional, &FOREIGN_MESSAGE))
            .field(FieldDescriptor::scalar(31, "repeated_int32", Label::Repeated, Int32))
            .field(FieldDescriptor::scalar(44, "repeated_string", Label::Repeated, String))
            .field(FieldDescriptor::message(49, "repeated_foreign_message", Label::Repeated, &FOREIGN_MESSAGE))
            .field(FieldDescriptor::scalar(90, "packed_int32", Label::Repeated, Int32).packed())
            .field(FieldDescriptor::scalar(91, "packed_sint64", Label::Repeated, SInt64).packed())
            .build()
            .unwrap()
    };

    static ref TEST_REQUIRED: Arc<MessageDescriptor> = MessageDescriptor::builder("protomsg_test.TestRequired")
        .field(FieldDescriptor::scalar(1, "a", Label::Required, ScalarType::Int32))
        .field(FieldDescriptor::scalar(2, "dummy2", Label::Optional, ScalarType::Int32))
        .field(FieldDescriptor::scalar(3, "b", Label::Required, ScalarType::Int32))
        .field(FieldDescriptor::scalar(33, "c", Label::Required, ScalarType::Int32))
        .build()
        .unwrap();

    static ref TEST_REQUIRED_FOREIGN: Arc<MessageDescriptor> = MessageDescriptor::builder("protomsg_test.TestRequiredForeign")
        .field(FieldDescriptor::message(1, "optional_message", Label::Optional, &TEST_REQUIRED))
        .field(FieldDescriptor::message(2, "repeated_message", Label::Repeated, &TEST_REQUIRED))
        .field(FieldDescriptor::scalar(3, "dummy", Label::Optional, ScalarType::Int32))
        .build()
        .unwrap();
}

pub fn foreign_message() -> Arc<MessageDescriptor> {
    FOREIGN_MESSAGE.clone()
}

pub fn test_all_types() -> Arc<MessageDescriptor> {
    TEST_ALL_TYPES.clone()
}

pub fn test_required() -> Arc<MessageDescriptor> {
    TEST_REQUIRED.clone()
}

pub fn test_required_foreign() -> Arc<MessageDescriptor> {
    TEST_REQUIRED_FOREIGN.clone()
}
