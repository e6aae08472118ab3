//! The parse fold: tag/value pairs from a [`Reader`] into a field set.

use std::sync::Arc;

use crate::codec::value::{read_packed, read_scalar};
use crate::descriptor::{ExtensionRegistry, FieldDescriptor, FieldType, MessageDescriptor};
use crate::error::DecodeError;
use crate::message::{DynamicMessageBuilder, Message, MessageBuilder};
use crate::model::unknown::{MESSAGE_SET_ITEM, MESSAGE_SET_MESSAGE, MESSAGE_SET_TYPE_ID};
use crate::model::{FieldSet, FieldValue, UnknownFieldSet};
use crate::wire::{END_TAG, Reader, WireType, make_tag, tag_field_number, tag_wire_type};

/// Destination of a parse: one message's descriptor and mutable state.
pub struct ParseTarget<'t> {
    pub descriptor: &'t Arc<MessageDescriptor>,
    pub fields: &'t mut FieldSet,
    pub unknown_fields: &'t mut UnknownFieldSet,
}

/// Reads fields until end of input or an end-group tag.
///
/// The caller decides whether the tag that stopped the loop is
/// acceptable: 0 for a top-level or length-delimited message, the
/// matching end-group tag for a group.
pub fn merge_fields_from(
    reader: &mut Reader<'_>,
    target: &mut ParseTarget<'_>,
    registry: &ExtensionRegistry,
) -> Result<(), DecodeError> {
    loop {
        let tag = reader.read_tag()?;
        if tag == END_TAG || !merge_field_from(reader, tag, target, registry)? {
            return Ok(());
        }
    }
}

/// Reads the value announced by `tag` into the target.
///
/// Returns `Ok(false)` on an end-group tag.
fn merge_field_from(
    reader: &mut Reader<'_>,
    tag: u32,
    target: &mut ParseTarget<'_>,
    registry: &ExtensionRegistry,
) -> Result<bool, DecodeError> {
    let wire_type = tag_wire_type(tag)?;
    if wire_type == WireType::EndGroup {
        return Ok(false);
    }
    let number = tag_field_number(tag);

    if target.descriptor.message_set_wire_format()
        && tag == make_tag(MESSAGE_SET_ITEM, WireType::StartGroup)
    {
        merge_message_set_item(reader, target, registry)?;
        return Ok(true);
    }

    let Some(field) = resolve_field(target.descriptor, number, registry) else {
        return target.unknown_fields.merge_field_from(tag, reader);
    };

    match field.field_type() {
        FieldType::Scalar(scalar_type) => {
            let scalar_type = *scalar_type;
            if field.is_repeated()
                && scalar_type.is_packable()
                && wire_type == WireType::LengthDelimited
            {
                let values = read_packed(reader, scalar_type, &field)?;
                target.fields.extend_repeated_scalars(&field, values);
            } else if wire_type == scalar_type.wire_type() {
                let value = read_scalar(reader, scalar_type, &field)?;
                target.fields.store_scalar(&field, value);
            } else {
                return target.unknown_fields.merge_field_from(tag, reader);
            }
        }
        FieldType::Message(message_type) => {
            if wire_type != WireType::LengthDelimited {
                return target.unknown_fields.merge_field_from(tag, reader);
            }
            let data = reader.read_length_delimited("message")?;
            let mut nested = reader.nested(data)?;
            let mut builder = sub_builder(target.fields, &field, message_type);
            parse_into(&mut nested, &mut builder, registry)?;
            nested.check_last_tag_was(END_TAG)?;
            target.fields.store_message(&field, builder.build_partial());
        }
        FieldType::Group(message_type) => {
            if wire_type != WireType::StartGroup {
                return target.unknown_fields.merge_field_from(tag, reader);
            }
            reader.enter()?;
            let mut builder = sub_builder(target.fields, &field, message_type);
            parse_into(reader, &mut builder, registry)?;
            if reader.last_tag() != make_tag(number, WireType::EndGroup) {
                return Err(DecodeError::UnterminatedGroup { number });
            }
            reader.exit();
            target.fields.store_message(&field, builder.build_partial());
        }
    }
    Ok(true)
}

fn resolve_field(
    descriptor: &MessageDescriptor,
    number: u32,
    registry: &ExtensionRegistry,
) -> Option<Arc<FieldDescriptor>> {
    if let Some(field) = descriptor.field_by_number(number) {
        return Some(field.clone());
    }
    if descriptor.is_extension_number(number) {
        return registry
            .find_by_number(descriptor, number)
            .cloned();
    }
    None
}

/// Builder for a nested value: seeded with the current value of a
/// singular field so repeated occurrences merge, fresh otherwise.
fn sub_builder(
    fields: &FieldSet,
    field: &FieldDescriptor,
    message_type: &Arc<MessageDescriptor>,
) -> DynamicMessageBuilder {
    if !field.is_repeated() {
        if let Some(FieldValue::Message(existing)) = fields.get(field) {
            return existing.to_builder();
        }
    }
    DynamicMessageBuilder::new(message_type)
}

fn parse_into(
    reader: &mut Reader<'_>,
    builder: &mut DynamicMessageBuilder,
    registry: &ExtensionRegistry,
) -> Result<(), DecodeError> {
    let (descriptor, fields, unknown_fields) = builder.parts_mut();
    let mut target = ParseTarget {
        descriptor,
        fields,
        unknown_fields,
    };
    merge_fields_from(reader, &mut target, registry)
}

/// Reads one message-set item group.
///
/// `type_id` and `message` may arrive in either order, so the payload is
/// held as raw bytes until the group closes. Registered message
/// extensions are decoded; anything else is kept as an unknown
/// length-delimited field under `type_id`.
fn merge_message_set_item(
    reader: &mut Reader<'_>,
    target: &mut ParseTarget<'_>,
    registry: &ExtensionRegistry,
) -> Result<(), DecodeError> {
    reader.enter()?;
    let mut type_id: u32 = 0;
    let mut payload: Option<&[u8]> = None;
    let mut ignored = UnknownFieldSet::new();

    loop {
        let tag = reader.read_tag()?;
        if tag == END_TAG {
            break;
        }
        if tag == make_tag(MESSAGE_SET_TYPE_ID, WireType::Varint) {
            type_id = reader.read_raw_varint32("message set type_id")?;
        } else if tag == make_tag(MESSAGE_SET_MESSAGE, WireType::LengthDelimited) {
            payload = Some(reader.read_length_delimited("message set message")?);
        } else if !ignored.merge_field_from(tag, reader)? {
            break;
        }
    }
    if reader.last_tag() != make_tag(MESSAGE_SET_ITEM, WireType::EndGroup) {
        return Err(DecodeError::UnterminatedGroup {
            number: MESSAGE_SET_ITEM,
        });
    }
    reader.exit();

    let Some(payload) = payload else {
        return Ok(());
    };
    if type_id == 0 {
        return Ok(());
    }

    let extension = registry
        .find_by_number(target.descriptor, type_id)
        .filter(|ext| matches!(ext.field_type(), FieldType::Message(_)))
        .cloned();
    match extension {
        Some(field) => {
            let Some(message_type) = field.field_type().message_type() else {
                return Ok(());
            };
            let mut nested = reader.nested(payload)?;
            let mut builder = sub_builder(target.fields, &field, message_type);
            parse_into(&mut nested, &mut builder, registry)?;
            nested.check_last_tag_was(END_TAG)?;
            target.fields.store_message(&field, builder.build_partial());
        }
        None => {
            target
                .unknown_fields
                .add_length_delimited(type_id, payload.to_vec());
        }
    }
    Ok(())
}
