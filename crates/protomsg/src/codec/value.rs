//! Encoding, sizing and decoding of individual field values.
//!
//! The size and write functions here are the only place the per-type
//! encodings live, so [`compute_field_size`] and [`write_field`] cannot
//! disagree about framing or packing.

use crate::descriptor::{FieldDescriptor, FieldType, ScalarType};
use crate::error::DecodeError;
use crate::message::{DynamicMessage, Message};
use crate::model::{FieldValue, Value};
use crate::wire::{
    Reader, WireType, Writer, compute_length_delimited_size, compute_raw_varint32_size,
    compute_raw_varint64_size, compute_tag_size, zigzag_decode32, zigzag_decode64,
    zigzag_encode32, zigzag_encode64,
};

// =============================================================================
// SIZES
// =============================================================================

/// Encoded size of a scalar without its tag.
pub fn compute_scalar_size_no_tag(scalar_type: ScalarType, value: &Value) -> usize {
    match value {
        Value::Bool(_) => 1,
        Value::I32(v) | Value::EnumNumber(v) => match scalar_type {
            ScalarType::SInt32 => compute_raw_varint32_size(zigzag_encode32(*v)),
            ScalarType::SFixed32 => 4,
            // Negative values are sign-extended to 10 bytes
            _ => compute_raw_varint64_size(*v as i64 as u64),
        },
        Value::I64(v) => match scalar_type {
            ScalarType::SInt64 => compute_raw_varint64_size(zigzag_encode64(*v)),
            ScalarType::SFixed64 => 8,
            _ => compute_raw_varint64_size(*v as u64),
        },
        Value::U32(v) => match scalar_type {
            ScalarType::Fixed32 => 4,
            _ => compute_raw_varint32_size(*v),
        },
        Value::U64(v) => match scalar_type {
            ScalarType::Fixed64 => 8,
            _ => compute_raw_varint64_size(*v),
        },
        Value::F32(_) => 4,
        Value::F64(_) => 8,
        Value::String(s) => compute_length_delimited_size(s.len()),
        Value::Bytes(b) => compute_length_delimited_size(b.len()),
    }
}

/// Encoded size of an embedded message or group including its tag(s).
pub fn compute_message_size(number: u32, field_type: &FieldType, message: &DynamicMessage) -> usize {
    let size = message.serialized_size();
    match field_type {
        FieldType::Group(_) => 2 * compute_tag_size(number) + size,
        _ => compute_tag_size(number) + compute_length_delimited_size(size),
    }
}

/// Encoded size of one set field: tag(s), payload and packing.
pub fn compute_field_size(field: &FieldDescriptor, value: &FieldValue) -> usize {
    let number = field.number();
    let field_type = field.field_type();
    match (value, field_type) {
        (FieldValue::Scalar(v), FieldType::Scalar(t)) => {
            compute_tag_size(number) + compute_scalar_size_no_tag(*t, v)
        }
        (FieldValue::RepeatedScalar(values), FieldType::Scalar(t)) => {
            if field.is_packed() {
                let data_size = packed_data_size(*t, values);
                compute_tag_size(number) + compute_raw_varint64_size(data_size as u64) + data_size
            } else {
                values
                    .iter()
                    .map(|v| compute_tag_size(number) + compute_scalar_size_no_tag(*t, v))
                    .sum()
            }
        }
        (FieldValue::Message(m), _) => compute_message_size(number, field_type, m),
        (FieldValue::RepeatedMessage(ms), _) => ms
            .iter()
            .map(|m| compute_message_size(number, field_type, m))
            .sum(),
        // FieldSet never stores a scalar under a message field
        (FieldValue::Scalar(_) | FieldValue::RepeatedScalar(_), _) => 0,
    }
}

fn packed_data_size(scalar_type: ScalarType, values: &[Value]) -> usize {
    values
        .iter()
        .map(|v| compute_scalar_size_no_tag(scalar_type, v))
        .sum()
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writes a scalar without its tag.
pub fn write_scalar_no_tag(writer: &mut Writer, scalar_type: ScalarType, value: &Value) {
    match value {
        Value::Bool(v) => writer.write_byte(*v as u8),
        Value::I32(v) | Value::EnumNumber(v) => match scalar_type {
            ScalarType::SInt32 => writer.write_raw_varint32(zigzag_encode32(*v)),
            ScalarType::SFixed32 => writer.write_fixed32(*v as u32),
            _ => writer.write_raw_varint64(*v as i64 as u64),
        },
        Value::I64(v) => match scalar_type {
            ScalarType::SInt64 => writer.write_raw_varint64(zigzag_encode64(*v)),
            ScalarType::SFixed64 => writer.write_fixed64(*v as u64),
            _ => writer.write_raw_varint64(*v as u64),
        },
        Value::U32(v) => match scalar_type {
            ScalarType::Fixed32 => writer.write_fixed32(*v),
            _ => writer.write_raw_varint32(*v),
        },
        Value::U64(v) => match scalar_type {
            ScalarType::Fixed64 => writer.write_fixed64(*v),
            _ => writer.write_raw_varint64(*v),
        },
        Value::F32(v) => writer.write_fixed32(v.to_bits()),
        Value::F64(v) => writer.write_fixed64(v.to_bits()),
        Value::String(s) => writer.write_length_delimited(s.as_bytes()),
        Value::Bytes(b) => writer.write_length_delimited(b),
    }
}

/// Writes an embedded message or group including its tag(s).
pub fn write_message(writer: &mut Writer, number: u32, field_type: &FieldType, message: &DynamicMessage) {
    match field_type {
        FieldType::Group(_) => {
            writer.write_tag(number, WireType::StartGroup);
            message.write_to_writer(writer);
            writer.write_tag(number, WireType::EndGroup);
        }
        _ => {
            writer.write_tag(number, WireType::LengthDelimited);
            writer.write_raw_varint64(message.serialized_size() as u64);
            message.write_to_writer(writer);
        }
    }
}

/// Writes one set field with the same framing [`compute_field_size`] measures.
pub fn write_field(writer: &mut Writer, field: &FieldDescriptor, value: &FieldValue) {
    let number = field.number();
    let field_type = field.field_type();
    match (value, field_type) {
        (FieldValue::Scalar(v), FieldType::Scalar(t)) => {
            writer.write_tag(number, t.wire_type());
            write_scalar_no_tag(writer, *t, v);
        }
        (FieldValue::RepeatedScalar(values), FieldType::Scalar(t)) => {
            if field.is_packed() {
                writer.write_tag(number, WireType::LengthDelimited);
                writer.write_raw_varint64(packed_data_size(*t, values) as u64);
                for v in values {
                    write_scalar_no_tag(writer, *t, v);
                }
            } else {
                for v in values {
                    writer.write_tag(number, t.wire_type());
                    write_scalar_no_tag(writer, *t, v);
                }
            }
        }
        (FieldValue::Message(m), _) => write_message(writer, number, field_type, m),
        (FieldValue::RepeatedMessage(ms), _) => {
            for m in ms {
                write_message(writer, number, field_type, m);
            }
        }
        (FieldValue::Scalar(_) | FieldValue::RepeatedScalar(_), _) => {}
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Reads one unpacked scalar of the given type.
pub fn read_scalar(
    reader: &mut Reader<'_>,
    scalar_type: ScalarType,
    field: &FieldDescriptor,
) -> Result<Value, DecodeError> {
    let value = match scalar_type {
        ScalarType::Double => Value::F64(f64::from_bits(reader.read_fixed64("double")?)),
        ScalarType::Float => Value::F32(f32::from_bits(reader.read_fixed32("float")?)),
        ScalarType::Int64 => Value::I64(reader.read_raw_varint64("int64")? as i64),
        ScalarType::UInt64 => Value::U64(reader.read_raw_varint64("uint64")?),
        ScalarType::Int32 => Value::I32(reader.read_raw_varint32("int32")? as i32),
        ScalarType::Fixed64 => Value::U64(reader.read_fixed64("fixed64")?),
        ScalarType::Fixed32 => Value::U32(reader.read_fixed32("fixed32")?),
        ScalarType::Bool => Value::Bool(reader.read_raw_varint64("bool")? != 0),
        ScalarType::String => {
            let bytes = reader.read_length_delimited("string")?;
            let s = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 {
                field: field.full_name(),
            })?;
            Value::String(s.to_string())
        }
        ScalarType::Bytes => Value::Bytes(reader.read_length_delimited("bytes")?.to_vec()),
        ScalarType::UInt32 => Value::U32(reader.read_raw_varint32("uint32")?),
        ScalarType::Enum => Value::EnumNumber(reader.read_raw_varint32("enum")? as i32),
        ScalarType::SFixed32 => Value::I32(reader.read_fixed32("sfixed32")? as i32),
        ScalarType::SFixed64 => Value::I64(reader.read_fixed64("sfixed64")? as i64),
        ScalarType::SInt32 => Value::I32(zigzag_decode32(reader.read_raw_varint32("sint32")?)),
        ScalarType::SInt64 => Value::I64(zigzag_decode64(reader.read_raw_varint64("sint64")?)),
    };
    Ok(value)
}

/// Reads a packed block of scalars.
pub fn read_packed(
    reader: &mut Reader<'_>,
    scalar_type: ScalarType,
    field: &FieldDescriptor,
) -> Result<Vec<Value>, DecodeError> {
    let data = reader.read_length_delimited("packed")?;
    let mut block = Reader::with_options(data, reader.options());
    let mut values = Vec::new();
    while !block.is_at_end() {
        values.push(read_scalar(&mut block, scalar_type, field)?);
    }
    Ok(values)
}
