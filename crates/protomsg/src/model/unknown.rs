//! Fields the active schema does not recognize, kept as raw wire values.

use std::collections::BTreeMap;

use crate::error::DecodeError;
use crate::wire::{
    Reader, WireType, Writer, compute_length_delimited_size, compute_raw_varint32_size,
    compute_raw_varint64_size, compute_tag_size, make_tag, tag_field_number, tag_wire_type,
};

/// Field numbers of the message-set item group and its members.
pub(crate) const MESSAGE_SET_ITEM: u32 = 1;
pub(crate) const MESSAGE_SET_TYPE_ID: u32 = 2;
pub(crate) const MESSAGE_SET_MESSAGE: u32 = 3;

/// One raw value of an unknown field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnknownValue {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    LengthDelimited(Vec<u8>),
    Group(UnknownFieldSet),
}

impl UnknownValue {
    fn wire_type(&self) -> WireType {
        match self {
            UnknownValue::Varint(_) => WireType::Varint,
            UnknownValue::Fixed32(_) => WireType::Fixed32,
            UnknownValue::Fixed64(_) => WireType::Fixed64,
            UnknownValue::LengthDelimited(_) => WireType::LengthDelimited,
            UnknownValue::Group(_) => WireType::StartGroup,
        }
    }

    fn serialized_size(&self, number: u32) -> usize {
        let tag = compute_tag_size(number);
        match self {
            UnknownValue::Varint(v) => tag + compute_raw_varint64_size(*v),
            UnknownValue::Fixed32(_) => tag + 4,
            UnknownValue::Fixed64(_) => tag + 8,
            UnknownValue::LengthDelimited(bytes) => tag + compute_length_delimited_size(bytes.len()),
            UnknownValue::Group(group) => 2 * tag + group.serialized_size(),
        }
    }

    fn write_to(&self, number: u32, writer: &mut Writer) {
        writer.write_tag(number, self.wire_type());
        match self {
            UnknownValue::Varint(v) => writer.write_raw_varint64(*v),
            UnknownValue::Fixed32(v) => writer.write_fixed32(*v),
            UnknownValue::Fixed64(v) => writer.write_fixed64(*v),
            UnknownValue::LengthDelimited(bytes) => writer.write_length_delimited(bytes),
            UnknownValue::Group(group) => {
                group.write_to(writer);
                writer.write_tag(number, WireType::EndGroup);
            }
        }
    }
}

/// Unknown fields of one message, keyed by field number.
///
/// Entries for one number keep the order in which they were
/// encountered, whatever their wire types. Numbers are written in
/// ascending order. Merging appends the source's entries after the
/// destination's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UnknownFieldSet {
    fields: BTreeMap<u32, Vec<UnknownValue>>,
}

impl UnknownFieldSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of distinct field numbers present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn has_field(&self, number: u32) -> bool {
        self.fields.contains_key(&number)
    }

    /// Entries for `number`, in encounter order.
    pub fn get(&self, number: u32) -> &[UnknownValue] {
        self.fields.get(&number).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates field numbers in ascending order with their entries.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[UnknownValue])> {
        self.fields.iter().map(|(n, v)| (*n, v.as_slice()))
    }

    /// Appends one entry for `number`.
    pub fn add(&mut self, number: u32, value: UnknownValue) -> &mut Self {
        self.fields.entry(number).or_default().push(value);
        self
    }

    pub fn add_varint(&mut self, number: u32, value: u64) -> &mut Self {
        self.add(number, UnknownValue::Varint(value))
    }

    pub fn add_fixed32(&mut self, number: u32, value: u32) -> &mut Self {
        self.add(number, UnknownValue::Fixed32(value))
    }

    pub fn add_fixed64(&mut self, number: u32, value: u64) -> &mut Self {
        self.add(number, UnknownValue::Fixed64(value))
    }

    pub fn add_length_delimited(&mut self, number: u32, value: impl Into<Vec<u8>>) -> &mut Self {
        self.add(number, UnknownValue::LengthDelimited(value.into()))
    }

    pub fn add_group(&mut self, number: u32, group: UnknownFieldSet) -> &mut Self {
        self.add(number, UnknownValue::Group(group))
    }

    /// Removes every entry for `number`.
    pub fn clear_field(&mut self, number: u32) -> &mut Self {
        self.fields.remove(&number);
        self
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Appends all of `other`'s entries, per number, after this set's.
    pub fn merge_from(&mut self, other: &UnknownFieldSet) -> &mut Self {
        for (number, values) in &other.fields {
            self.fields
                .entry(*number)
                .or_default()
                .extend(values.iter().cloned());
        }
        self
    }

    /// Reads the value announced by `tag` and stores it.
    ///
    /// Returns `Ok(false)` if `tag` is an end-group tag, which ends the
    /// enclosing group or message.
    pub fn merge_field_from(&mut self, tag: u32, reader: &mut Reader<'_>) -> Result<bool, DecodeError> {
        let number = tag_field_number(tag);
        let value = match tag_wire_type(tag)? {
            WireType::Varint => UnknownValue::Varint(reader.read_raw_varint64("unknown varint")?),
            WireType::Fixed64 => UnknownValue::Fixed64(reader.read_fixed64("unknown fixed64")?),
            WireType::Fixed32 => UnknownValue::Fixed32(reader.read_fixed32("unknown fixed32")?),
            WireType::LengthDelimited => UnknownValue::LengthDelimited(
                reader.read_length_delimited("unknown length-delimited")?.to_vec(),
            ),
            WireType::StartGroup => {
                reader.enter()?;
                let mut group = UnknownFieldSet::new();
                group.merge_from_reader(reader)?;
                if reader.last_tag() != make_tag(number, WireType::EndGroup) {
                    return Err(DecodeError::UnterminatedGroup { number });
                }
                reader.exit();
                UnknownValue::Group(group)
            }
            WireType::EndGroup => return Ok(false),
        };
        self.add(number, value);
        Ok(true)
    }

    /// Reads fields until end of input or an end-group tag.
    pub fn merge_from_reader(&mut self, reader: &mut Reader<'_>) -> Result<(), DecodeError> {
        loop {
            let tag = reader.read_tag()?;
            if tag == 0 || !self.merge_field_from(tag, reader)? {
                return Ok(());
            }
        }
    }

    /// Parses a complete buffer of raw fields.
    pub fn parse_from_bytes(data: &[u8]) -> Result<UnknownFieldSet, DecodeError> {
        let mut reader = Reader::new(data);
        let mut set = UnknownFieldSet::new();
        set.merge_from_reader(&mut reader)?;
        reader.check_last_tag_was(0)?;
        Ok(set)
    }

    /// Encoded size with normal framing.
    pub fn serialized_size(&self) -> usize {
        self.fields
            .iter()
            .map(|(number, values)| values.iter().map(|v| v.serialized_size(*number)).sum::<usize>())
            .sum()
    }

    /// Writes every entry with its original wire type.
    pub fn write_to(&self, writer: &mut Writer) {
        for (number, values) in &self.fields {
            for value in values {
                value.write_to(*number, writer);
            }
        }
    }

    /// Encodes the set with normal framing.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::with_capacity(self.serialized_size());
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Encoded size with message-set framing.
    ///
    /// Only length-delimited entries have a message-set representation;
    /// entries of other wire types are not written.
    pub fn serialized_size_as_message_set(&self) -> usize {
        let item_overhead = 2 * compute_tag_size(MESSAGE_SET_ITEM)
            + compute_tag_size(MESSAGE_SET_TYPE_ID)
            + compute_tag_size(MESSAGE_SET_MESSAGE);
        self.fields
            .iter()
            .map(|(number, values)| {
                values
                    .iter()
                    .filter_map(|v| match v {
                        UnknownValue::LengthDelimited(bytes) => Some(
                            item_overhead
                                + compute_raw_varint32_size(*number)
                                + compute_length_delimited_size(bytes.len()),
                        ),
                        _ => None,
                    })
                    .sum::<usize>()
            })
            .sum()
    }

    /// Writes each length-delimited entry as a message-set item group.
    pub fn write_as_message_set_to(&self, writer: &mut Writer) {
        for (number, values) in &self.fields {
            for value in values {
                if let UnknownValue::LengthDelimited(bytes) = value {
                    writer.write_tag(MESSAGE_SET_ITEM, WireType::StartGroup);
                    writer.write_tag(MESSAGE_SET_TYPE_ID, WireType::Varint);
                    writer.write_raw_varint32(*number);
                    writer.write_tag(MESSAGE_SET_MESSAGE, WireType::LengthDelimited);
                    writer.write_length_delimited(bytes);
                    writer.write_tag(MESSAGE_SET_ITEM, WireType::EndGroup);
                }
            }
        }
    }
}
