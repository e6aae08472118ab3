//! Wire codec primitives.
//!
//! Tags, wire types, varint and fixed-width encodings, and the size
//! helpers the field-set size loop is built on. Everything above this
//! module talks to the byte stream only through [`Reader`], [`Writer`]
//! and the functions here.

pub mod reader;
pub mod stream;
pub mod writer;

pub use reader::Reader;
pub use stream::{LimitedReader, read_raw_varint32_from};
pub use writer::Writer;

use crate::error::DecodeError;
use crate::limits::MAX_FIELD_NUMBER;

/// Payload shape announced by the low three bits of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl WireType {
    /// Creates a WireType from its wire representation.
    pub fn from_u32(v: u32) -> Option<WireType> {
        match v {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            3 => Some(WireType::StartGroup),
            4 => Some(WireType::EndGroup),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

const TAG_TYPE_BITS: u32 = 3;
const TAG_TYPE_MASK: u32 = (1 << TAG_TYPE_BITS) - 1;

/// Tag value that marks the end of a message.
pub const END_TAG: u32 = 0;

/// Combines a field number and wire type into a tag.
#[inline]
pub fn make_tag(number: u32, wire_type: WireType) -> u32 {
    (number << TAG_TYPE_BITS) | wire_type as u32
}

/// Extracts the field number from a tag.
#[inline]
pub fn tag_field_number(tag: u32) -> u32 {
    tag >> TAG_TYPE_BITS
}

/// Extracts the wire type from a tag.
pub fn tag_wire_type(tag: u32) -> Result<WireType, DecodeError> {
    let raw = tag & TAG_TYPE_MASK;
    WireType::from_u32(raw).ok_or(DecodeError::InvalidWireType { tag, wire_type: raw })
}

/// Returns true if `number` can appear in a tag.
pub fn is_valid_field_number(number: u32) -> bool {
    (1..=MAX_FIELD_NUMBER).contains(&number)
}

// =============================================================================
// SIZES
// =============================================================================

/// Number of bytes needed to encode `value` as a varint.
#[inline]
pub fn compute_raw_varint64_size(value: u64) -> usize {
    // 1 byte per 7 significant bits, at least 1
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Number of bytes needed to encode `value` as a varint.
#[inline]
pub fn compute_raw_varint32_size(value: u32) -> usize {
    compute_raw_varint64_size(value as u64)
}

/// Number of bytes needed to encode a tag for `number`.
#[inline]
pub fn compute_tag_size(number: u32) -> usize {
    compute_raw_varint32_size(make_tag(number, WireType::Varint))
}

/// Number of bytes needed for a length prefix plus `len` bytes of payload.
#[inline]
pub fn compute_length_delimited_size(len: usize) -> usize {
    compute_raw_varint64_size(len as u64) + len
}

// =============================================================================
// ZIGZAG ENCODING
// =============================================================================

/// Zigzag-encodes a 32-bit signed integer.
#[inline]
pub fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Decodes a zigzag-encoded 32-bit value.
#[inline]
pub fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

/// Zigzag-encodes a 64-bit signed integer.
///
/// Maps negative numbers to odd positive numbers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Decodes a zigzag-encoded 64-bit value.
#[inline]
pub fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}
