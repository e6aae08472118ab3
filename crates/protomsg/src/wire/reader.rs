//! Bounds-checked reader over an in-memory buffer.

use crate::error::DecodeError;
use crate::limits::{MAX_VARINT_BYTES, ParseOptions};
use crate::wire::{END_TAG, tag_field_number};

/// Reader for decoding wire data.
///
/// Wraps a byte slice and provides methods for reading primitives
/// with bounds checking. Tracks the last tag read so a completed parse
/// can verify it stopped at the end-of-input marker, and the current
/// nesting depth of messages and groups.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    last_tag: u32,
    depth: usize,
    options: ParseOptions,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, ParseOptions::default())
    }

    /// Creates a new reader with explicit parse limits.
    pub fn with_options(data: &'a [u8], options: ParseOptions) -> Self {
        Self {
            data,
            pos: 0,
            last_tag: END_TAG,
            depth: 0,
            options,
        }
    }

    /// Returns the parse limits in effect.
    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Creates a reader for an embedded message one level deeper.
    pub fn nested(&self, data: &'a [u8]) -> Result<Reader<'a>, DecodeError> {
        let mut child = Reader::with_options(data, self.options);
        child.depth = self.depth;
        child.enter()?;
        Ok(child)
    }

    /// Enters a nested message or group.
    pub fn enter(&mut self) -> Result<(), DecodeError> {
        if self.depth >= self.options.recursion_limit {
            return Err(DecodeError::RecursionLimitExceeded {
                limit: self.options.recursion_limit,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Leaves a nested group.
    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Reads a tag, returning 0 at end of input.
    pub fn read_tag(&mut self) -> Result<u32, DecodeError> {
        if self.is_at_end() {
            self.last_tag = END_TAG;
            return Ok(END_TAG);
        }
        let tag = self.read_raw_varint32("tag")?;
        if tag_field_number(tag) == 0 {
            return Err(DecodeError::InvalidTag);
        }
        self.last_tag = tag;
        Ok(tag)
    }

    /// Returns the most recently read tag.
    pub fn last_tag(&self) -> u32 {
        self.last_tag
    }

    /// Verifies that the last tag read was `expected`.
    ///
    /// After a top-level parse this must be 0; anything else means the
    /// parse stopped on a stray end-group tag with data left over.
    pub fn check_last_tag_was(&self, expected: u32) -> Result<(), DecodeError> {
        if self.last_tag != expected {
            return Err(DecodeError::InvalidEndTag {
                last_tag: self.last_tag,
            });
        }
        Ok(())
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        if self.pos >= self.data.len() {
            return Err(DecodeError::Truncated { context });
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::Truncated { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads an unsigned varint (LEB128).
    #[inline]
    pub fn read_raw_varint64(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        let mut result: u64 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte(context)?;
            result |= ((byte & 0x7F) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(DecodeError::VarintTooLong)
    }

    /// Reads a varint and keeps its low 32 bits.
    ///
    /// Negative int32 values are written as 10-byte varints, so the full
    /// length must be accepted and the high bits discarded.
    #[inline]
    pub fn read_raw_varint32(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        Ok(self.read_raw_varint64(context)? as u32)
    }

    /// Reads a little-endian 32-bit value.
    #[inline]
    pub fn read_fixed32(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4, context)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a little-endian 64-bit value.
    #[inline]
    pub fn read_fixed64(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        let bytes = self.read_bytes(8, context)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a length prefix and that many bytes.
    pub fn read_length_delimited(&mut self, context: &'static str) -> Result<&'a [u8], DecodeError> {
        let len = self.read_raw_varint64(context)?;
        let max = self.options.max_message_size;
        if len > max as u64 {
            return Err(DecodeError::LengthExceedsLimit {
                field: context,
                len: usize::try_from(len).unwrap_or(usize::MAX),
                max,
            });
        }
        self.read_bytes(len as usize, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{WireType, Writer, make_tag};

    #[test]
    fn test_varint_roundtrip() {
        let test_values = [0u64, 1, 127, 128, 255, 256, 16383, 16384, u64::MAX];

        for v in test_values {
            let mut writer = Writer::new();
            writer.write_raw_varint64(v);

            let mut reader = Reader::new(writer.as_bytes());
            let decoded = reader.read_raw_varint64("test").unwrap();
            assert_eq!(v, decoded, "failed for {}", v);
            assert!(reader.is_at_end());
        }
    }

    #[test]
    fn test_negative_int32_as_ten_byte_varint() {
        let mut writer = Writer::new();
        writer.write_raw_varint64(-1i64 as u64);
        assert_eq!(writer.len(), 10);

        let mut reader = Reader::new(writer.as_bytes());
        assert_eq!(reader.read_raw_varint32("test").unwrap() as i32, -1);
    }

    #[test]
    fn test_varint_too_long() {
        // 11 continuation bytes should fail
        let data = [0x80u8; 11];
        let mut reader = Reader::new(&data);
        let result = reader.read_raw_varint64("test");
        assert!(matches!(result, Err(DecodeError::VarintTooLong)));
    }

    #[test]
    fn test_truncated_varint() {
        let data = [0x80u8, 0x80];
        let mut reader = Reader::new(&data);
        let result = reader.read_raw_varint64("test");
        assert!(matches!(result, Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_read_tag_at_end_returns_zero() {
        let mut reader = Reader::new(&[]);
        assert_eq!(reader.read_tag().unwrap(), 0);
        assert!(reader.check_last_tag_was(0).is_ok());
    }

    #[test]
    fn test_zero_field_number_rejected() {
        let data = [0x02u8];
        let mut reader = Reader::new(&data);
        assert!(matches!(reader.read_tag(), Err(DecodeError::InvalidTag)));
    }

    #[test]
    fn test_check_last_tag_was() {
        let mut writer = Writer::new();
        writer.write_tag(3, WireType::EndGroup);
        let mut reader = Reader::new(writer.as_bytes());
        let tag = reader.read_tag().unwrap();
        assert_eq!(tag, make_tag(3, WireType::EndGroup));
        assert!(matches!(
            reader.check_last_tag_was(0),
            Err(DecodeError::InvalidEndTag { last_tag }) if last_tag == tag
        ));
    }

    #[test]
    fn test_fixed_roundtrip() {
        let mut writer = Writer::new();
        writer.write_fixed32(0xDEAD_BEEF);
        writer.write_fixed64(0x0123_4567_89AB_CDEF);

        let mut reader = Reader::new(writer.as_bytes());
        assert_eq!(reader.read_fixed32("test").unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_fixed64("test").unwrap(), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn test_length_delimited_limit() {
        let mut writer = Writer::new();
        writer.write_raw_varint64(1000);
        writer.write_bytes(&[0u8; 1000]);

        let options = ParseOptions {
            max_message_size: 100,
            ..ParseOptions::default()
        };
        let mut reader = Reader::with_options(writer.as_bytes(), options);
        let result = reader.read_length_delimited("test");
        assert!(matches!(
            result,
            Err(DecodeError::LengthExceedsLimit { max: 100, .. })
        ));
    }

    #[test]
    fn test_length_delimited_truncated() {
        let data = [0x05u8, 1, 2];
        let mut reader = Reader::new(&data);
        let result = reader.read_length_delimited("test");
        assert!(matches!(result, Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_recursion_limit() {
        let options = ParseOptions {
            recursion_limit: 2,
            ..ParseOptions::default()
        };
        let reader = Reader::with_options(&[], options);
        let child = reader.nested(&[]).unwrap();
        let grandchild = child.nested(&[]).unwrap();
        assert_eq!(grandchild.depth(), 2);
        assert!(matches!(
            grandchild.nested(&[]),
            Err(DecodeError::RecursionLimitExceeded { limit: 2 })
        ));
    }

    #[test]
    fn test_group_depth_tracking() {
        let mut reader = Reader::new(&[]);
        reader.enter().unwrap();
        reader.enter().unwrap();
        assert_eq!(reader.depth(), 2);
        reader.exit();
        assert_eq!(reader.depth(), 1);
        reader.exit();
        reader.exit();
        assert_eq!(reader.depth(), 0);
    }
}
