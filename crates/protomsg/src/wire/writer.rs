//! Growable output buffer for wire data.

use crate::wire::{WireType, make_tag};

/// Writer for encoding wire data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a tag for `number` with the given wire type.
    #[inline]
    pub fn write_tag(&mut self, number: u32, wire_type: WireType) {
        self.write_raw_varint32(make_tag(number, wire_type));
    }

    /// Writes an unsigned varint (LEB128).
    #[inline]
    pub fn write_raw_varint64(&mut self, mut value: u64) {
        // Use stack buffer to batch writes (faster than multiple push calls)
        let mut buf = [0u8; 10];
        let mut len = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf[len] = byte;
            len += 1;
            if value == 0 {
                break;
            }
        }
        self.buf.extend_from_slice(&buf[..len]);
    }

    /// Writes a 32-bit unsigned varint.
    #[inline]
    pub fn write_raw_varint32(&mut self, value: u32) {
        self.write_raw_varint64(value as u64);
    }

    /// Writes a little-endian 32-bit value.
    #[inline]
    pub fn write_fixed32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a little-endian 64-bit value.
    #[inline]
    pub fn write_fixed64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a length prefix followed by the bytes.
    pub fn write_length_delimited(&mut self, bytes: &[u8]) {
        self.write_raw_varint64(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_encoding() {
        let mut writer = Writer::new();
        writer.write_raw_varint32(300);
        assert_eq!(writer.as_bytes(), &[0xAC, 0x02]);
    }

    #[test]
    fn test_tag_encoding() {
        let mut writer = Writer::new();
        writer.write_tag(1, WireType::Varint);
        writer.write_tag(16, WireType::LengthDelimited);
        assert_eq!(writer.as_bytes(), &[0x08, 0x82, 0x01]);
    }

    #[test]
    fn test_length_delimited() {
        let mut writer = Writer::new();
        writer.write_length_delimited(b"abc");
        assert_eq!(writer.into_bytes(), vec![3, b'a', b'b', b'c']);
    }
}
