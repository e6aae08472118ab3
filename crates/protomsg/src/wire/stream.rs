//! Reading from byte streams: raw varints and byte-budgeted sub-streams.

use std::io::{self, Read};

use crate::error::{DecodeError, StreamError};
use crate::limits::MAX_VARINT_BYTES;

// Upper bound on the up-front allocation for a declared length.
const INITIAL_CAPACITY: usize = 64 * 1024;

/// Reads a varint length prefix directly from a stream, one byte at a time.
///
/// Returns `Ok(None)` if the stream is at end before the first byte, so
/// callers draining a sequence of delimited messages can stop cleanly.
/// Never reads past the last byte of the varint. A value wider than 32
/// bits fails with [`DecodeError::LengthExceedsLimit`].
pub fn read_raw_varint32_from<R: Read + ?Sized>(input: &mut R) -> Result<Option<u32>, StreamError> {
    let mut result: u64 = 0;
    for i in 0..MAX_VARINT_BYTES {
        let mut byte = [0u8; 1];
        let n = read_retrying(input, &mut byte)?;
        if n == 0 {
            if i == 0 {
                return Ok(None);
            }
            return Err(DecodeError::Truncated {
                context: "length prefix",
            }
            .into());
        }
        result |= ((byte[0] & 0x7F) as u64) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return match u32::try_from(result) {
                Ok(value) => Ok(Some(value)),
                Err(_) => Err(DecodeError::LengthExceedsLimit {
                    field: "length prefix",
                    len: usize::try_from(result).unwrap_or(usize::MAX),
                    max: u32::MAX as usize,
                }
                .into()),
            };
        }
    }
    Err(DecodeError::VarintTooLong.into())
}

fn read_retrying<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match input.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// A stream that reports end-of-data once `limit` bytes have been consumed.
///
/// The budget is decremented by exactly the number of bytes the inner
/// reader returned, and reads are clamped to the remaining budget, so the
/// inner stream is never advanced past the boundary.
#[derive(Debug)]
pub struct LimitedReader<'r, R: Read + ?Sized> {
    inner: &'r mut R,
    limit: usize,
}

impl<'r, R: Read + ?Sized> LimitedReader<'r, R> {
    /// Wraps `inner`, allowing at most `limit` bytes to be read.
    pub fn new(inner: &'r mut R, limit: usize) -> Self {
        Self { inner, limit }
    }

    /// Bytes left in the budget.
    pub fn remaining(&self) -> usize {
        self.limit
    }

    /// Reads the full budget, failing if the inner stream ends first.
    pub fn read_to_limit(&mut self) -> Result<Vec<u8>, StreamError> {
        let declared = self.limit;
        let mut buf = Vec::with_capacity(declared.min(INITIAL_CAPACITY));
        self.read_to_end(&mut buf)?;
        if self.limit != 0 {
            return Err(DecodeError::TruncatedDelimited {
                declared,
                read: buf.len(),
            }
            .into());
        }
        Ok(buf)
    }
}

impl<R: Read + ?Sized> Read for LimitedReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.limit == 0 {
            return Ok(0);
        }
        let max = buf.len().min(self.limit);
        let n = self.inner.read(&mut buf[..max])?;
        self.limit -= n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_limited_reader_stops_at_boundary() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        let bytes = LimitedReader::new(&mut cursor, 3).read_to_limit().unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_limited_reader_budget() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        let mut limited = LimitedReader::new(&mut cursor, 4);
        let mut buf = [0u8; 3];
        assert_eq!(limited.read(&mut buf).unwrap(), 3);
        assert_eq!(limited.remaining(), 1);
        assert_eq!(limited.read(&mut buf).unwrap(), 1);
        assert_eq!(limited.remaining(), 0);
        assert_eq!(limited.read(&mut buf).unwrap(), 0);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_limited_reader_underrun() {
        let mut cursor = Cursor::new(vec![1u8, 2]);
        let result = LimitedReader::new(&mut cursor, 5).read_to_limit();
        assert!(matches!(
            result,
            Err(StreamError::Decode(DecodeError::TruncatedDelimited {
                declared: 5,
                read: 2
            }))
        ));
    }

    #[test]
    fn test_read_varint_from_stream() {
        let mut cursor = Cursor::new(vec![0xAC, 0x02, 0xFF]);
        assert_eq!(read_raw_varint32_from(&mut cursor).unwrap(), Some(300));
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_read_varint_clean_eof() {
        let mut cursor = Cursor::new(Vec::new());
        assert_eq!(read_raw_varint32_from(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_read_varint_wider_than_32_bits() {
        // 2^32
        let mut cursor = Cursor::new(vec![0x80, 0x80, 0x80, 0x80, 0x10]);
        assert!(matches!(
            read_raw_varint32_from(&mut cursor),
            Err(StreamError::Decode(DecodeError::LengthExceedsLimit {
                field: "length prefix",
                ..
            }))
        ));

        let mut cursor = Cursor::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(read_raw_varint32_from(&mut cursor).unwrap(), Some(u32::MAX));
    }

    #[test]
    fn test_read_varint_truncated() {
        let mut cursor = Cursor::new(vec![0x80]);
        assert!(matches!(
            read_raw_varint32_from(&mut cursor),
            Err(StreamError::Decode(DecodeError::Truncated { .. }))
        ));
    }
}
