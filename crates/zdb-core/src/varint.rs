//! # Variable-Length Integers
//!
//! Base-128 little-endian integers used throughout the debug-info format.
//! Each byte carries seven payload bits; the high bit is set on every byte
//! except the last. Signed values are zig-zag mapped first so small negative
//! numbers stay short.
//!
//! [`ByteReader`] is the matching cursor. Every read is bounds-checked and
//! reports [`ZdbError::Truncated`] instead of reading past the buffer.

use crate::error::{malformed, ZdbError, ZdbResult};

/// Longest encoding of a 32-bit value (5 x 7 = 35 bits).
const MAX_VARINT_LEN: usize = 5;

/// Append `value` as an unsigned varint.
pub fn write_unsigned(buf: &mut Vec<u8>, mut value: u32)
{
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Append `value` as a zig-zag signed varint.
pub fn write_signed(buf: &mut Vec<u8>, value: i32)
{
    write_unsigned(buf, zigzag_encode(value));
}

/// Map a signed value onto the unsigned range: 0, -1, 1, -2, ... -> 0, 1, 2, 3, ...
#[must_use]
pub fn zigzag_encode(value: i32) -> u32
{
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode`].
#[must_use]
pub fn zigzag_decode(value: u32) -> i32
{
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Bounds-checked cursor over an encoded buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a>
{
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a>
{
    /// Start reading at the beginning of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self
    {
        Self { buf, pos: 0 }
    }

    /// Start reading at byte offset `pos`.
    #[must_use]
    pub fn at(buf: &'a [u8], pos: usize) -> Self
    {
        Self {
            buf,
            pos: pos.min(buf.len()),
        }
    }

    /// Current byte offset.
    #[must_use]
    pub fn position(&self) -> usize
    {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize
    {
        self.buf.len() - self.pos
    }

    #[must_use]
    pub fn is_at_end(&self) -> bool
    {
        self.pos >= self.buf.len()
    }

    /// Read a single raw byte.
    ///
    /// ## Errors
    ///
    /// Returns `Truncated` at the end of the buffer.
    pub fn read_u8(&mut self) -> ZdbResult<u8>
    {
        let byte = *self.buf.get(self.pos).ok_or(ZdbError::Truncated {
            offset: self.pos,
            needed: 1,
        })?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read an unsigned varint.
    ///
    /// ## Errors
    ///
    /// Returns `Truncated` if the buffer ends mid-value and `Malformed` if the
    /// encoding does not fit in 32 bits.
    pub fn read_unsigned(&mut self) -> ZdbResult<u32>
    {
        let start = self.pos;
        let mut result: u32 = 0;
        for index in 0..MAX_VARINT_LEN {
            let byte = self.read_u8().map_err(|_| ZdbError::Truncated {
                offset: start,
                needed: index + 1,
            })?;
            let payload = u32::from(byte & 0x7F);
            if index == MAX_VARINT_LEN - 1 && payload > 0x0F {
                return Err(malformed!("varint at offset {start} overflows 32 bits"));
            }
            result |= payload << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(malformed!("varint at offset {start} is longer than {MAX_VARINT_LEN} bytes"))
    }

    /// Read a zig-zag signed varint.
    ///
    /// ## Errors
    ///
    /// Same as [`ByteReader::read_unsigned`].
    pub fn read_signed(&mut self) -> ZdbResult<i32>
    {
        self.read_unsigned().map(zigzag_decode)
    }

    /// Read an unsigned varint that is used as a count or length.
    ///
    /// ## Errors
    ///
    /// Same as [`ByteReader::read_unsigned`].
    pub fn read_len(&mut self) -> ZdbResult<usize>
    {
        // u32 always fits in usize on the targets this crate supports.
        self.read_unsigned().map(|value| value as usize)
    }

    /// Borrow the next `len` bytes.
    ///
    /// ## Errors
    ///
    /// Returns `Truncated` if fewer than `len` bytes remain; nothing is consumed.
    pub fn read_bytes(&mut self, len: usize) -> ZdbResult<&'a [u8]>
    {
        if len > self.remaining() {
            return Err(ZdbError::Truncated {
                offset: self.pos,
                needed: len,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// ## Errors
    ///
    /// Returns `Truncated` on a short buffer and `Malformed` on invalid UTF-8.
    pub fn read_string(&mut self) -> ZdbResult<String>
    {
        let len = self.read_len()?;
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|err| malformed!("invalid UTF-8 string at offset {start}: {err}"))
    }
}

/// Append a length-prefixed string.
pub fn write_string(buf: &mut Vec<u8>, value: &str)
{
    write_len(buf, value.len());
    buf.extend_from_slice(value.as_bytes());
}

/// Append a count or length as an unsigned varint.
///
/// Lengths above `u32::MAX` cannot be represented by the format and are
/// clamped; the encoder never produces such collections.
pub fn write_len(buf: &mut Vec<u8>, len: usize)
{
    write_unsigned(buf, u32::try_from(len).unwrap_or(u32::MAX));
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn unsigned_roundtrip(value: u32) -> u32
    {
        let mut buf = Vec::new();
        write_unsigned(&mut buf, value);
        let mut reader = ByteReader::new(&buf);
        let decoded = reader.read_unsigned().unwrap();
        assert!(reader.is_at_end());
        decoded
    }

    fn signed_roundtrip(value: i32) -> i32
    {
        let mut buf = Vec::new();
        write_signed(&mut buf, value);
        ByteReader::new(&buf).read_signed().unwrap()
    }

    #[test]
    fn test_unsigned_encoding_bytes()
    {
        let mut buf = Vec::new();
        write_unsigned(&mut buf, 0);
        write_unsigned(&mut buf, 127);
        write_unsigned(&mut buf, 128);
        write_unsigned(&mut buf, 300);
        assert_eq!(buf, vec![0x00, 0x7F, 0x80, 0x01, 0xAC, 0x02]);
    }

    #[test]
    fn test_unsigned_boundaries()
    {
        for value in [0, 1, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, u32::MAX - 1, u32::MAX] {
            assert_eq!(unsigned_roundtrip(value), value);
        }
    }

    #[test]
    fn test_signed_boundaries()
    {
        for value in [0, 1, -1, 63, -64, 64, -65, 10_000, -10_000, i32::MAX, i32::MIN] {
            assert_eq!(signed_roundtrip(value), value);
        }
    }

    #[test]
    fn test_zigzag_mapping()
    {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i32::MIN), u32::MAX);
    }

    #[test]
    fn test_truncated_varint()
    {
        let mut reader = ByteReader::new(&[0x80, 0x80]);
        assert!(matches!(reader.read_unsigned(), Err(ZdbError::Truncated { offset: 0, .. })));
    }

    #[test]
    fn test_overlong_varint()
    {
        let mut reader = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert!(matches!(reader.read_unsigned(), Err(ZdbError::Malformed(_))));

        let mut reader = ByteReader::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(matches!(reader.read_unsigned(), Err(ZdbError::Malformed(_))));
    }

    #[test]
    fn test_read_bytes_checks_remaining()
    {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        assert!(reader.read_bytes(4).is_err());
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_bytes(3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_string_roundtrip()
    {
        let mut buf = Vec::new();
        write_string(&mut buf, "scripts/main.zs");
        assert_eq!(ByteReader::new(&buf).read_string().unwrap(), "scripts/main.zs");
    }
}
