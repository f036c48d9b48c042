//! # Binary Field Codec
//!
//! Little-endian integers and length-prefixed strings as laid out in
//! `datastore.bin`. Strings carry a 7-bit varint byte length (LEB128)
//! followed by UTF-8 bytes.

use std::io::{self, Read};

/// Longest primary key accepted when parsing. Longer prefixes are treated as corruption.
pub const MAX_KEY_BYTES: usize = 64 * 1024;

pub fn put_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_string(buf: &mut Vec<u8>, value: &str) {
    let bytes = value.as_bytes();
    let mut len = bytes.len() as u32;
    while len >= 0x80 {
        buf.push((len as u8) | 0x80);
        len >>= 7;
    }
    buf.push(len as u8);
    buf.extend_from_slice(bytes);
}

/// Encoded size of a length-prefixed string.
pub fn string_size(value: &str) -> usize {
    let mut len = value.len() as u32;
    let mut prefix = 1;
    while len >= 0x80 {
        prefix += 1;
        len >>= 7;
    }
    prefix + value.len()
}

/// Outcome of a field read that distinguishes a clean end of stream.
pub enum Field<T> {
    Value(T),
    /// No byte at all was available.
    EndOfStream,
    /// Some but not all bytes were available.
    Truncated,
}

/// Read as many bytes as possible into `buf`, returning the count.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub fn read_i32<R: Read>(reader: &mut R) -> io::Result<Field<i32>> {
    let mut bytes = [0u8; 4];
    match fill(reader, &mut bytes)? {
        0 => Ok(Field::EndOfStream),
        4 => Ok(Field::Value(i32::from_le_bytes(bytes))),
        _ => Ok(Field::Truncated),
    }
}

/// Read exactly `len` bytes without trusting `len` for preallocation.
pub fn read_bytes<R: Read>(reader: &mut R, len: usize) -> io::Result<Option<Vec<u8>>> {
    let mut bytes = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    Ok((bytes.len() == len).then_some(bytes))
}

/// Read a length-prefixed string.
///
/// Returns the string and the number of bytes consumed. `Ok(None)` means
/// truncation; an oversized or non UTF-8 key is reported as `InvalidData`.
pub fn read_string<R: Read>(reader: &mut R) -> io::Result<Option<(String, usize)>> {
    let mut len: u32 = 0;
    let mut shift = 0;
    let mut consumed = 0;
    loop {
        let mut byte = [0u8; 1];
        if fill(reader, &mut byte)? == 0 {
            return Ok(None);
        }
        consumed += 1;
        len |= u32::from(byte[0] & 0x7F) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 28 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad string length prefix"));
        }
    }

    let len = len as usize;
    if len > MAX_KEY_BYTES {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "string too long"));
    }
    let Some(bytes) = read_bytes(reader, len)? else {
        return Ok(None);
    };
    let text = String::from_utf8(bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "string is not UTF-8"))?;
    Ok(Some((text, consumed + len)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_string_prefix_is_one_byte() {
        let mut buf = Vec::new();
        put_string(&mut buf, "abc");
        assert_eq!(buf, vec![3, b'a', b'b', b'c']);
        assert_eq!(string_size("abc"), 4);
    }

    #[test]
    fn test_long_string_prefix() {
        let key = "k".repeat(300);
        let mut buf = Vec::new();
        put_string(&mut buf, &key);
        // 300 = 0b1_0010_1100 -> 0xAC 0x02
        assert_eq!(&buf[..2], &[0xAC, 0x02]);
        assert_eq!(string_size(&key), 302);

        let (decoded, consumed) = read_string(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(decoded, key);
        assert_eq!(consumed, 302);
    }

    #[test]
    fn test_truncated_string() {
        let buf = vec![5, b'a', b'b'];
        assert!(read_string(&mut buf.as_slice()).unwrap().is_none());
    }

    #[test]
    fn test_read_i32_states() {
        let empty: &[u8] = &[];
        assert!(matches!(read_i32(&mut &*empty).unwrap(), Field::EndOfStream));

        let partial: &[u8] = &[1, 2];
        assert!(matches!(read_i32(&mut &*partial).unwrap(), Field::Truncated));

        let full: &[u8] = &[1, 0, 0, 0];
        assert!(matches!(read_i32(&mut &*full).unwrap(), Field::Value(1)));
    }
}
