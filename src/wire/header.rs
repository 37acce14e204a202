//! The 12-byte SCCP frame header: three 32-bit little-endian words.

use crate::error::Error;
use byteorder::{ByteOrder, LittleEndian};

pub const HEADER_LEN: usize = 12;
/// `length` counts the id word plus body bytes, so the minimum valid
/// `length` is 4 (an empty-body message).
pub const MIN_LENGTH_FIELD: u32 = 4;
/// Compile-time cap on the body a single frame may carry.
pub const MAX_TOTAL_LEN: usize = 3 * 1024;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Header {
    /// Id word + body length, in bytes.
    pub length: u32,
    pub reserved: u32,
    pub id: u32,
}

impl Header {
    pub fn new(id: u32, body_len: usize) -> Header {
        Header {
            length: 4 + body_len as u32,
            reserved: 0,
            id,
        }
    }

    pub fn body_len(&self) -> usize {
        (self.length - 4) as usize
    }

    pub fn total_len(&self) -> usize {
        HEADER_LEN + self.body_len()
    }

    pub fn parse(buf: &[u8]) -> Result<Header, Error> {
        if buf.len() < HEADER_LEN {
            return Err(Error::Malformed(format!(
                "header needs {} bytes, got {}",
                HEADER_LEN,
                buf.len()
            )));
        }
        let length = LittleEndian::read_u32(&buf[0..4]);
        let reserved = LittleEndian::read_u32(&buf[4..8]);
        let id = LittleEndian::read_u32(&buf[8..12]);

        if length < MIN_LENGTH_FIELD {
            return Err(Error::Malformed(format!(
                "length field {} is below the minimum of {}",
                length, MIN_LENGTH_FIELD
            )));
        }
        if (length as usize) > MAX_TOTAL_LEN + 4 {
            return Err(Error::Malformed(format!(
                "length field {} exceeds the {} byte cap",
                length, MAX_TOTAL_LEN
            )));
        }

        Ok(Header {
            length,
            reserved,
            id,
        })
    }

    pub fn write(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.length);
        LittleEndian::write_u32(&mut buf[4..8], self.reserved);
        LittleEndian::write_u32(&mut buf[8..12], self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_length() {
        let mut buf = [0u8; 12];
        LittleEndian::write_u32(&mut buf[0..4], 3);
        match Header::parse(&buf) {
            Err(Error::Malformed(_)) => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn rejects_oversized_length() {
        let mut buf = [0u8; 12];
        LittleEndian::write_u32(&mut buf[0..4], (MAX_TOTAL_LEN + 100) as u32);
        match Header::parse(&buf) {
            Err(Error::Malformed(_)) => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn round_trips() {
        let h = Header::new(0x111, 24);
        let mut buf = [0u8; 12];
        h.write(&mut buf);
        let parsed = Header::parse(&buf).unwrap();
        assert_eq!(parsed, h);
        assert_eq!(parsed.body_len(), 24);
        assert_eq!(parsed.total_len(), 36);
    }
}
