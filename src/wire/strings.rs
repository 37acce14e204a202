//! Fixed-length, NUL-padded string fields and the protocol-version-gated
//! charset rule: ISO-8859-1 for protocol <= 11, UTF-8 for protocol >= 12.

/// Character set used to render a display string on the wire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Charset {
    Latin1,
    Utf8,
}

impl Charset {
    pub fn for_proto_version(proto_version: u16) -> Charset {
        if proto_version >= 12 {
            Charset::Utf8
        } else {
            Charset::Latin1
        }
    }
}

/// Write `s` into `len` bytes of `buf` starting at `offset`, NUL-padding
/// (and truncating) as needed. `buf` must have at least `offset + len` bytes.
pub fn write_fixed(buf: &mut [u8], offset: usize, len: usize, s: &str, charset: Charset) {
    let field = &mut buf[offset..offset + len];
    for b in field.iter_mut() {
        *b = 0;
    }
    let encoded = encode_charset(s, charset);
    let n = encoded.len().min(len.saturating_sub(1).max(0)).min(len);
    field[..n].copy_from_slice(&encoded[..n]);
}

fn encode_charset(s: &str, charset: Charset) -> Vec<u8> {
    match charset {
        Charset::Utf8 => s.as_bytes().to_vec(),
        Charset::Latin1 => s
            .chars()
            .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
            .collect(),
    }
}

/// Read a NUL-terminated (or fully-occupied) fixed field back into a `String`.
pub fn read_fixed(buf: &[u8], offset: usize, len: usize, charset: Charset) -> String {
    let field = &buf[offset..offset + len];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let raw = &field[..end];
    match charset {
        Charset::Utf8 => String::from_utf8_lossy(raw).into_owned(),
        Charset::Latin1 => raw.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_utf8() {
        let mut buf = vec![0xAAu8; 24];
        write_fixed(&mut buf, 0, 24, "200", Charset::Utf8);
        assert_eq!(read_fixed(&buf, 0, 24, Charset::Utf8), "200");
    }

    #[test]
    fn round_trip_latin1_replaces_non_latin1() {
        let mut buf = vec![0u8; 8];
        write_fixed(&mut buf, 0, 8, "caf\u{1F600}", Charset::Latin1);
        assert_eq!(read_fixed(&buf, 0, 8, Charset::Latin1), "caf?");
    }

    #[test]
    fn truncates_when_too_long() {
        let mut buf = vec![0u8; 4];
        write_fixed(&mut buf, 0, 4, "hello", Charset::Utf8);
        assert_eq!(read_fixed(&buf, 0, 4, Charset::Utf8), "hel");
    }
}
