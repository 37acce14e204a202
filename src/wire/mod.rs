//! The SCCP wire codec: frame header, message bodies, and the builder
//! that assembles outbound messages for a device's negotiated version.

pub mod buf;
pub mod builder;
pub mod header;
pub mod messages;
pub mod strings;

pub use builder::MessageBuilder;
pub use header::Header;
pub use messages::Message;
pub use strings::Charset;

use crate::error::Error;

/// Decode one full frame (header + body) from the front of `buf`.
/// Returns the message and the number of bytes consumed.
pub fn decode_frame(buf: &[u8]) -> Result<(Message, usize), Error> {
    let header = Header::parse(buf)?;
    let total = header.total_len();
    if buf.len() < total {
        return Err(Error::Malformed(format!(
            "frame needs {} bytes, have {}",
            total,
            buf.len()
        )));
    }
    let body = &buf[header::HEADER_LEN..total];
    let msg = Message::decode(header.id, body)?;
    Ok((msg, total))
}

/// Encode `msg` into a full frame (header + body) ready to write to the socket.
pub fn encode_frame(msg: &Message, charset: Charset) -> Vec<u8> {
    let body = msg.encode(charset);
    let header = Header::new(msg.id(), body.len());
    let mut out = vec![0u8; header::HEADER_LEN];
    header.write(&mut out);
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_alive_round_trips() {
        let frame = encode_frame(&Message::KeepAlive, Charset::Latin1);
        let (msg, consumed) = decode_frame(&frame).unwrap();
        assert_eq!(consumed, frame.len());
        assert_eq!(msg, Message::KeepAlive);
    }

    #[test]
    fn reports_need_more_bytes_on_partial_frame() {
        let frame = encode_frame(&Message::KeepAlive, Charset::Latin1);
        let err = decode_frame(&frame[..frame.len() - 1]).unwrap_err();
        match err {
            Error::Malformed(_) => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn unknown_message_id_decodes_opaque() {
        let mut frame = encode_frame(&Message::ClearNotify, Charset::Latin1);
        // Overwrite the id word with something this build does not model.
        frame[8] = 0xAB;
        frame[9] = 0xCD;
        let (msg, _) = decode_frame(&frame).unwrap();
        match msg {
            Message::Unknown { id, .. } => assert_eq!(id, 0xCDAB),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }
}
