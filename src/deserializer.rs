// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Turns a byte stream from a socket into a sequence of frames.
//!
//! Holds a fixed-size ring buffer and two cursors (`start`, `end`)
//! marking the unconsumed region. `read` pulls more bytes in from the
//! fd; `pop` peels one complete frame off the front, if one is ready.
//!
//! The buffer compacts (shifts the unconsumed region back to offset 0)
//! whenever `start` has advanced, not only when it catches up to `end`.
//! Compacting lazily only at `start == end` lets a slow reader who never
//! quite drains the buffer run the `start` cursor forward until `end`
//! hits the buffer cap with room still free behind it, surfacing a
//! spurious `Full`.

use std::io::Read;

use crate::error::Error;
use crate::wire::header::{HEADER_LEN, MAX_TOTAL_LEN, MIN_LENGTH_FIELD};
use crate::wire::{decode_frame, Message};

pub const BUFFER_LEN: usize = 3072;

#[derive(Debug)]
pub enum ReadOutcome {
    Progress,
    Full,
    Eof,
}

pub struct Deserializer<R> {
    source: R,
    buf: Box<[u8; BUFFER_LEN]>,
    start: usize,
    end: usize,
}

impl<R: Read> Deserializer<R> {
    pub fn new(source: R) -> Deserializer<R> {
        Deserializer { source, buf: Box::new([0u8; BUFFER_LEN]), start: 0, end: 0 }
    }

    fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.buf.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
    }

    /// Pull more bytes from the source into the buffer.
    pub fn read(&mut self) -> Result<ReadOutcome, Error> {
        self.compact();
        let bytes_left = self.buf.len() - self.end;
        if bytes_left == 0 {
            return Ok(ReadOutcome::Full);
        }
        let n = self.source.read(&mut self.buf[self.end..])?;
        if n == 0 {
            return Ok(ReadOutcome::Eof);
        }
        self.end += n;
        Ok(ReadOutcome::Progress)
    }

    /// Pop one complete frame off the front of the buffer, if available.
    /// Returns `Ok(None)` when the buffer holds no full frame yet.
    pub fn pop(&mut self) -> Result<Option<Message>, Error> {
        let avail = self.end - self.start;
        if avail < HEADER_LEN {
            return Ok(None);
        }
        let header_buf = &self.buf[self.start..self.end];
        let length = u32::from_le_bytes([header_buf[0], header_buf[1], header_buf[2], header_buf[3]]);
        if length < MIN_LENGTH_FIELD || (length as usize) > MAX_TOTAL_LEN + 4 {
            return Err(Error::Malformed(format!("length field {} out of range", length)));
        }
        let total = HEADER_LEN + (length as usize - 4);
        if avail < total {
            return Ok(None);
        }
        let (msg, consumed) = decode_frame(&self.buf[self.start..self.start + total])?;
        debug_assert_eq!(consumed, total);
        self.start += total;
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
        Ok(Some(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{encode_frame, Charset};
    use std::io::Cursor;

    #[test]
    fn pops_nothing_from_empty_buffer() {
        let mut d = Deserializer::new(Cursor::new(Vec::<u8>::new()));
        assert!(d.pop().unwrap().is_none());
    }

    #[test]
    fn reads_and_pops_one_frame() {
        let frame = encode_frame(&Message::KeepAlive, Charset::Latin1);
        let mut d = Deserializer::new(Cursor::new(frame));
        matches!(d.read().unwrap(), ReadOutcome::Progress);
        assert_eq!(d.pop().unwrap(), Some(Message::KeepAlive));
        assert_eq!(d.pop().unwrap(), None);
    }

    #[test]
    fn pops_two_back_to_back_frames_in_order() {
        let mut bytes = encode_frame(&Message::KeepAlive, Charset::Latin1);
        bytes.extend(encode_frame(&Message::ClearNotify, Charset::Latin1));
        let mut d = Deserializer::new(Cursor::new(bytes));
        d.read().unwrap();
        assert_eq!(d.pop().unwrap(), Some(Message::KeepAlive));
        assert_eq!(d.pop().unwrap(), Some(Message::ClearNotify));
        assert_eq!(d.pop().unwrap(), None);
    }

    #[test]
    fn eof_on_empty_source() {
        let mut d = Deserializer::new(Cursor::new(Vec::<u8>::new()));
        match d.read().unwrap() {
            ReadOutcome::Eof => {}
            other => panic!("expected Eof, got {:?}", other),
        }
    }

    #[test]
    fn malformed_length_is_rejected() {
        let mut bad = vec![0u8; HEADER_LEN];
        bad[0..4].copy_from_slice(&(MAX_TOTAL_LEN as u32 + 100).to_le_bytes());
        let mut d = Deserializer::new(Cursor::new(bad));
        d.read().unwrap();
        match d.pop() {
            Err(Error::Malformed(_)) => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn compaction_keeps_small_reads_from_filling_buffer() {
        // Push enough whole frames through a one-at-a-time consumer that the
        // total bytes read would overflow the fixed buffer if start never
        // moved back to zero between reads.
        let mut bytes = Vec::new();
        for _ in 0..200 {
            bytes.extend(encode_frame(&Message::KeepAlive, Charset::Latin1));
        }
        assert!(bytes.len() > BUFFER_LEN);
        let mut d = Deserializer::new(Cursor::new(bytes));
        let mut popped = 0;
        loop {
            match d.read().unwrap() {
                ReadOutcome::Progress => {}
                ReadOutcome::Eof => break,
                ReadOutcome::Full => panic!("buffer filled despite compaction"),
            }
            while let Some(_) = d.pop().unwrap() {
                popped += 1;
            }
        }
        assert_eq!(popped, 200);
    }
}
