//! The growable byte buffer that turns a transport's byte stream into a
//! sequence of [`Frame`]s.
//!
//! `PacketBuffer` maintains one invariant after every mutation: the buffer
//! either starts with the two-byte signature, starts with a lone `0xC5`
//! awaiting its partner byte, or is empty. This lets `has_frame`/`pop_frame`
//! read the length field directly off offset 4 without re-scanning for a
//! frame boundary on every call.

use crate::config::{GatewayLimits, HEADER_SIZE as CFG_HEADER_SIZE, SIGNATURE_HI, SIGNATURE_LO};
use crate::core::frame::{Frame, HEADER_SIZE};
use crate::error::{Error, Result};

const _: () = assert!(CFG_HEADER_SIZE == HEADER_SIZE);

/// Accumulates bytes read from a transport and yields complete frames.
#[derive(Debug, Default)]
pub struct PacketBuffer {
    buf: Vec<u8>,
    ceiling: usize,
}

impl PacketBuffer {
    /// Creates an empty buffer with the given limits.
    pub fn new(limits: GatewayLimits) -> Self {
        Self {
            buf: Vec::new(),
            ceiling: limits.buffer_ceiling,
        }
    }

    /// Number of unconsumed bytes currently held.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if no bytes are held.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends newly-read bytes and resynchronizes onto the next frame
    /// boundary.
    ///
    /// Returns [`Error::BufferOverflow`] (after clearing the buffer) if the
    /// ceiling configured at construction is exceeded.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > self.ceiling {
            self.buf.clear();
            return Err(Error::BufferOverflow);
        }
        self.resynchronize();
        Ok(())
    }

    /// True iff a complete frame sits at the front of the buffer.
    pub fn has_frame(&self) -> bool {
        if self.buf.len() < HEADER_SIZE + 1 {
            return false;
        }
        let payload_len = u16::from_le_bytes([self.buf[4], self.buf[5]]) as usize;
        self.buf.len() >= HEADER_SIZE + payload_len + 1
    }

    /// Parses, removes, and returns the frame at the front of the buffer.
    ///
    /// Returns `Ok(None)` if `has_frame` would report false. On an integrity
    /// failure (bad signature or checksum) the offending bytes are still
    /// removed — the frame's length is fully determined by its length
    /// field, independent of whether it validates — and the error is
    /// returned so the caller can log it; the connection itself is not
    /// affected.
    pub fn pop_frame(&mut self) -> Result<Option<Frame>> {
        if !self.has_frame() {
            return Ok(None);
        }

        let result = Frame::decode(&self.buf);
        let consumed = match &result {
            Ok((_, consumed)) => *consumed,
            Err(Error::InvalidCRC) | Err(Error::InvalidSignature) => {
                let payload_len = u16::from_le_bytes([self.buf[4], self.buf[5]]) as usize;
                HEADER_SIZE + payload_len + 1
            }
            Err(_) => return result.map(|(frame, _)| Some(frame)),
        };

        self.buf.drain(..consumed);
        self.resynchronize();

        match result {
            Ok((frame, _)) => Ok(Some(frame)),
            Err(e) => Err(e),
        }
    }

    /// Empties the buffer unconditionally.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Re-establishes the buffer invariant: it starts with the full
    /// signature, a lone leading `0xC5` awaiting its partner, or is empty.
    fn resynchronize(&mut self) {
        loop {
            match self.buf.len() {
                0 => return,
                1 => {
                    if self.buf[0] != SIGNATURE_HI {
                        self.buf.clear();
                    }
                    return;
                }
                _ => {
                    if self.buf[0] == SIGNATURE_HI && self.buf[1] == SIGNATURE_LO {
                        return;
                    }

                    match self.buf[1..].iter().position(|&b| b == SIGNATURE_HI) {
                        None => {
                            self.buf.clear();
                            return;
                        }
                        Some(offset) => {
                            let i = offset + 1;
                            if i == self.buf.len() - 1 {
                                self.buf.drain(..i);
                                return;
                            }
                            if self.buf[i + 1] == SIGNATURE_LO {
                                self.buf.drain(..i);
                                return;
                            }
                            self.buf.drain(..=i);
                            // continue the loop to re-examine from the new front
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_s2() -> Vec<u8> {
        vec![
            0xC5, 0xC3, 0x02, 0x03, 0x03, 0x00, 0x04, 0x00, 0x31, 0x32, 0x33, 0xD5,
        ]
    }

    #[test]
    fn empty_buffer_has_no_frame() {
        let buf = PacketBuffer::new(GatewayLimits::new());
        assert!(!buf.has_frame());
    }

    #[test]
    fn single_frame_round_trips() {
        let mut buf = PacketBuffer::new(GatewayLimits::new());
        buf.append(&fixture_s2()).unwrap();
        assert!(buf.has_frame());
        let frame = buf.pop_frame().unwrap().unwrap();
        assert_eq!(frame.intent, 4);
        assert_eq!(frame.payload, vec![0x31, 0x32, 0x33]);
        assert!(buf.is_empty());
        assert!(buf.pop_frame().unwrap().is_none());
    }

    #[test]
    fn s4_resync_with_prefix_junk_byte_at_a_time() {
        let stream: [u8; 20] = [
            0x63, 0x62, 0x61, 0xC5, 0x60, 0xC3, 0x5E, 0x5D, 0xC5, 0xC3, 0x02, 0x03, 0x03, 0x00,
            0x04, 0x00, 0x31, 0x32, 0x33, 0xD5,
        ];
        let mut buf = PacketBuffer::new(GatewayLimits::new());
        for &byte in &stream {
            buf.append(&[byte]).unwrap();
        }
        let frame = buf.pop_frame().unwrap().unwrap();
        assert_eq!(frame.version, 2);
        assert_eq!(frame.flags, 3);
        assert_eq!(frame.intent, 4);
        assert_eq!(frame.payload, vec![0x31, 0x32, 0x33]);
        assert!(buf.is_empty());
    }

    #[test]
    fn junk_tolerance_any_prefix_without_signature() {
        let mut with_junk = PacketBuffer::new(GatewayLimits::new());
        with_junk.append(b"not a frame at all").unwrap();
        with_junk.append(&fixture_s2()).unwrap();

        let mut clean = PacketBuffer::new(GatewayLimits::new());
        clean.append(&fixture_s2()).unwrap();

        assert_eq!(with_junk.pop_frame().unwrap(), clean.pop_frame().unwrap());
    }

    #[test]
    fn lone_signature_byte_at_tail_is_preserved() {
        let mut buf = PacketBuffer::new(GatewayLimits::new());
        buf.append(&[0xC5]).unwrap();
        assert_eq!(buf.len(), 1);
        buf.append(&[0xC3]).unwrap();
        assert_eq!(&buf.buf[..2], &[0xC5, 0xC3]);
    }

    #[test]
    fn lone_byte_that_is_not_signature_is_cleared() {
        let mut buf = PacketBuffer::new(GatewayLimits::new());
        buf.append(&[0x61]).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn invalid_crc_is_reported_but_frame_is_still_consumed() {
        let mut buf = PacketBuffer::new(GatewayLimits::new());
        let mut bad = fixture_s2();
        *bad.last_mut().unwrap() = 0xBA;
        buf.append(&bad).unwrap();

        let result = buf.pop_frame();
        assert_eq!(result, Err(Error::InvalidCRC));
        assert!(buf.is_empty());
    }

    #[test]
    fn chunking_independence() {
        let mut all_at_once = fixture_s2();
        all_at_once.extend_from_slice(&fixture_s2());

        let mut one_shot = PacketBuffer::new(GatewayLimits::new());
        one_shot.append(&all_at_once).unwrap();
        let first = one_shot.pop_frame().unwrap().unwrap();
        let second = one_shot.pop_frame().unwrap().unwrap();

        let mut chunked = PacketBuffer::new(GatewayLimits::new());
        for chunk in all_at_once.chunks(3) {
            chunked.append(chunk).unwrap();
        }
        let first_chunked = chunked.pop_frame().unwrap().unwrap();
        let second_chunked = chunked.pop_frame().unwrap().unwrap();

        assert_eq!(first, first_chunked);
        assert_eq!(second, second_chunked);
    }

    #[test]
    fn overflow_clears_and_reports() {
        let limits = GatewayLimits::new().with_buffer_ceiling(4);
        let mut buf = PacketBuffer::new(limits);
        let err = buf.append(&[0xC5, 0xC3, 0x00, 0x00, 0x00]).unwrap_err();
        assert_eq!(err, Error::BufferOverflow);
        assert!(buf.is_empty());
    }
}
