//! Frame definition and wire serialization.
//!
//! A frame is the sole unit of transmission: a fixed eight-byte header, an
//! optional payload, and a trailing checksum byte.
//!
//! ```text
//! off  size  field
//!  0   1     signature high byte = 0xC5
//!  1   1     signature low  byte = 0xC3
//!  2   1     version
//!  3   1     flags
//!  4   2     payload length, little-endian
//!  6   2     intent, little-endian
//!  8   N     payload
//!  8+N 1     checksum
//! ```

use super::checksum::ChecksumAccumulator;
use crate::config::{MAX_PAYLOAD_LEN, SIGNATURE_HI, SIGNATURE_LO};
use crate::error::{Error, Result};

/// Bytes in the fixed header before the payload.
pub const HEADER_SIZE: usize = 8;

/// A decoded frame: a header plus its payload, stripped of the wire
/// signature and checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Protocol version carried on the wire.
    pub version: u8,
    /// Opaque per-frame flags byte; the core protocol does not interpret it.
    pub flags: u8,
    /// 16-bit message-type identifier.
    pub intent: u16,
    /// Frame payload, at most 65535 bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Builds a frame, rejecting payloads too large for the wire length
    /// field.
    pub fn new(version: u8, flags: u8, intent: u16, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge);
        }
        Ok(Self {
            version,
            flags,
            intent,
            payload,
        })
    }

    /// Total size of this frame once encoded, header through checksum.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + 1
    }

    /// Encodes the frame to its wire form, signature through checksum.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_size());
        out.push(SIGNATURE_HI);
        out.push(SIGNATURE_LO);
        out.push(self.version);
        out.push(self.flags);
        out.extend_from_slice(&(self.payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.intent.to_le_bytes());
        out.extend_from_slice(&self.payload);
        let checksum = ChecksumAccumulator::compute(&out);
        out.push(checksum);
        out
    }

    /// Decodes one frame from the front of `buf`.
    ///
    /// Returns the frame and the number of bytes it occupied. Intended to be
    /// called only once a `PacketBuffer` has already established that a
    /// complete frame is present; a short buffer is reported as
    /// [`Error::IncompletePacket`] rather than treated as a contract
    /// violation.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 2 {
            return Err(Error::IncompletePacket);
        }
        if buf[0] != SIGNATURE_HI || buf[1] != SIGNATURE_LO {
            return Err(Error::InvalidSignature);
        }
        if buf.len() < HEADER_SIZE {
            return Err(Error::IncompletePacket);
        }

        let version = buf[2];
        let flags = buf[3];
        let payload_len = u16::from_le_bytes([buf[4], buf[5]]) as usize;
        let intent = u16::from_le_bytes([buf[6], buf[7]]);

        let total_size = HEADER_SIZE + payload_len + 1;
        if buf.len() < total_size {
            return Err(Error::IncompletePacket);
        }

        let stored_checksum = buf[total_size - 1];
        let computed_checksum = ChecksumAccumulator::compute(&buf[..total_size - 1]);
        if stored_checksum != computed_checksum {
            return Err(Error::InvalidCRC);
        }

        let payload = buf[HEADER_SIZE..total_size - 1].to_vec();
        Ok((
            Self {
                version,
                flags,
                intent,
                payload,
            },
            total_size,
        ))
    }
}
