//! The wire checksum.
//!
//! This is deliberately weak: an 8-bit sum complement, not a CRC. It exists
//! to catch accidental corruption on a serial link, not to resist a hostile
//! device. The checksum byte is chosen so that the unsigned 8-bit sum of
//! every byte in the complete frame — header, payload, and the checksum
//! byte itself — is congruent to `0xFF` modulo 256.

/// Accumulates a running 8-bit sum for the wire checksum.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumAccumulator {
    sum: u32,
}

impl ChecksumAccumulator {
    /// Creates a fresh accumulator.
    #[inline]
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    /// Folds more bytes into the running sum.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.sum = self.sum.wrapping_add(byte as u32);
        }
    }

    /// Finalizes the accumulator into the transmitted checksum byte.
    #[inline]
    pub const fn finalize(self) -> u8 {
        (0xFFu32.wrapping_sub(self.sum & 0xFF) & 0xFF) as u8
    }

    /// Computes the checksum byte over a single slice.
    #[inline]
    pub fn compute(data: &[u8]) -> u8 {
        let mut acc = Self::new();
        acc.update(data);
        acc.finalize()
    }

    /// Computes the checksum byte over several slices without concatenating
    /// them first, so a header and payload living in separate buffers can be
    /// checksummed without an intermediate copy.
    #[inline]
    pub fn compute_slices(slices: &[&[u8]]) -> u8 {
        let mut acc = Self::new();
        for slice in slices {
            acc.update(slice);
        }
        acc.finalize()
    }
}
