//! Wire constants and per-connection tunables.

/// Frame signature, high byte first on the wire.
pub const SIGNATURE: u16 = 0xC5C3;
/// High byte of the signature, `0xC5`.
pub const SIGNATURE_HI: u8 = 0xC5;
/// Low byte of the signature, `0xC3`.
pub const SIGNATURE_LO: u8 = 0xC3;

/// Bytes in the fixed header before the payload (signature, version, flags,
/// length, intent).
pub const HEADER_SIZE: usize = 8;
/// Minimum size of a complete frame on the wire: header plus checksum byte,
/// no payload.
pub const EMPTY_FRAME_SIZE: usize = HEADER_SIZE + 1;
/// Largest payload a frame's u16 length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Protocol version the engine stamps on frames it originates (the
/// registration probe, and any record the application sends).
pub const PROTOCOL_VERSION: u8 = 1;

/// Default ceiling on how large an unconsumed `PacketBuffer` may grow
/// before it is treated as abuse and cleared.
pub const DEFAULT_BUFFER_CEILING: usize = 128 * 1024;

/// System-reserved intents; every other 16-bit value is device-defined.
pub const INTENT_REQUEST_REGISTRATION: u16 = 0;
pub const INTENT_REGISTER: u16 = 1;
pub const INTENT_NOTIFY_COMMAND_RESULT: u16 = 2;

/// Per-connection limits that are not wire-fixed.
///
/// Unlike the wire constants above, these are constructor arguments rather
/// than global state: a test can shrink the buffer ceiling to exercise
/// `BufferOverflow` without touching the defaults every other connection
/// uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayLimits {
    /// Maximum number of unconsumed bytes a `PacketBuffer` may hold.
    pub buffer_ceiling: usize,
}

impl GatewayLimits {
    /// Limits matching the recommended defaults.
    pub const fn new() -> Self {
        Self {
            buffer_ceiling: DEFAULT_BUFFER_CEILING,
        }
    }

    /// Overrides the buffer ceiling.
    pub fn with_buffer_ceiling(mut self, ceiling: usize) -> Self {
        self.buffer_ceiling = ceiling;
        self
    }
}

impl Default for GatewayLimits {
    fn default() -> Self {
        Self::new()
    }
}
