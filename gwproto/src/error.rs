//! Error types for the gateway protocol.
//!
//! This module defines the single enumeration that every fallible operation
//! in the crate returns. It mirrors the error taxonomy of the protocol's
//! error-handling design: framer errors never reach the application (the
//! framer resynchronizes around them), codec errors drop the offending
//! frame, and a handful of structural violations terminate the connection.

use thiserror::Error;

/// Result type alias for gateway protocol operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by the framer, codec, registry, and connection driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Fewer bytes were supplied than the minimum frame size requires.
    #[error("incomplete packet")]
    IncompletePacket,

    /// The two-byte signature prefix did not match `0xC5 0xC3`.
    ///
    /// Reaching the application is not expected: `PacketBuffer` only ever
    /// hands a prefix starting with the signature to the decoder.
    #[error("invalid frame signature")]
    InvalidSignature,

    /// The buffer contains fewer bytes than the frame's declared length.
    #[error("invalid packet length")]
    InvalidPacketLength,

    /// The trailing checksum byte did not match the computed sum.
    #[error("checksum verification failed")]
    InvalidCRC,

    /// A value did not conform to the schema it was being encoded against.
    #[error("value does not conform to schema")]
    SerializationError,

    /// A payload could not be decoded against the schema describing it.
    #[error("failed to decode payload against schema")]
    DeserializationError,

    /// A String field's bytes were not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidEncoding,

    /// A dynamically declared command schema used a construct the registry
    /// cannot synthesize (a nested array, or an unrecognized type tag).
    #[error("unsupported dynamic schema")]
    UnsupportedSchema,

    /// The packet buffer grew past its configured ceiling.
    #[error("packet buffer exceeded its size ceiling")]
    BufferOverflow,

    /// The connection was closed while work was still pending on it.
    #[error("connection closed")]
    ConnectionClosed,

    /// An encoded payload would exceed the 65535-byte wire limit.
    #[error("payload exceeds maximum frame size")]
    PayloadTooLarge,
}
