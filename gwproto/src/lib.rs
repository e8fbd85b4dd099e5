//! Framing, typed codec, and dynamic schema registry for a
//! serial-device-to-cloud gateway protocol.
//!
//! A device speaks a byte-oriented protocol over some transport (typically
//! a serial link): frames carry a fixed little-endian header, a payload,
//! and a weak checksum (see [`core`]). The first frame after connecting is
//! always a device registration, which declares the device's identity and
//! the commands it understands; everything after that is dispatched
//! dynamically against the schemas the registration declared (see
//! [`registry`] and [`protocol`]).
//!
//! [`connection::Connection`] ties framing, codec, registry, and state
//! machine together against a [`transport::Transport`].

pub mod codec;
pub mod config;
pub mod connection;
pub mod core;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use connection::Connection;
pub use core::{ChecksumAccumulator, Frame, PacketBuffer};
pub use error::{Error, Result};
pub use protocol::{ConnectionState, GatewayObserver, ProtocolEngine};
pub use registry::{DeviceRegistration, SchemaRegistry};
pub use transport::{LoopbackTransport, NullTransport, Transport};
