//! The per-connection state machine: registration handshake, then dynamic
//! command dispatch.

use crate::codec::Value;
use crate::config::{
    INTENT_NOTIFY_COMMAND_RESULT, INTENT_REGISTER, INTENT_REQUEST_REGISTRATION, PROTOCOL_VERSION,
};
use crate::core::Frame;
use crate::error::{Error, Result};
use crate::registry::{decode_device_registration, DeviceRegistration, SchemaRegistry};
use std::collections::HashMap;

/// Where a connection sits in the registration handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The transport has just connected; no frame has been sent or received.
    Connecting,
    /// The registration probe has been sent; waiting for the device's
    /// registration frame.
    AwaitingRegistration,
    /// Registration is complete; user-intent frames are dispatched as
    /// commands.
    Operational,
    /// The connection has been torn down.
    Closed,
}

/// Upward notifications the engine delivers to the application as frames
/// are processed.
pub trait GatewayObserver {
    /// Fired once, after the device's registration frame decodes
    /// successfully.
    fn on_registered(&mut self, registration: &DeviceRegistration);

    /// Fired per frame carrying a registered command's intent.
    fn on_command(&mut self, name: &str, params: HashMap<String, Value>, intent: u16);

    /// Fired for an operational-state frame whose intent is not registered
    /// to any command. Never fatal.
    fn on_unknown_intent(&mut self, intent: u16, payload: &[u8]);
}

/// Drives one connection's registration handshake and command dispatch.
///
/// Holds no transport or buffer of its own; [`crate::connection::Connection`]
/// owns those and feeds this engine whole frames as the
/// [`crate::core::PacketBuffer`] produces them.
#[derive(Debug)]
pub struct ProtocolEngine {
    state: ConnectionState,
    registry: SchemaRegistry,
}

impl ProtocolEngine {
    /// Creates an engine in the `Connecting` state.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            registry: SchemaRegistry::new(),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The registered device-command schemas for this connection.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Transitions out of `Connecting`, returning the registration probe
    /// frame the caller must write to the transport.
    pub fn connect(&mut self) -> Frame {
        self.state = ConnectionState::AwaitingRegistration;
        Frame::new(PROTOCOL_VERSION, 0, INTENT_REQUEST_REGISTRATION, Vec::new())
            .expect("empty payload never exceeds the wire limit")
    }

    /// Processes one frame popped from the connection's buffer, dispatching
    /// to `observer` as appropriate.
    ///
    /// A decode failure on an individual frame (`DeserializationError`) is
    /// reported as an `Err` for the caller to log; it never changes
    /// connection state except when it occurs during registration, which is
    /// structural and terminates the connection.
    pub fn handle_frame(
        &mut self,
        frame: Frame,
        observer: &mut impl GatewayObserver,
    ) -> Result<()> {
        match self.state {
            ConnectionState::Connecting => Ok(()),
            ConnectionState::AwaitingRegistration => {
                if frame.intent != INTENT_REGISTER {
                    return Ok(());
                }
                let registration = decode_device_registration(&frame.payload)?;
                self.registry.register_commands(&registration.commands)?;
                self.state = ConnectionState::Operational;
                observer.on_registered(&registration);
                Ok(())
            }
            ConnectionState::Operational => {
                match self.registry.decode_command(frame.intent, &frame.payload)? {
                    Some((name, params)) => {
                        observer.on_command(&name, params, frame.intent);
                    }
                    None => {
                        observer.on_unknown_intent(frame.intent, &frame.payload);
                    }
                }
                Ok(())
            }
            ConnectionState::Closed => Err(Error::ConnectionClosed),
        }
    }

    /// Builds a raw-payload frame for `send_notification`.
    pub fn build_notification(&self, intent: u16, payload: Vec<u8>) -> Result<Frame> {
        Frame::new(PROTOCOL_VERSION, 0, intent, payload)
    }

    /// Builds the frame reporting a command's result back upstream.
    pub fn build_command_result(&self, payload: Vec<u8>) -> Result<Frame> {
        Frame::new(PROTOCOL_VERSION, 0, INTENT_NOTIFY_COMMAND_RESULT, payload)
    }

    /// Marks the connection closed; further frames are rejected.
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }
}

impl Default for ProtocolEngine {
    fn default() -> Self {
        Self::new()
    }
}
