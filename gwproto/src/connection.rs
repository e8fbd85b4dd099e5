//! Owns one connection's buffer and protocol engine, and drives bytes
//! between a [`Transport`] and a [`GatewayObserver`].
//!
//! Per the single-threaded cooperative model, one `Connection` corresponds
//! to exactly one device on the wire; nothing here is shared across
//! connections, so no locking is needed.

use crate::config::GatewayLimits;
use crate::core::PacketBuffer;
use crate::error::{Error, Result};
use crate::protocol::{ConnectionState, GatewayObserver, ProtocolEngine};
use crate::transport::Transport;

/// Drives the registration handshake and command dispatch for one device
/// connection, against any [`Transport`].
pub struct Connection<T: Transport> {
    transport: T,
    buffer: PacketBuffer,
    engine: ProtocolEngine,
}

impl<T: Transport> Connection<T> {
    /// Creates a connection over `transport`, not yet started.
    pub fn new(transport: T, limits: GatewayLimits) -> Self {
        Self {
            transport,
            buffer: PacketBuffer::new(limits),
            engine: ProtocolEngine::new(),
        }
    }

    /// Current handshake/dispatch state.
    pub fn state(&self) -> ConnectionState {
        self.engine.state()
    }

    /// Sends the registration probe and moves the engine to
    /// `AwaitingRegistration`. Call once, right after the transport
    /// connects.
    pub fn connect(&mut self) -> Result<()> {
        let probe = self.engine.connect();
        self.transport.write_all(&probe.encode())
    }

    /// Reads whatever bytes are currently available from the transport,
    /// appends them to the buffer, and processes every complete frame that
    /// results.
    ///
    /// A per-frame `InvalidCRC`/`InvalidSignature`/`DeserializationError` is
    /// logged and the loop continues with the next frame; it is never fatal
    /// to the connection. An `UnsupportedSchema` surfacing from
    /// registration, or a `BufferOverflow` from the buffer itself, is fatal:
    /// the connection is closed and the error returned.
    pub fn poll(&mut self, observer: &mut impl GatewayObserver) -> Result<()> {
        let mut chunk = [0u8; 4096];
        loop {
            let n = self.transport.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            self.feed(&chunk[..n], observer)?;
        }
    }

    /// Feeds bytes already read from the transport into the connection.
    /// Exposed directly so tests and non-blocking transports can drive the
    /// connection without a `read` call.
    pub fn feed(&mut self, bytes: &[u8], observer: &mut impl GatewayObserver) -> Result<()> {
        if let Err(e) = self.buffer.append(bytes) {
            self.engine.close();
            log::error!("packet buffer overflowed, closing connection: {e}");
            return Err(e);
        }

        while self.buffer.has_frame() {
            match self.buffer.pop_frame() {
                Ok(Some(frame)) => {
                    let intent = frame.intent;
                    if let Err(e) = self.engine.handle_frame(frame, observer) {
                        match e {
                            Error::UnsupportedSchema => {
                                log::error!(
                                    "device declared an unsupported dynamic schema, closing connection"
                                );
                                self.engine.close();
                                return Err(e);
                            }
                            Error::DeserializationError | Error::InvalidEncoding => {
                                log::warn!(
                                    "dropping undecodable frame for intent {intent}: {e}"
                                );
                            }
                            other => return Err(other),
                        }
                    } else if self.engine.state() == ConnectionState::Operational {
                        log::info!("registration complete, connection is now operational");
                    }
                }
                Ok(None) => break,
                Err(e @ (Error::InvalidCRC | Error::InvalidSignature)) => {
                    log::warn!("dropping frame that failed to decode: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Reports a transport-level disconnect; drops the buffer and marks the
    /// connection closed.
    pub fn closed(&mut self, reason: &str) {
        log::info!("connection closed: {reason}");
        self.buffer.clear();
        self.engine.close();
    }

    /// Sends a raw payload under `intent`.
    pub fn send_notification(&mut self, intent: u16, payload: Vec<u8>) -> Result<()> {
        let frame = self.engine.build_notification(intent, payload)?;
        self.transport.write_all(&frame.encode())
    }

    /// Encodes `fields` against `schema` and sends the result as the
    /// command-result intent.
    pub fn send_record(
        &mut self,
        fields: &std::collections::HashMap<String, crate::codec::Value>,
        schema: &crate::codec::Schema,
    ) -> Result<()> {
        let mut payload = Vec::new();
        crate::codec::encode_record(fields, schema, &mut payload)?;
        let frame = self.engine.build_command_result(payload)?;
        self.transport.write_all(&frame.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;
    use crate::registry::DeviceRegistration;
    use crate::transport::LoopbackTransport;
    use std::collections::HashMap;
    use std::str::FromStr;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingObserver {
        registered: bool,
        commands: Vec<(String, HashMap<String, Value>, u16)>,
    }

    impl GatewayObserver for RecordingObserver {
        fn on_registered(&mut self, _registration: &DeviceRegistration) {
            self.registered = true;
        }
        fn on_command(&mut self, name: &str, params: HashMap<String, Value>, intent: u16) {
            self.commands.push((name.to_string(), params, intent));
        }
        fn on_unknown_intent(&mut self, _intent: u16, _payload: &[u8]) {}
    }

    fn registration_frame_bytes() -> Vec<u8> {
        use crate::codec::encode_record;
        use crate::config::{INTENT_REGISTER, PROTOCOL_VERSION};
        use crate::core::Frame;
        use crate::registry::registration_schema;

        let mut fields = HashMap::new();
        fields.insert(
            "device_id".to_string(),
            Value::Guid(Uuid::from_str("fa8a9d6e-6555-11e2-89b8-e0cb4eb92129").unwrap()),
        );
        fields.insert("device_key".to_string(), Value::String("key".to_string()));
        fields.insert(
            "device_name".to_string(),
            Value::String("thermostat".to_string()),
        );
        fields.insert(
            "device_class_name".to_string(),
            Value::String("Thermostat".to_string()),
        );
        fields.insert(
            "device_class_version".to_string(),
            Value::String("1.0".to_string()),
        );
        fields.insert("equipment".to_string(), Value::Array(vec![]));
        fields.insert("notifications".to_string(), Value::Array(vec![]));

        let mut param1 = HashMap::new();
        param1.insert("type".to_string(), Value::Byte(2));
        param1.insert("name".to_string(), Value::String("p1".to_string()));
        let mut param2 = HashMap::new();
        param2.insert("type".to_string(), Value::Byte(1));
        param2.insert("name".to_string(), Value::String("p2".to_string()));

        let mut command = HashMap::new();
        command.insert("intent".to_string(), Value::Word(100));
        command.insert("name".to_string(), Value::String("Ping".to_string()));
        command.insert(
            "parameters".to_string(),
            Value::Array(vec![Value::Record(param1), Value::Record(param2)]),
        );
        fields.insert(
            "commands".to_string(),
            Value::Array(vec![Value::Record(command)]),
        );

        let mut payload = Vec::new();
        encode_record(&fields, &registration_schema(), &mut payload).unwrap();
        Frame::new(PROTOCOL_VERSION, 0, INTENT_REGISTER, payload)
            .unwrap()
            .encode()
    }

    #[test]
    fn connect_writes_registration_probe_to_transport() {
        let mut conn = Connection::new(LoopbackTransport::new(), GatewayLimits::new());
        conn.connect().unwrap();
        assert_eq!(conn.state(), ConnectionState::AwaitingRegistration);
    }

    #[test]
    fn full_handshake_then_command_dispatch_end_to_end() {
        let mut conn = Connection::new(LoopbackTransport::new(), GatewayLimits::new());
        conn.connect().unwrap();

        let mut observer = RecordingObserver::default();
        conn.feed(&registration_frame_bytes(), &mut observer).unwrap();
        assert!(observer.registered);
        assert_eq!(conn.state(), ConnectionState::Operational);

        use crate::config::PROTOCOL_VERSION;
        use crate::core::Frame;
        let command_bytes = Frame::new(PROTOCOL_VERSION, 0, 100, vec![0xCD, 0xAB, 0xFF])
            .unwrap()
            .encode();
        conn.feed(&command_bytes, &mut observer).unwrap();

        assert_eq!(observer.commands.len(), 1);
        assert_eq!(observer.commands[0].0, "Ping");
    }

    #[test]
    fn buffer_overflow_closes_the_connection() {
        let limits = GatewayLimits::new().with_buffer_ceiling(4);
        let mut conn = Connection::new(LoopbackTransport::new(), limits);
        let mut observer = RecordingObserver::default();
        let err = conn
            .feed(&[0xC5, 0xC3, 0x00, 0x00, 0x00], &mut observer)
            .unwrap_err();
        assert_eq!(err, Error::BufferOverflow);
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn closed_clears_buffer_and_marks_state() {
        let mut conn = Connection::new(LoopbackTransport::new(), GatewayLimits::new());
        conn.closed("transport hung up");
        assert_eq!(conn.state(), ConnectionState::Closed);
    }
}
