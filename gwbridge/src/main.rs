//! Serial-port bridge: opens a device's serial link, drives one
//! `gwproto::Connection` over it, and logs every registration and command
//! it sees.

mod serial;

use clap::Parser;
use gwproto::{ConnectionState, Connection, DeviceRegistration, GatewayObserver};
use gwproto::config::GatewayLimits;
use gwproto::codec::Value;
use std::collections::HashMap;

use serial::SerialTransport;

/// Bridges a serial-attached device into the gateway protocol.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the serial device, e.g. /dev/ttyUSB0.
    #[arg(long)]
    port: String,

    /// Baud rate to configure the port at.
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Maximum bytes the packet buffer may hold before it is treated as
    /// abuse and cleared.
    #[arg(long, default_value_t = 128 * 1024)]
    buffer_ceiling: usize,
}

struct LoggingObserver;

impl GatewayObserver for LoggingObserver {
    fn on_registered(&mut self, registration: &DeviceRegistration) {
        log::info!(
            "device registered: name={} class={} id={} commands={}",
            registration.device_name,
            registration.device_class_name,
            registration.device_id,
            registration.commands.len(),
        );
    }

    fn on_command(&mut self, name: &str, params: HashMap<String, Value>, intent: u16) {
        log::info!("command received: name={name} intent={intent} params={params:?}");
    }

    fn on_unknown_intent(&mut self, intent: u16, payload: &[u8]) {
        log::warn!("unknown intent {intent}, {} byte payload", payload.len());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let port = tokio_serial::new(cli.port.as_str(), cli.baud).open_native_async()?;
    let transport = SerialTransport::new(port);

    let limits = GatewayLimits::new().with_buffer_ceiling(cli.buffer_ceiling);
    let mut connection = Connection::new(transport, limits);
    let mut observer = LoggingObserver;

    connection.connect()?;
    log::info!("registration probe sent on {}", cli.port);

    loop {
        connection.poll(&mut observer)?;
        if connection.state() == ConnectionState::Closed {
            break;
        }
        tokio::task::yield_now().await;
    }

    Ok(())
}
