//! Adapts an async serial port onto the synchronous [`gwproto::Transport`]
//! seam.
//!
//! `Connection::poll` is written against blocking `read`/`write` calls, the
//! same suspension points the protocol's concurrency model names as the
//! only ones allowed to block. `tokio_serial::SerialStream` is async, so
//! each call here steps out to the surrounding multi-thread runtime with
//! `block_in_place` rather than threading async/await through the core
//! crate.

use gwproto::error::{Error, Result};
use gwproto::Transport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialStream;

pub struct SerialTransport {
    inner: SerialStream,
}

impl SerialTransport {
    pub fn new(inner: SerialStream) -> Self {
        Self { inner }
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(self.inner.read(buf))
                .map_err(|_| Error::ConnectionClosed)
        })
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(self.inner.write(buf))
                .map_err(|_| Error::ConnectionClosed)
        })
    }

    fn flush(&mut self) -> Result<()> {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(self.inner.flush())
                .map_err(|_| Error::ConnectionClosed)
        })
    }
}
