//! Stream accessor trait for transport layer

use async_trait::async_trait;
use solarman_core::{SolarmanError, SolarmanResult};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Stream accessor interface to access a physical stream to a data logger
#[async_trait]
pub trait StreamAccessor: Send {
    /// Set the per-operation deadline
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SolarmanResult<()>;

    /// Read data from the stream
    ///
    /// Each call is bounded by its own deadline, started when the call begins.
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> SolarmanResult<usize>;

    /// Write data to the stream
    ///
    /// # Returns
    ///
    /// Number of bytes written
    async fn write(&mut self, buf: &[u8]) -> SolarmanResult<usize>;

    /// Write all data to the stream
    async fn write_all(&mut self, buf: &[u8]) -> SolarmanResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(SolarmanError::transport(
                    "write",
                    io::Error::new(io::ErrorKind::WriteZero, "failed to write all data"),
                ));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered data
    async fn flush(&mut self) -> SolarmanResult<()>;

    /// Local and remote socket addresses, if the stream is a socket
    fn endpoints(&self) -> Option<(SocketAddr, SocketAddr)> {
        None
    }

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> SolarmanResult<()>;
}

/// Transport layer trait that extends StreamAccessor
///
/// A transport may be opened again after it has been closed; the session
/// relies on this to reconnect lazily after a failure.
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical layer connection
    async fn open(&mut self) -> SolarmanResult<()>;
}
