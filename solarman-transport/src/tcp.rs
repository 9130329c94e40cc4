//! TCP transport implementation

use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use solarman_core::{SolarmanError, SolarmanResult};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Conventional SolarMan V5 data logger port
pub const DEFAULT_PORT: u16 = 8899;

/// Idle time before TCP starts sending keep-alives
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(30);

/// Wrapper for TcpStream that implements Debug
struct DebugTcpStream(TcpStream);

impl fmt::Debug for DebugTcpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpStream")
            .field("peer", &self.0.peer_addr().ok())
            .finish()
    }
}

impl Deref for DebugTcpStream {
    type Target = TcpStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugTcpStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    /// Logger address as "host:port"
    pub address: String,
    /// Deadline for connect and for every single read or write
    pub timeout: Option<Duration>,
    /// Keep-alive idle time, None disables keep-alive
    pub keepalive: Option<Duration>,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl TcpSettings {
    /// Create new TCP settings
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: Some(Duration::from_secs(30)),
            keepalive: Some(DEFAULT_KEEPALIVE),
            nodelay: true,
        }
    }

    /// Create TCP settings with timeout
    pub fn with_timeout(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new(address)
        }
    }
}

/// TCP transport layer implementation
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<DebugTcpStream>,
    settings: TcpSettings,
    closed: bool,
}

impl TcpTransport {
    /// Create a new TCP transport layer
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create TCP transport from address string
    ///
    /// A bare host gets the conventional logger port appended.
    pub fn from_address(address: &str) -> SolarmanResult<Self> {
        if address.trim().is_empty() {
            return Err(SolarmanError::InvalidData(
                "Logger address must not be empty".to_string(),
            ));
        }
        let address = if address.parse::<SocketAddr>().is_ok() || address.contains(':') {
            address.to_string()
        } else {
            format!("{}:{}", address, DEFAULT_PORT)
        };
        Ok(Self::new(TcpSettings::new(address)))
    }

    /// Current settings
    pub fn settings(&self) -> &TcpSettings {
        &self.settings
    }

    fn configure_socket(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.settings.nodelay)?;
        if let Some(idle) = self.settings.keepalive {
            let keepalive = TcpKeepalive::new().with_time(idle);
            SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
        }
        Ok(())
    }

    fn stream_mut(&mut self, stage: &'static str) -> SolarmanResult<&mut DebugTcpStream> {
        self.stream.as_mut().ok_or_else(|| {
            SolarmanError::transport(
                stage,
                io::Error::new(io::ErrorKind::NotConnected, "TCP stream not connected"),
            )
        })
    }
}

/// Read once from `stream`, bounded by `timeout`
pub(crate) async fn read_with_deadline<S>(
    stream: &mut S,
    buf: &mut [u8],
    timeout: Option<Duration>,
) -> SolarmanResult<usize>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let result = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| deadline_elapsed("read"))?,
        None => stream.read(buf).await,
    };
    result.map_err(|e| SolarmanError::transport("read", e))
}

/// Write once to `stream`, bounded by `timeout`
pub(crate) async fn write_with_deadline<S>(
    stream: &mut S,
    buf: &[u8],
    timeout: Option<Duration>,
) -> SolarmanResult<usize>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let result = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, stream.write(buf))
            .await
            .map_err(|_| deadline_elapsed("write"))?,
        None => stream.write(buf).await,
    };
    result.map_err(|e| SolarmanError::transport("write", e))
}

fn deadline_elapsed(stage: &'static str) -> SolarmanError {
    SolarmanError::transport(
        stage,
        io::Error::new(io::ErrorKind::TimedOut, format!("{} deadline elapsed", stage)),
    )
}

#[async_trait]
impl TransportLayer for TcpTransport {
    async fn open(&mut self) -> SolarmanResult<()> {
        if !self.closed {
            return Ok(());
        }

        let address = self.settings.address.clone();
        let connect_failed = |source: io::Error| SolarmanError::Connect {
            address: address.clone(),
            source,
        };

        // Apply timeout to connection establishment if specified
        let stream = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, TcpStream::connect(address.as_str()))
                .await
                .map_err(|_| {
                    connect_failed(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "connect deadline elapsed",
                    ))
                })?
                .map_err(connect_failed)?
        } else {
            TcpStream::connect(address.as_str())
                .await
                .map_err(connect_failed)?
        };

        if let Err(e) = self.configure_socket(&stream) {
            log::warn!("Failed to configure socket for {}: {}", address, e);
        }

        self.stream = Some(DebugTcpStream(stream));
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for TcpTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SolarmanResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> SolarmanResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut("read")?;

        match read_with_deadline(&mut stream.0, buf, timeout).await {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> SolarmanResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut("write")?;

        let result = write_with_deadline(&mut stream.0, buf, timeout).await;
        if result.is_err() {
            self.closed = true;
        }
        result
    }

    async fn flush(&mut self) -> SolarmanResult<()> {
        let stream = self.stream_mut("write")?;
        stream
            .flush()
            .await
            .map_err(|e| SolarmanError::transport("write", e))
    }

    fn endpoints(&self) -> Option<(SocketAddr, SocketAddr)> {
        let stream = self.stream.as_ref()?;
        Some((stream.local_addr().ok()?, stream.peer_addr().ok()?))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> SolarmanResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.closed = true;
        Ok(())
    }
}
