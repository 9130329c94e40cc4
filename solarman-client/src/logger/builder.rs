//! Logger builder
//!
//! ```rust,no_run
//! use solarman_client::LoggerBuilder;
//! use std::time::Duration;
//!
//! let logger = LoggerBuilder::new()
//!     .address("192.168.1.18:8899")
//!     .serial_number(2_900_000_000)
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//! # Ok::<(), solarman_client::SolarmanError>(())
//! ```

use super::InverterLogger;
use serde::{Deserialize, Serialize};
use solarman_core::{SolarmanError, SolarmanResult};
use solarman_session::{FrameMeta, V5Session};
use solarman_transport::{TcpTransport, TransportLayer};
use std::time::Duration;

/// Timeout applied when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

/// Timeouts appear in config files as fractional seconds
mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(timeout.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Logger configuration, as embedded in an application's config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// "host" or "host:port"; port 8899 when omitted
    pub address: String,
    /// Serial number printed on the data logger stick
    pub serial_number: u32,
    /// Deadline for connect and for each write and read
    #[serde(rename = "timeout_secs", default = "default_timeout", with = "secs_f64")]
    pub timeout: Duration,
    #[serde(default)]
    pub meta: FrameMeta,
    #[serde(default)]
    pub debug: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            serial_number: 0,
            timeout: default_timeout(),
            meta: FrameMeta::default(),
            debug: false,
        }
    }
}

/// Builder for [`InverterLogger`]
#[derive(Debug, Clone, Default)]
pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration
    pub fn from_config(config: LoggerConfig) -> Self {
        Self { config }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn serial_number(mut self, serial_number: u32) -> Self {
        self.config.serial_number = serial_number;
        self
    }

    /// Deadline for connect and for each write and read
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn meta(mut self, meta: FrameMeta) -> Self {
        self.config.meta = meta;
        self
    }

    /// Log connection events and frame hex dumps at debug level
    pub fn debug(mut self, enable: bool) -> Self {
        self.config.debug = enable;
        self
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Build a logger talking TCP to the configured address
    ///
    /// # Errors
    /// Returns `InvalidData` if no address is set or the timeout is zero
    pub fn build(self) -> SolarmanResult<InverterLogger<TcpTransport>> {
        let transport = TcpTransport::from_address(&self.config.address)?;
        self.build_with_transport(transport)
    }

    /// Build a logger over a caller-supplied transport
    pub fn build_with_transport<T: TransportLayer>(
        self,
        transport: T,
    ) -> SolarmanResult<InverterLogger<T>> {
        if self.config.timeout.is_zero() {
            return Err(SolarmanError::InvalidData(
                "Logger timeout must be non-zero".to_string(),
            ));
        }

        let mut session = V5Session::new(transport, self.config.serial_number, self.config.timeout);
        session.set_meta(self.config.meta);
        session.set_debug(self.config.debug);

        Ok(InverterLogger::from_session(session))
    }
}
