//! Transport layer module for the SolarMan V5 protocol
//!
//! This crate provides the stream abstraction used by the session layer and
//! its TCP implementation.

pub mod stream;
pub mod tcp;

pub use solarman_core::{SolarmanError, SolarmanResult};
pub use stream::{StreamAccessor, TransportLayer};
pub use tcp::{TcpSettings, TcpTransport, DEFAULT_KEEPALIVE, DEFAULT_PORT};
