//! SolarMan V5 client implementation
//!
//! This crate provides [`InverterLogger`], a session with one Wi-Fi data
//! logger that reads and writes inverter holding registers, and
//! [`LoggerBuilder`] for configuring it.

pub mod logger;

pub use logger::{InverterLogger, LoggerBuilder, LoggerConfig, DEFAULT_TIMEOUT_SECS};
pub use solarman_core::{signed_to_float, RegisterMap, SolarmanError, SolarmanResult};
pub use solarman_session::{ConnectionState, FrameMeta, SessionStatistics};
