//! Logger session management

pub mod builder;
pub mod inverter_logger;

#[cfg(test)]
pub(crate) mod mock;

pub use builder::{LoggerBuilder, LoggerConfig, DEFAULT_TIMEOUT_SECS};
pub use inverter_logger::InverterLogger;
