//! solarman_rs - Rust client for SolarMan V5 data loggers
//!
//! SolarMan Wi-Fi sticks (Deye, Sofar, Afore and other rebranded inverters)
//! tunnel Modbus RTU register access through the proprietary V5 envelope on
//! TCP port 8899.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `solarman-core`: Error type, checksum/CRC, register and clock helpers
//! - `solarman-transport`: Transport layer (TCP)
//! - `solarman-session`: Session layer (V5 envelope, sequencing, round trips)
//! - `solarman-application`: Application layer (register read/write payloads)
//! - `solarman-client`: Client implementation
//!
//! # Usage
//!
//! ```no_run
//! use solarman::client::InverterLogger;
//!
//! # async fn run() -> solarman::SolarmanResult<()> {
//! let logger = InverterLogger::init("192.168.1.18", 2_900_000_000, 10)?;
//! let registers = logger.read(0x6D, 3).await?;
//! for (address, value) in &registers {
//!     println!("{:#06x} = {}", address, value);
//! }
//! let clock = logger.get_date_time(22).await?;
//! println!("inverter clock: {}", clock);
//! logger.close().await?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use solarman_core::{
    date_time_to_registers, registers_to_date_time, signed_to_float, FailureKind, RegisterMap,
    SolarmanError, SolarmanResult,
};

// Re-export client API
pub mod client {
    pub use solarman_client::*;
}

// Re-export protocol layers
pub mod transport {
    pub use solarman_transport::*;
}

pub mod session {
    pub use solarman_session::*;
}

pub mod application {
    pub use solarman_application::*;
}
