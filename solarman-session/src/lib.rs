//! Session layer module for the SolarMan V5 protocol
//!
//! This crate provides the outer envelope ("V5 frame") codec, the request
//! sequence generator and the session that owns one transport and performs
//! timed write-then-read round trips over it.

pub mod frame;
pub mod meta;
pub mod sequence;
pub mod session;
pub mod state;
pub mod statistics;

pub use frame::{expected_frame_len, V5Frame, FRAME_OVERHEAD};
pub use meta::FrameMeta;
pub use sequence::SequenceGenerator;
pub use session::{hex_dump, V5Session, READ_CHUNK_SIZE};
pub use solarman_core::{SolarmanError, SolarmanResult};
pub use state::ConnectionState;
pub use statistics::SessionStatistics;
