//! Core types and utilities for the SolarMan V5 protocol
//!
//! This crate provides the error taxonomy shared by every layer of the stack,
//! the checksum primitives used by the envelope and the register payload, and
//! the small register conversions built on top of raw register values.

pub mod checksum;
pub mod datetime;
pub mod error;
pub mod reader;
pub mod register;

pub use checksum::{checksum8, crc16_modbus, Crc16};
pub use datetime::{date_time_to_registers, registers_to_date_time, DATE_TIME_REGISTERS};
pub use error::{FailureKind, SolarmanError, SolarmanResult};
pub use reader::ByteReader;
pub use register::{signed_to_float, RegisterMap};
