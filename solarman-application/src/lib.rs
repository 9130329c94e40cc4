//! Application layer module for the SolarMan V5 protocol
//!
//! This crate provides the payloads carried inside V5 envelopes: the logger
//! header followed by a Modbus RTU register read (0x03) or write (0x10).

pub mod pdu;

pub use pdu::{
    PayloadHeader, ReadRequest, ReadResponse, ResponseHeader, WriteRequest, WriteResponse,
    DEVICE_ADDRESS, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS,
};
pub use solarman_core::{SolarmanError, SolarmanResult};
