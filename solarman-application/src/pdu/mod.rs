//! Register payloads
//!
//! Every payload starts with a logger header and carries one Modbus RTU frame:
//!
//! ```text
//! request:  frame type(1) sensor(2 LE) delivery(4 LE) power on(4 LE) offset(4 LE) | modbus
//! response: frame type(1) status(1)    delivery(4 LE) power on(4 LE) offset(4 LE) | modbus
//! ```
//!
//! Modbus fields are big-endian except the CRC16, which is sent low byte first.

pub mod header;
pub mod read;
pub mod write;

pub use header::{PayloadHeader, ResponseHeader};
pub use read::{ReadRequest, ReadResponse, MAX_READ_REGISTERS};
pub use write::{WriteRequest, WriteResponse, MAX_WRITE_REGISTERS};

/// Modbus slave address of the inverter behind the logger
pub const DEVICE_ADDRESS: u8 = 0x01;

/// Read Holding Registers
pub(crate) const FUNCTION_READ: u8 = 0x03;

/// Write Multiple Registers
pub(crate) const FUNCTION_WRITE: u8 = 0x10;

/// Set on the function code of an exception reply
pub(crate) const EXCEPTION_FLAG: u8 = 0x80;
