//! Read Holding Registers (0x03)

use super::header::{PayloadHeader, ResponseHeader};
use super::{DEVICE_ADDRESS, EXCEPTION_FLAG, FUNCTION_READ};
use bytes::{BufMut, BytesMut};
use solarman_core::{crc16_modbus, ByteReader, Crc16, RegisterMap, SolarmanError, SolarmanResult};

/// Most registers a single 0x03 request may ask for
pub const MAX_READ_REGISTERS: u16 = 125;

/// Bytes a logger appends after the Modbus CRC
const TRAILER_LENGTH: usize = 2;

/// Register read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    header: PayloadHeader,
    start: u16,
    count: u16,
}

impl ReadRequest {
    /// Create a request for `count` registers from `start`
    ///
    /// # Errors
    /// Returns `InvalidData` if `count` is 0, above 125, or runs past register 0xFFFF
    pub fn new(start: u16, count: u16) -> SolarmanResult<Self> {
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(SolarmanError::InvalidData(format!(
                "Register count must be 1..={}, got {}",
                MAX_READ_REGISTERS, count
            )));
        }
        if u32::from(start) + u32::from(count) > 0x1_0000 {
            return Err(SolarmanError::InvalidData(format!(
                "Reading {} registers from 0x{:04X} runs past the register space",
                count, start
            )));
        }
        Ok(Self {
            header: PayloadHeader::default(),
            start,
            count,
        })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    /// Encode header and Modbus request
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(PayloadHeader::LENGTH + 8);
        self.header.encode(&mut buf);

        let body_start = buf.len();
        buf.put_u8(DEVICE_ADDRESS);
        buf.put_u8(FUNCTION_READ);
        buf.put_u16(self.start);
        buf.put_u16(self.count);
        let mut crc = Crc16::new();
        crc.update_bytes(&buf[body_start..]);
        buf.put_slice(&crc.to_le_bytes());

        buf.to_vec()
    }
}

/// Register read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    header: ResponseHeader,
    device_address: u8,
    function_code: u8,
    data: Vec<u8>,
}

impl ReadResponse {
    /// Decode a response payload
    ///
    /// The Modbus CRC is verified over address through data. Exactly two
    /// trailer bytes must follow it; their content is ignored.
    pub fn decode(payload: &[u8]) -> SolarmanResult<Self> {
        let mut reader = ByteReader::new(payload);
        let header = ResponseHeader::decode(&mut reader)?;

        let body_start = reader.position();
        let device_address = reader.u8("device address")?;
        let function_code = reader.u8("function code")?;

        if function_code & EXCEPTION_FLAG != 0 {
            let code = reader.u8("exception code")?;
            let body_end = reader.position();
            check_crc(&mut reader, &payload[body_start..body_end])?;
            return Err(SolarmanError::ModbusException {
                function: function_code,
                code,
            });
        }

        let length = reader.u8("value length")? as usize;
        let data = reader.take("register data", length)?.to_vec();
        let body_end = reader.position();
        check_crc(&mut reader, &payload[body_start..body_end])?;

        reader.take("trailer", TRAILER_LENGTH)?;
        if reader.remaining() != 0 {
            return Err(SolarmanError::TrailingData(reader.remaining()));
        }

        Ok(Self {
            header,
            device_address,
            function_code,
            data,
        })
    }

    pub fn header(&self) -> &ResponseHeader {
        &self.header
    }

    pub fn device_address(&self) -> u8 {
        self.device_address
    }

    pub fn function_code(&self) -> u8 {
        self.function_code
    }

    /// Raw register bytes, big-endian pairs
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Map `count` registers to consecutive addresses from `start`
    ///
    /// # Errors
    /// Returns `Truncated` if fewer than `count * 2` data bytes arrived
    pub fn into_registers(self, start: u16, count: u16) -> SolarmanResult<RegisterMap> {
        let needed = count as usize * 2;
        if self.data.len() < needed {
            return Err(SolarmanError::Truncated {
                field: "register data",
                needed,
                available: self.data.len(),
            });
        }

        Ok(self.data[..needed]
            .chunks_exact(2)
            .enumerate()
            .map(|(i, pair)| {
                (
                    start.wrapping_add(i as u16),
                    u16::from_be_bytes([pair[0], pair[1]]),
                )
            })
            .collect())
    }
}

/// Read the CRC following `covered` and verify it
fn check_crc(reader: &mut ByteReader<'_>, covered: &[u8]) -> SolarmanResult<()> {
    let expected = crc16_modbus(covered);
    let actual = reader.u16_le("crc")?;
    if actual != expected {
        return Err(SolarmanError::CrcMismatch { expected, actual });
    }
    Ok(())
}
