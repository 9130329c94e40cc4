//! Write Multiple Registers (0x10)

use super::header::PayloadHeader;
use super::{DEVICE_ADDRESS, FUNCTION_WRITE};
use bytes::{BufMut, BytesMut};
use solarman_core::{crc16_modbus, ByteReader, Crc16, SolarmanError, SolarmanResult};

/// Most registers a single 0x10 request may carry
pub const MAX_WRITE_REGISTERS: usize = 123;

/// Address, function, start, quantity, CRC
const CONFIRMATION_LENGTH: usize = 8;

/// Register write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    header: PayloadHeader,
    start: u16,
    values: Vec<u16>,
}

impl WriteRequest {
    /// Create a request writing `values` to consecutive registers from `start`
    ///
    /// # Errors
    /// Returns `InvalidData` if `values` is empty, longer than 123, or runs
    /// past register 0xFFFF
    pub fn new(start: u16, values: &[u16]) -> SolarmanResult<Self> {
        if values.is_empty() || values.len() > MAX_WRITE_REGISTERS {
            return Err(SolarmanError::InvalidData(format!(
                "Register quantity must be 1..={}, got {}",
                MAX_WRITE_REGISTERS,
                values.len()
            )));
        }
        if usize::from(start) + values.len() > 0x1_0000 {
            return Err(SolarmanError::InvalidData(format!(
                "Writing {} registers from 0x{:04X} runs past the register space",
                values.len(),
                start
            )));
        }
        Ok(Self {
            header: PayloadHeader::default(),
            start,
            values: values.to_vec(),
        })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// Encode header and Modbus request
    pub fn encode(&self) -> Vec<u8> {
        let quantity = self.values.len();
        let mut buf = BytesMut::with_capacity(PayloadHeader::LENGTH + 9 + quantity * 2);
        self.header.encode(&mut buf);

        let body_start = buf.len();
        buf.put_u8(DEVICE_ADDRESS);
        buf.put_u8(FUNCTION_WRITE);
        buf.put_u16(self.start);
        // Bounded by MAX_WRITE_REGISTERS in new()
        buf.put_u16(quantity as u16);
        buf.put_u8((quantity * 2) as u8);
        for value in &self.values {
            buf.put_u16(*value);
        }
        let mut crc = Crc16::new();
        crc.update_bytes(&buf[body_start..]);
        buf.put_slice(&crc.to_le_bytes());

        buf.to_vec()
    }
}

/// Register write confirmation
pub struct WriteResponse;

impl WriteResponse {
    /// Locate the Modbus confirmation inside a response payload
    ///
    /// Loggers do not agree on the header preceding the confirmation, so the
    /// payload is scanned for `01 10` pairs. The first pair followed by a
    /// confirmation with a valid CRC wins. When none validates, the first
    /// pair is decoded anyway and the CRC mismatch is logged.
    ///
    /// # Returns
    /// `(bytes written, start register)`
    pub fn parse(payload: &[u8], expected_count: usize) -> SolarmanResult<(usize, u16)> {
        let marker = [DEVICE_ADDRESS, FUNCTION_WRITE];
        let mut candidates = payload
            .windows(marker.len())
            .enumerate()
            .filter(|(_, pair)| *pair == marker)
            .map(|(offset, _)| offset);

        let first = candidates
            .next()
            .ok_or(SolarmanError::ModbusResponseNotFound)?;
        let offset = std::iter::once(first)
            .chain(candidates)
            .find(|&offset| crc_valid(&payload[offset..]))
            .unwrap_or(first);

        let mut reader = ByteReader::new(&payload[offset..]);
        let confirmation = reader.take("write confirmation", CONFIRMATION_LENGTH)?;

        let mut fields = ByteReader::new(confirmation);
        let address = fields.u8("device address")?;
        let function = fields.u8("function code")?;
        let start = fields.u16_be("start register")?;
        let quantity = fields.u16_be("quantity")? as usize;
        let crc = fields.u16_le("crc")?;

        if address != DEVICE_ADDRESS || function != FUNCTION_WRITE {
            return Err(SolarmanError::UnexpectedFunction { address, function });
        }
        if quantity != expected_count {
            return Err(SolarmanError::QuantityMismatch {
                expected: expected_count,
                actual: quantity,
            });
        }

        let expected_crc = crc16_modbus(&confirmation[..CONFIRMATION_LENGTH - 2]);
        if crc != expected_crc {
            log::warn!(
                "write confirmation CRC mismatch: expected 0x{:04X}, got 0x{:04X}",
                expected_crc,
                crc
            );
        }

        Ok((quantity * 2, start))
    }
}

/// True when `candidate` opens with a confirmation whose CRC checks out
fn crc_valid(candidate: &[u8]) -> bool {
    candidate.len() >= CONFIRMATION_LENGTH
        && crc16_modbus(&candidate[..CONFIRMATION_LENGTH - 2]).to_le_bytes()
            == candidate[CONFIRMATION_LENGTH - 2..CONFIRMATION_LENGTH]
}
