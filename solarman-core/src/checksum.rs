//! Checksums used on the SolarMan V5 wire
//!
//! Two independent checks protect every exchange:
//! - the envelope carries an 8-bit additive checksum over everything between
//!   the start marker and the checksum byte
//! - the register command inside the payload carries a Modbus CRC16,
//!   appended little-endian

/// CRC16 constants
const INITIAL_CRC: u16 = 0xFFFF;
const POLY: u16 = 0xA001; // Bit-reversed 0x8005

/// Precomputed CRC16 table
static CRC_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for b in 0..=0xFF {
        let mut v = b as u16;
        for _ in 0..8 {
            if (v & 1) == 1 {
                v = (v >> 1) ^ POLY;
            } else {
                v >>= 1;
            }
        }
        table[b as usize] = v;
    }
    table
});

/// 8-bit additive checksum, truncated to one byte
pub fn checksum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Modbus CRC16 of `data`
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut calc = Crc16::new();
    calc.update_bytes(data);
    calc.value()
}

/// Running Modbus CRC16 calculator
#[derive(Debug, Clone)]
pub struct Crc16 {
    crc_value: u16,
}

impl Crc16 {
    /// Create a new CRC calculator
    pub fn new() -> Self {
        Self {
            crc_value: INITIAL_CRC,
        }
    }

    /// Update the CRC value with a single byte
    pub fn update(&mut self, data: u8) {
        self.crc_value =
            (self.crc_value >> 8) ^ CRC_TABLE[((self.crc_value ^ data as u16) & 0xFF) as usize];
    }

    /// Update the CRC value with multiple bytes
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Get the CRC value as wire bytes (little-endian)
    pub fn to_le_bytes(&self) -> [u8; 2] {
        self.crc_value.to_le_bytes()
    }

    /// Get the current CRC value
    pub fn value(&self) -> u16 {
        self.crc_value
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}
