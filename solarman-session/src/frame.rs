//! V5 envelope structure and encoding/decoding
//!
//! ```text
//! +-------+--------+---------+--------+---------+---------+----------+-----+
//! | start | length | control | seq    | dev SN  | payload | checksum | end |
//! | 1     | 2 LE   | 2 LE    | 2      | 4 LE    | length  | 1        | 1   |
//! +-------+--------+---------+--------+---------+---------+----------+-----+
//! ```
//!
//! The checksum is the 8-bit sum of every byte from `length` through the end
//! of the payload. Loggers echo the sequence number big-endian although
//! requests carry it little-endian; both directions are kept as the devices
//! expect them.

use crate::meta::FrameMeta;
use bytes::{BufMut, BytesMut};
use solarman_core::{checksum8, ByteReader, SolarmanError, SolarmanResult};

/// Bytes before the payload: start, length, control, sequence, device serial
const HEADER_LENGTH: usize = 11;

/// Envelope bytes that are not payload
pub const FRAME_OVERHEAD: usize = HEADER_LENGTH + 2;

/// V5 envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V5Frame {
    control_code: u16,
    sequence: u16,
    device_serial: u32,
    payload: Vec<u8>,
}

impl V5Frame {
    /// Create a new envelope around `payload`
    pub fn new(control_code: u16, sequence: u16, device_serial: u32, payload: Vec<u8>) -> Self {
        Self {
            control_code,
            sequence,
            device_serial,
            payload,
        }
    }

    /// Encode a request envelope
    ///
    /// # Errors
    /// Returns `InvalidData` if the payload does not fit the 16-bit length field
    pub fn encode(&self, meta: &FrameMeta) -> SolarmanResult<Vec<u8>> {
        let length = u16::try_from(self.payload.len()).map_err(|_| {
            SolarmanError::InvalidData(format!(
                "Payload too long for a V5 frame: {} bytes",
                self.payload.len()
            ))
        })?;

        let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + self.payload.len());
        buf.put_u8(meta.start_marker);
        buf.put_u16_le(length);
        buf.put_u16_le(self.control_code);
        buf.put_u16_le(self.sequence);
        buf.put_u32_le(self.device_serial);
        buf.put_slice(&self.payload);

        // Checksum excludes the start marker
        let checksum = checksum8(&buf[1..]);
        buf.put_u8(checksum);
        buf.put_u8(meta.end_marker);

        Ok(buf.to_vec())
    }

    /// Decode a response envelope
    pub fn decode(data: &[u8], meta: &FrameMeta) -> SolarmanResult<Self> {
        let mut reader = ByteReader::new(data);

        let start = reader.u8("start marker")?;
        if start != meta.start_marker {
            return Err(SolarmanError::FrameFormat(format!(
                "expected 0x{:02X} as start marker, got: 0x{:02X}",
                meta.start_marker, start
            )));
        }

        let length = reader.u16_le("payload length")? as usize;

        let control_code = reader.u16_le("control code")?;
        if control_code != meta.response_control_code {
            return Err(SolarmanError::ProtocolMismatch {
                expected: meta.response_control_code,
                actual: control_code,
            });
        }

        let sequence = reader.u16_be("sequence number")?;
        let device_serial = reader.u32_le("device serial number")?;
        let payload = reader.take("payload", length)?.to_vec();

        let expected = checksum8(&data[1..HEADER_LENGTH + length]);
        let actual = reader.u8("checksum")?;
        if actual != expected {
            return Err(SolarmanError::ChecksumMismatch { expected, actual });
        }

        let end = reader.u8("end marker")?;
        if end != meta.end_marker {
            return Err(SolarmanError::FrameFormat(format!(
                "expected 0x{:02X} as end marker, got: 0x{:02X}",
                meta.end_marker, end
            )));
        }

        if reader.remaining() != 0 {
            return Err(SolarmanError::TrailingData(reader.remaining()));
        }

        Ok(Self {
            control_code,
            sequence,
            device_serial,
            payload,
        })
    }

    pub fn control_code(&self) -> u16 {
        self.control_code
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn device_serial(&self) -> u32 {
        self.device_serial
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Total size of the envelope starting at `prefix[0]`, once it is known
///
/// Returns `None` while fewer than three bytes are available or when the
/// first byte is not the configured start marker.
pub fn expected_frame_len(prefix: &[u8], meta: &FrameMeta) -> Option<usize> {
    match prefix {
        [start, lo, hi, ..] if *start == meta.start_marker => {
            Some(FRAME_OVERHEAD + u16::from_le_bytes([*lo, *hi]) as usize)
        }
        _ => None,
    }
}
