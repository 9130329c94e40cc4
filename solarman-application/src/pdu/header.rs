//! Logger header preceding the Modbus frame

use bytes::{BufMut, BytesMut};
use solarman_core::{ByteReader, SolarmanResult};

/// Header of a request payload
///
/// Loggers accept all-zero timestamps, so only the frame type is ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    pub frame_type: u8,
    pub sensor_type: u16,
    pub delivery_time: u32,
    pub power_on_time: u32,
    pub offset_time: u32,
}

impl PayloadHeader {
    /// Encoded size
    pub const LENGTH: usize = 15;

    /// Frame type of a Modbus passthrough request
    pub const FRAME_TYPE_MODBUS: u8 = 0x02;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_type);
        buf.put_u16_le(self.sensor_type);
        buf.put_u32_le(self.delivery_time);
        buf.put_u32_le(self.power_on_time);
        buf.put_u32_le(self.offset_time);
    }
}

impl Default for PayloadHeader {
    fn default() -> Self {
        Self {
            frame_type: Self::FRAME_TYPE_MODBUS,
            sensor_type: 0,
            delivery_time: 0,
            power_on_time: 0,
            offset_time: 0,
        }
    }
}

/// Header of a response payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    pub frame_type: u8,
    pub status: u8,
    pub delivery_time: u32,
    pub power_on_time: u32,
    pub offset_time: u32,
}

impl ResponseHeader {
    /// Encoded size
    pub const LENGTH: usize = 14;

    pub fn decode(reader: &mut ByteReader<'_>) -> SolarmanResult<Self> {
        Ok(Self {
            frame_type: reader.u8("frame type")?,
            status: reader.u8("status")?,
            delivery_time: reader.u32_le("delivery time")?,
            power_on_time: reader.u32_le("power on time")?,
            offset_time: reader.u32_le("offset time")?,
        })
    }
}
