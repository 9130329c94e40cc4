//! Envelope metadata

use serde::{Deserialize, Serialize};

/// Markers and control codes framing every V5 envelope
///
/// Most loggers use the defaults; some firmware variants answer with other
/// control codes, so every field can be overridden per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameMeta {
    /// First byte of every envelope
    pub start_marker: u8,
    /// Last byte of every envelope
    pub end_marker: u8,
    /// Control code sent with requests
    pub request_control_code: u16,
    /// Control code expected on responses
    pub response_control_code: u16,
}

impl FrameMeta {
    pub const DEFAULT_START_MARKER: u8 = 0xA5;
    pub const DEFAULT_END_MARKER: u8 = 0x15;
    pub const DEFAULT_REQUEST_CONTROL_CODE: u16 = 0x4510;
    pub const DEFAULT_RESPONSE_CONTROL_CODE: u16 = 0x1510;

    /// Create metadata from explicit values
    pub fn new(
        start_marker: u8,
        end_marker: u8,
        request_control_code: u16,
        response_control_code: u16,
    ) -> Self {
        Self {
            start_marker,
            end_marker,
            request_control_code,
            response_control_code,
        }
    }
}

impl Default for FrameMeta {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_START_MARKER,
            Self::DEFAULT_END_MARKER,
            Self::DEFAULT_REQUEST_CONTROL_CODE,
            Self::DEFAULT_RESPONSE_CONTROL_CODE,
        )
    }
}
